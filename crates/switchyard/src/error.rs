//! Error types for routing.

use thiserror::Error;

/// Router-specific errors.
///
/// Configuration errors come back from registration calls, resolution and
/// middleware errors from [`Router::dispatch`](crate::Router::dispatch).
#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid path template.
    #[error("invalid path pattern `{template}`: {reason}")]
    InvalidPattern { template: String, reason: String },

    /// Handler reference is not in `Class@method` form.
    #[error("invalid controller handler: {0}")]
    InvalidHandler(String),

    /// HTTP method outside the supported set.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Another route already uses this name.
    #[error("route name already registered: {0}")]
    DuplicateRouteName(String),

    /// The route was named before.
    #[error("route `{template}` is already named `{name}`")]
    RouteAlreadyNamed { template: String, name: String },

    /// No controller is registered under this identifier.
    #[error("controller not found: {0}")]
    ControllerNotFound(String),

    /// The controller exists but has no such action.
    #[error("controller action not found: {controller}@{action}")]
    ActionNotFound { controller: String, action: String },

    /// A middleware identifier does not name a registered middleware.
    #[error("middleware not registered: {0}")]
    MiddlewareNotFound(String),

    /// Route name not found.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// Reverse routing was missing a placeholder value.
    #[error("missing parameter `{param}` for route `{route}`")]
    MissingParameter { route: String, param: String },

    /// A handler failed.
    #[error("handler error: {0}")]
    Handler(String),
}

impl RouterError {
    /// Returns true for errors raised while building the route table.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern { .. }
                | Self::InvalidHandler(_)
                | Self::UnsupportedMethod(_)
                | Self::DuplicateRouteName(_)
                | Self::RouteAlreadyNamed { .. }
        )
    }
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
