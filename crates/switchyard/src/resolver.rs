//! Controller lookup for `Class@method` handler references.
//!
//! Controllers are registered up front under an identifier together with a
//! factory. Resolving a reference builds a fresh controller instance, so no
//! state is shared between requests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, RouterError};
use crate::request::Request;
use crate::response::Response;

/// Separator between controller and action in a handler string.
pub const ACTION_SEPARATOR: char = '@';

/// Separator between a namespace and a controller identifier.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// A group of request handlers addressed by action name.
///
/// # Example
///
/// ```
/// use switchyard::{Controller, Request, Response, Result, RouterError};
///
/// #[derive(Default)]
/// struct UserController;
///
/// impl Controller for UserController {
///     fn actions(&self) -> &'static [&'static str] {
///         &["show"]
///     }
///
///     fn call(&self, action: &str, req: &Request) -> Result<Response> {
///         match action {
///             "show" => Ok(Response::text(format!("user {}", req.param("id").unwrap_or("?")))),
///             other => Err(RouterError::ActionNotFound {
///                 controller: "UserController".into(),
///                 action: other.into(),
///             }),
///         }
///     }
/// }
/// ```
pub trait Controller {
    /// Names of the actions this controller answers.
    fn actions(&self) -> &'static [&'static str];

    /// Runs an action.
    fn call(&self, action: &str, req: &Request) -> Result<Response>;

    /// Returns true if `action` is one of [`Controller::actions`].
    fn has_action(&self, action: &str) -> bool {
        self.actions().contains(&action)
    }
}

/// Builds a fresh controller instance.
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// A (controller, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerTarget {
    /// Controller identifier, possibly namespace-qualified.
    pub controller: String,
    /// Action name.
    pub action: String,
}

impl ControllerTarget {
    /// Creates a target from its parts.
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// Parses a `Controller@action` string.
    ///
    /// Only the first `@` separates; both sides must be non-empty.
    pub fn parse(handler: &str) -> Result<Self> {
        match handler.split_once(ACTION_SEPARATOR) {
            Some((controller, action)) if !controller.is_empty() && !action.is_empty() => {
                Ok(Self::new(controller, action))
            }
            _ => Err(RouterError::InvalidHandler(handler.to_string())),
        }
    }

    /// Prefixes the controller with a namespace.
    #[must_use]
    pub fn qualify(mut self, namespace: &str) -> Self {
        let namespace = namespace.trim_end_matches(NAMESPACE_SEPARATOR);
        if !namespace.is_empty() {
            self.controller = format!("{namespace}{NAMESPACE_SEPARATOR}{}", self.controller);
        }
        self
    }
}

impl fmt::Display for ControllerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ACTION_SEPARATOR}{}", self.controller, self.action)
    }
}

/// A controller instance bound to one of its actions.
pub struct ResolvedAction {
    instance: Box<dyn Controller>,
    action: String,
}

impl ResolvedAction {
    /// Returns the action name.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Invokes the action.
    pub fn call(&self, req: &Request) -> Result<Response> {
        self.instance.call(&self.action, req)
    }
}

impl fmt::Debug for ResolvedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAction")
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// Registered-controller table.
#[derive(Clone, Default)]
pub struct ControllerResolver {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller factory, replacing any previous one.
    pub fn register<F, C>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        let boxed: ControllerFactory =
            Arc::new(move || -> Box<dyn Controller> { Box::new(factory()) });
        self.factories.insert(name.into(), boxed);
    }

    /// Returns true if the controller identifier is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Resolves a `Controller@action` string.
    pub fn resolve(&self, handler: &str) -> Result<ResolvedAction> {
        self.resolve_target(&ControllerTarget::parse(handler)?)
    }

    /// Resolves a target into a fresh instance bound to the action.
    pub fn resolve_target(&self, target: &ControllerTarget) -> Result<ResolvedAction> {
        let Some(factory) = self.factories.get(&target.controller) else {
            warn!(controller = %target.controller, "controller not registered");
            return Err(RouterError::ControllerNotFound(target.controller.clone()));
        };

        let instance = factory();
        if !instance.has_action(&target.action) {
            warn!(target = %target, "controller has no such action");
            return Err(RouterError::ActionNotFound {
                controller: target.controller.clone(),
                action: target.action.clone(),
            });
        }

        Ok(ResolvedAction {
            instance,
            action: target.action.clone(),
        })
    }
}
