//! Route definitions.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, RouterError};
use crate::middleware::{compose, Continuation, MiddlewareRef, MiddlewareRegistry};
use crate::path::PathPattern;
use crate::request::{Method, Request};
use crate::resolver::{ControllerResolver, ControllerTarget};
use crate::response::{IntoResponse, Response};

/// A request handler.
///
/// Implemented for every `Fn(&Request) -> R` closure where `R` converts into
/// a response.
pub trait Handler: Send + Sync + 'static {
    /// Handles the request.
    fn handle(&self, req: &Request) -> Result<Response>;
}

impl<F, R> Handler for F
where
    F: Fn(&Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    fn handle(&self, req: &Request) -> Result<Response> {
        self(req).into_response()
    }
}

/// What a route runs once its middleware lets the request through.
#[derive(Clone)]
pub enum Action {
    /// A handler invoked directly.
    Handler(Arc<dyn Handler>),
    /// A controller action, identifier used as given.
    Controller(ControllerTarget),
    /// A `Controller@action` string; groups qualify it with their namespace.
    Reference(ControllerTarget),
}

impl Action {
    /// Wraps a handler closure.
    pub fn handler<F, R>(handler: F) -> Self
    where
        F: Fn(&Request) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        Self::Handler(handler)
    }

    /// Targets a controller action by its parts.
    pub fn controller(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Controller(ControllerTarget::new(controller, action))
    }

    /// Parses a `Controller@action` string.
    pub fn reference(handler: &str) -> Result<Self> {
        ControllerTarget::parse(handler).map(Self::Reference)
    }

    /// Returns the controller target, if this is not a plain handler.
    pub fn target(&self) -> Option<&ControllerTarget> {
        match self {
            Self::Handler(_) => None,
            Self::Controller(target) | Self::Reference(target) => Some(target),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler(..)"),
            Self::Controller(target) => f.debug_tuple("Controller").field(target).finish(),
            Self::Reference(target) => f.debug_tuple("Reference").field(target).finish(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{target}"),
            None => f.write_str("<closure>"),
        }
    }
}

/// Conversion into an [`Action`] at registration time.
///
/// Strings are parsed as `Controller@action`, pairs as
/// `(controller, action)`. Closures go through [`Action::handler`] or the
/// verb shortcuts such as [`Router::get`](crate::Router::get).
pub trait IntoAction {
    /// Performs the conversion.
    fn into_action(self) -> Result<Action>;
}

impl IntoAction for Action {
    fn into_action(self) -> Result<Action> {
        Ok(self)
    }
}

impl IntoAction for &str {
    fn into_action(self) -> Result<Action> {
        Action::reference(self)
    }
}

impl IntoAction for String {
    fn into_action(self) -> Result<Action> {
        Action::reference(&self)
    }
}

impl IntoAction for (&str, &str) {
    fn into_action(self) -> Result<Action> {
        Ok(Action::controller(self.0, self.1))
    }
}

/// A single route definition.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    pattern: PathPattern,
    action: Action,
    middleware: Vec<MiddlewareRef>,
    name: Option<String>,
}

impl Route {
    /// Creates a route, compiling its template.
    pub fn new(
        method: Method,
        template: &str,
        action: Action,
        middleware: Vec<MiddlewareRef>,
    ) -> Result<Self> {
        Ok(Self {
            method,
            pattern: PathPattern::new(template)?,
            action,
            middleware,
            name: None,
        })
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the raw path template.
    pub fn template(&self) -> &str {
        self.pattern.pattern()
    }

    /// Returns the compiled pattern.
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Returns the action.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Returns the route-level middleware, outermost first.
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    /// Returns the route name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns true if the method matches and the pattern consumes the whole path.
    pub fn matches(&self, req: &Request) -> bool {
        self.method == req.method && self.pattern.is_match(&req.path)
    }

    /// Installs the captured parameters into the request.
    ///
    /// Leaves the parameters empty when the path does not match.
    pub fn extract_params(&self, req: &mut Request) {
        let params = self.pattern.match_path(&req.path).unwrap_or_default();
        req.set_params(params);
    }

    /// Runs the route: parameter extraction, action resolution, then the
    /// route-level middleware around the action.
    pub fn run(
        &self,
        req: &mut Request,
        controllers: &ControllerResolver,
        registry: &MiddlewareRegistry,
    ) -> Result<Response> {
        self.extract_params(req);
        let terminal = self.terminal(controllers)?;
        debug!(route = %self, params = ?req.params(), "running route");
        compose(&self.middleware, registry, terminal)(req)
    }

    /// Normalizes the action into a single request continuation.
    fn terminal<'a>(&'a self, controllers: &ControllerResolver) -> Result<Continuation<'a>> {
        let terminal: Continuation<'a> = match &self.action {
            Action::Handler(handler) => Box::new(move |req: &mut Request| handler.handle(req)),
            Action::Controller(target) | Action::Reference(target) => {
                let resolved = controllers.resolve_target(target)?;
                Box::new(move |req: &mut Request| resolved.call(req))
            }
        };
        Ok(terminal)
    }

    pub(crate) fn push_middleware(&mut self, middleware: impl IntoIterator<Item = MiddlewareRef>) {
        self.middleware.extend(middleware);
    }

    pub(crate) fn set_name(&mut self, name: &str) -> Result<()> {
        if let Some(existing) = &self.name {
            return Err(RouterError::RouteAlreadyNamed {
                template: self.template().to_string(),
                name: existing.clone(),
            });
        }
        self.name = Some(name.to_string());
        Ok(())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.template())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Controller;

    fn route(method: Method, template: &str) -> Route {
        Route::new(method, template, Action::handler(|_req: &Request| "ok"), Vec::new()).unwrap()
    }

    #[test]
    fn test_matches_method_and_path() {
        let route = route(Method::Get, "/users/{id}");
        assert!(route.matches(&Request::get("/users/1")));
        assert!(!route.matches(&Request::post("/users/1")));
        assert!(!route.matches(&Request::get("/users")));
    }

    #[test]
    fn test_extract_params() {
        let route = route(Method::Get, "/multi/{foo}/{bar}");
        let mut req = Request::get("/multi/a/b");
        route.extract_params(&mut req);
        let pairs: Vec<_> = req.params().iter().collect();
        assert_eq!(pairs, vec![("foo", "a"), ("bar", "b")]);
    }

    #[test]
    fn test_extract_params_without_match_leaves_empty() {
        let route = route(Method::Get, "/users/{id}");
        let mut req = Request::get("/posts/1");
        route.extract_params(&mut req);
        assert!(req.params().is_empty());
    }

    #[test]
    fn test_into_action_shapes() {
        assert!(matches!("Home@index".into_action(), Ok(Action::Reference(_))));
        assert!(matches!(
            ("Home", "index").into_action(),
            Ok(Action::Controller(t)) if t.action == "index"
        ));
        assert!(matches!(
            "Home".into_action(),
            Err(RouterError::InvalidHandler(_))
        ));
    }

    #[test]
    fn test_name_is_set_once() {
        let mut route = route(Method::Get, "/");
        route.set_name("home").unwrap();
        assert_eq!(route.name(), Some("home"));
        assert!(matches!(
            route.set_name("index"),
            Err(RouterError::RouteAlreadyNamed { .. })
        ));
    }

    struct Echo;

    impl Controller for Echo {
        fn actions(&self) -> &'static [&'static str] {
            &["show"]
        }

        fn call(&self, _action: &str, req: &Request) -> Result<Response> {
            Ok(Response::text(format!("echo {}", req.param("id").unwrap_or("-"))))
        }
    }

    #[test]
    fn test_run_controller_action() {
        let mut controllers = ControllerResolver::new();
        controllers.register("Echo", || Echo);
        let route = Route::new(
            Method::Get,
            "/echo/{id}",
            Action::controller("Echo", "show"),
            Vec::new(),
        )
        .unwrap();

        let mut req = Request::get("/echo/9");
        let res = route
            .run(&mut req, &controllers, &MiddlewareRegistry::new())
            .unwrap();
        assert_eq!(res.body_string(), Some("echo 9".to_string()));
    }

    #[test]
    fn test_run_unknown_controller_fails() {
        let route = Route::new(
            Method::Get,
            "/",
            Action::controller("Nope", "show"),
            Vec::new(),
        )
        .unwrap();

        let err = route
            .run(
                &mut Request::get("/"),
                &ControllerResolver::new(),
                &MiddlewareRegistry::new(),
            )
            .unwrap_err();
        assert!(matches!(err, RouterError::ControllerNotFound(_)));
    }
}
