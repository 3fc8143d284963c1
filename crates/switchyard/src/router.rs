//! Main router implementation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, RouterError};
use crate::middleware::{compose, Continuation, Middleware, MiddlewareRef, MiddlewareRegistry};
use crate::request::{Method, Request};
use crate::resolver::{Controller, ControllerResolver};
use crate::response::{IntoResponse, Response};
use crate::route::{Action, Handler, IntoAction, Route};

/// Attributes shared by every route registered inside a group.
#[derive(Debug, Clone, Default)]
pub struct Group {
    prefix: String,
    namespace: Option<String>,
    middleware: Vec<MiddlewareRef>,
}

impl Group {
    /// Creates a group without attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the URL prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the namespace for `Controller@action` handlers.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Appends middleware.
    #[must_use]
    pub fn middleware<I, M>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        self.middleware.extend(middleware.into_iter().map(Into::into));
        self
    }
}

/// Attributes accumulated from every enclosing group.
#[derive(Debug, Clone, Default)]
struct GroupContext {
    prefix: String,
    namespace: Option<String>,
    middleware: Vec<MiddlewareRef>,
}

impl GroupContext {
    /// Derives the context for a nested group.
    fn nest(&self, group: &Group) -> Self {
        let mut middleware = self.middleware.clone();
        middleware.extend(group.middleware.iter().cloned());

        Self {
            prefix: format!("{}{}", self.prefix, group.prefix.trim_end_matches('/')),
            namespace: group.namespace.clone().or_else(|| self.namespace.clone()),
            middleware,
        }
    }

    /// Joins the prefix and a route URI into `/a/b` form.
    fn uri(&self, uri: &str) -> String {
        let joined = format!("{}/{}", self.prefix, uri.trim_start_matches('/'));
        format!("/{}", joined.trim_matches('/'))
    }

    fn action(&self, action: Action) -> Action {
        match (action, &self.namespace) {
            (Action::Reference(target), Some(namespace)) => {
                Action::Reference(target.qualify(namespace))
            }
            (action, _) => action,
        }
    }
}

macro_rules! verb_shortcuts {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Adds a `", stringify!($method), "` route served by a closure.")]
            pub fn $name<F, R>(&mut self, uri: &str, handler: F) -> Result<RouteHandle<'_>>
            where
                F: Fn(&Request) -> R + Send + Sync + 'static,
                R: IntoResponse,
            {
                self.add_route(Method::$method, uri, Action::handler(handler))
            }
        )*
    };
}

/// Registration scope inside a [`Router::group`] callback.
///
/// Carries the attributes of every enclosing group; routes added through it
/// inherit them.
pub struct Scope<'r> {
    router: &'r mut Router,
    context: GroupContext,
}

impl Scope<'_> {
    /// Adds a route with any method and action shape.
    pub fn add_route(
        &mut self,
        method: Method,
        uri: &str,
        action: impl IntoAction,
    ) -> Result<RouteHandle<'_>> {
        self.router.insert(&self.context, method, uri, action)
    }

    verb_shortcuts! {
        get => Get,
        post => Post,
        put => Put,
        patch => Patch,
        delete => Delete,
    }

    /// Opens a nested group.
    pub fn group<F>(&mut self, group: Group, register: F) -> Result<()>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<()>,
    {
        let mut scope = Scope {
            context: self.context.nest(&group),
            router: &mut *self.router,
        };
        register(&mut scope)
    }
}

/// Handle to a freshly registered route.
pub struct RouteHandle<'a> {
    router: &'a mut Router,
    index: usize,
}

impl RouteHandle<'_> {
    /// Appends route-level middleware.
    pub fn middleware<I, M>(self, middleware: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        self.router.routes[self.index].push_middleware(middleware.into_iter().map(Into::into));
        self
    }

    /// Names the route for [`Router::url_for`].
    ///
    /// Fails if the name is taken or the route already has one.
    pub fn name(self, name: &str) -> Result<Self> {
        if self.router.named_routes.contains_key(name) {
            return Err(RouterError::DuplicateRouteName(name.to_string()));
        }
        self.router.routes[self.index].set_name(name)?;
        self.router.named_routes.insert(name.to_string(), self.index);
        Ok(self)
    }

    /// Returns the registered route.
    pub fn route(&self) -> &Route {
        &self.router.routes[self.index]
    }
}

/// The route registry and dispatcher.
///
/// Built once, then shared read-only: `Router` is `Send + Sync` and
/// [`Router::dispatch`] takes `&self`.
///
/// # Example
///
/// ```
/// use switchyard::{Group, Request, Router};
///
/// let mut router = Router::new();
/// router.get("/hello", |_req| "Hello")?;
/// router.group(Group::new().prefix("/api"), |api| {
///     api.get("/users/{id}", |req| format!("user {}", req.param("id").unwrap_or("?")))?
///         .name("api.user")?;
///     Ok(())
/// })?;
///
/// let res = router.handle(Request::get("/api/users/7"))?;
/// assert_eq!(res.body_string().as_deref(), Some("user 7"));
/// assert_eq!(router.url_for("api.user", [("id", 7)]).as_deref(), Some("/api/users/7"));
/// # Ok::<(), switchyard::RouterError>(())
/// ```
#[derive(Default)]
pub struct Router {
    /// Registered routes, in match priority order.
    routes: Vec<Route>,
    /// Route name to position in `routes`.
    named_routes: HashMap<String, usize>,
    /// Global middleware.
    middleware: Vec<MiddlewareRef>,
    fallback: Option<Arc<dyn Handler>>,
    controllers: ControllerResolver,
    registry: MiddlewareRegistry,
}

impl Router {
    /// Creates a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller factory under an identifier.
    pub fn register_controller<F, C>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        self.controllers.register(name, factory);
        self
    }

    /// Registers a middleware factory under an identifier.
    pub fn register_middleware<F, M>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Middleware + 'static,
    {
        self.registry.register(name, factory);
        self
    }

    /// Adds global middleware. Global middleware runs before any route-level
    /// middleware, in the order added.
    pub fn middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Sets the handler used when no route matches, replacing any previous one.
    pub fn fallback<F, R>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        self.fallback = Some(handler);
        self
    }

    /// Adds a route with any method and action shape.
    pub fn add_route(
        &mut self,
        method: Method,
        uri: &str,
        action: impl IntoAction,
    ) -> Result<RouteHandle<'_>> {
        self.insert(&GroupContext::default(), method, uri, action)
    }

    verb_shortcuts! {
        get => Get,
        post => Post,
        put => Put,
        patch => Patch,
        delete => Delete,
    }

    /// Registers routes sharing the group's prefix, namespace and middleware.
    ///
    /// The callback runs immediately; the attributes apply to nothing
    /// registered after it returns.
    pub fn group<F>(&mut self, group: Group, register: F) -> Result<()>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<()>,
    {
        let mut scope = Scope {
            context: GroupContext::default().nest(&group),
            router: self,
        };
        register(&mut scope)
    }

    fn insert(
        &mut self,
        context: &GroupContext,
        method: Method,
        uri: &str,
        action: impl IntoAction,
    ) -> Result<RouteHandle<'_>> {
        let uri = context.uri(uri);
        let action = context.action(action.into_action()?);
        let route = Route::new(method, &uri, action, context.middleware.clone())?;
        debug!(route = %route, action = %route.action(), "registered route");

        self.routes.push(route);
        Ok(RouteHandle {
            index: self.routes.len() - 1,
            router: self,
        })
    }

    /// Returns the registered routes in match order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Looks up a named route.
    pub fn named(&self, name: &str) -> Option<&Route> {
        self.named_routes.get(name).map(|&index| &self.routes[index])
    }

    /// Generates the URL of a named route.
    ///
    /// Returns `None` for an unknown name or a missing parameter. Values are
    /// percent-encoded.
    pub fn url_for<I, K, V>(&self, name: &str, params: I) -> Option<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.try_url_for(name, params).ok()
    }

    /// Like [`Router::url_for`], reporting why generation failed.
    pub fn try_url_for<I, K, V>(&self, name: &str, params: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let route = self
            .named(name)
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?;
        let params: HashMap<String, String> = params
            .into_iter()
            .map(|(key, value)| (key.into(), value.to_string()))
            .collect();

        route
            .pattern()
            .reverse(&params)
            .map_err(|param| RouterError::MissingParameter {
                route: name.to_string(),
                param: param.to_string(),
            })
    }

    /// Checks that every middleware identifier and controller target resolves.
    ///
    /// Call once after registration to fail at startup rather than on the
    /// first request that reaches a broken route.
    pub fn verify(&self) -> Result<()> {
        let route_middleware = self.routes.iter().flat_map(Route::middleware);
        for middleware in self.middleware.iter().chain(route_middleware) {
            self.registry.check(middleware)?;
        }
        for route in &self.routes {
            if let Some(target) = route.action().target() {
                self.controllers.resolve_target(target)?;
            }
        }
        Ok(())
    }

    /// Handles an owned request.
    pub fn handle(&self, mut request: Request) -> Result<Response> {
        self.dispatch(&mut request)
    }

    /// Dispatches a request.
    ///
    /// The first route matching method and path wins. Its action runs inside
    /// the global middleware, then the route's own middleware. Without a
    /// match the fallback answers, or a 404 `Not Found`.
    pub fn dispatch(&self, request: &mut Request) -> Result<Response> {
        let Some(route) = self.routes.iter().find(|route| route.matches(request)) else {
            return self.unmatched(request);
        };
        debug!(route = %route, path = %request.path, "matched route");

        let terminal: Continuation<'_> = Box::new(move |req: &mut Request| {
            route.run(req, &self.controllers, &self.registry)
        });
        compose(&self.middleware, &self.registry, terminal)(request)
    }

    fn unmatched(&self, request: &Request) -> Result<Response> {
        match &self.fallback {
            Some(fallback) => {
                debug!(method = %request.method, path = %request.path, "no route matched, using fallback");
                fallback.handle(request)
            }
            None => {
                debug!(method = %request.method, path = %request.path, "no route matched");
                Ok(Response::not_found())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_handler(req: &Request) -> String {
        format!("User: {}", req.param("id").unwrap_or("unknown"))
    }

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.get("/", |_req| "Hello, World!").unwrap();
        router.get("/users/{id}", user_handler).unwrap();

        let res = router.handle(Request::get("/")).unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("Hello, World!".to_string()));

        let res = router.handle(Request::get("/users/123")).unwrap();
        assert_eq!(res.body_string(), Some("User: 123".to_string()));
    }

    #[test]
    fn test_not_found() {
        let mut router = Router::new();
        router.get("/", |_req| "home").unwrap();

        let res = router.handle(Request::get("/nonexistent")).unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(res.body_string(), Some("Not Found".to_string()));
    }

    #[test]
    fn test_method_mismatch_is_not_found() {
        let mut router = Router::new();
        router.get("/", |_req| "home").unwrap();

        let res = router.handle(Request::post("/")).unwrap();
        assert_eq!(res.status, 404);
    }

    #[test]
    fn test_uri_normalization() {
        let mut router = Router::new();
        router.get("users/", |_req| "").unwrap();
        router.get("/", |_req| "").unwrap();
        router
            .group(Group::new().prefix("/admin/"), |admin| {
                admin.get("/", |_req| "")?;
                admin.get("settings", |_req| "")?;
                Ok(())
            })
            .unwrap();

        let templates: Vec<_> = router.routes().map(Route::template).collect();
        assert_eq!(templates, ["/users", "/", "/admin", "/admin/settings"]);
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let mut router = Router::new();
        let err = router.get("/users/{id", |_req| "").err().unwrap();
        assert!(err.is_configuration());
        assert_eq!(router.routes().count(), 0);
    }

    #[test]
    fn test_named_route() {
        let mut router = Router::new();
        router
            .get("/users/{id}", user_handler)
            .unwrap()
            .name("user_detail")
            .unwrap();

        assert_eq!(
            router.url_for("user_detail", [("id", "42")]),
            Some("/users/42".to_string())
        );
        assert_eq!(router.url_for("missing", [("id", "42")]), None);
        assert!(matches!(
            router.try_url_for("user_detail", Vec::<(String, String)>::new()),
            Err(RouterError::MissingParameter { param, .. }) if param == "id"
        ));
    }

    #[test]
    fn test_duplicate_route_name() {
        let mut router = Router::new();
        router.get("/a", |_req| "a").unwrap().name("dup").unwrap();
        let err = router.get("/b", |_req| "b").unwrap().name("dup").err().unwrap();
        assert!(matches!(err, RouterError::DuplicateRouteName(name) if name == "dup"));
        assert_eq!(router.url_for("dup", Vec::<(&str, &str)>::new()).as_deref(), Some("/a"));
    }

    #[test]
    fn test_group_namespace_qualifies_references_only() {
        let mut router = Router::new();
        router
            .group(Group::new().namespace("App::Controllers"), |app| {
                app.add_route(Method::Get, "/a", "Home@index")?;
                app.add_route(Method::Get, "/b", ("Other", "index"))?;
                app.group(Group::new().namespace("Admin"), |admin| {
                    admin.add_route(Method::Get, "/c", "Panel@show")?;
                    Ok(())
                })
            })
            .unwrap();

        let actions: Vec<_> = router.routes().map(|r| r.action().to_string()).collect();
        assert_eq!(
            actions,
            ["App::Controllers::Home@index", "Other@index", "Admin::Panel@show"]
        );
    }

    #[test]
    fn test_router_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();
    }
}
