//! # switchyard
//!
//! An in-process HTTP request router with onion-style middleware.
//!
//! This crate provides:
//! - Path templates with `{name}` parameters, compiled at registration
//! - First-match-wins dispatch on method and path
//! - Global and route-level middleware that can short-circuit
//! - Route groups with prefixes, namespaces and middleware
//! - Controller actions addressed as `Controller@action`
//! - Named routes for reverse URL lookup
//!
//! Transport is left to the host: it builds a [`Request`], calls
//! [`Router::dispatch`] and writes out the [`Response`].
//!
//! ## Quick Start
//!
//! ```
//! use switchyard::{Request, Router};
//!
//! let mut router = Router::new();
//! router.get("/", |_req| "Hello, World!")?;
//! router.post("/api/data", |req| {
//!     let value = req.input("value").and_then(|v| v.as_str()).unwrap_or_default();
//!     format!("echo:{value}")
//! })?;
//!
//! let res = router.handle(Request::post("/api/data").with_input("value", "x"))?;
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body_string().as_deref(), Some("echo:x"));
//! # Ok::<(), switchyard::RouterError>(())
//! ```
//!
//! ## Middleware
//!
//! ```
//! use switchyard::{from_fn, Request, Response, Router};
//!
//! let mut router = Router::new();
//! router.register_middleware("auth", || {
//!     from_fn(|req, next| {
//!         if req.header("authorization").is_none() {
//!             return Ok(Response::unauthorized());
//!         }
//!         next.run(req)
//!     })
//! });
//! router.get("/secret", |_req| "hidden")?.middleware(["auth"]);
//!
//! let res = router.handle(Request::get("/secret"))?;
//! assert_eq!(res.status, 401);
//! # Ok::<(), switchyard::RouterError>(())
//! ```
//!
//! ## Route Groups
//!
//! ```
//! use switchyard::{Group, Router};
//!
//! let mut router = Router::new();
//! router.group(Group::new().prefix("/api"), |api| {
//!     api.group(Group::new().prefix("/v1"), |v1| {
//!         v1.get("/ping", |_req| "pong")?;
//!         Ok(())
//!     })
//! })?;
//! assert_eq!(router.routes().next().map(|r| r.template()), Some("/api/v1/ping"));
//! # Ok::<(), switchyard::RouterError>(())
//! ```
//!
//! ## Named Routes
//!
//! ```
//! use switchyard::Router;
//!
//! let mut router = Router::new();
//! router.get("/profile/{id}", |_req| "")?.name("profile.show")?;
//!
//! assert_eq!(router.url_for("profile.show", [("id", 42)]), Some("/profile/42".to_string()));
//! assert_eq!(router.url_for("nope", [("id", 42)]), None);
//! # Ok::<(), switchyard::RouterError>(())
//! ```

mod error;
mod middleware;
mod path;
mod request;
mod resolver;
mod response;
mod route;
mod router;

pub use error::{Result, RouterError};
pub use middleware::{
    compose, from_fn, Continuation, FnMiddleware, LoggingMiddleware, Middleware,
    MiddlewareFactory, MiddlewareRef, MiddlewareRegistry, Next,
};
pub use path::{PathPattern, PathSegment};
pub use request::{Method, PathParams, Request};
pub use resolver::{
    Controller, ControllerFactory, ControllerResolver, ControllerTarget, ResolvedAction,
};
pub use response::{IntoResponse, Response};
pub use route::{Action, Handler, IntoAction, Route};
pub use router::{Group, RouteHandle, Router, Scope};
