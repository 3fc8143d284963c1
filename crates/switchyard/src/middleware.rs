//! Middleware support for request/response processing.
//!
//! A middleware wraps the rest of the chain. It receives the request and a
//! [`Next`] continuation and may:
//! - return a response without calling `next` (short-circuit)
//! - modify the request, usually its attributes, before calling `next`
//! - post-process the response `next` returns
//!
//! Stages run in registration order on the way in and in reverse order on
//! the way out.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use tracing::{info, trace, warn};

use crate::error::{Result, RouterError};
use crate::request::Request;
use crate::response::Response;

/// A boxed continuation: the remainder of a pipeline.
pub type Continuation<'a> = Box<dyn Fn(&mut Request) -> Result<Response> + 'a>;

/// Builds a fresh middleware instance.
pub type MiddlewareFactory = Arc<dyn Fn() -> Box<dyn Middleware> + Send + Sync>;

/// Handle to the inner part of the pipeline.
///
/// Consumed by [`Next::run`], so a stage can call through at most once.
pub struct Next<'a> {
    inner: &'a dyn Fn(&mut Request) -> Result<Response>,
}

impl Next<'_> {
    /// Runs the remaining stages and the handler.
    pub fn run(self, req: &mut Request) -> Result<Response> {
        (self.inner)(req)
    }
}

/// Trait for middleware that wraps request handling.
///
/// # Example
///
/// ```
/// use switchyard::{Middleware, Next, Request, Response, Result};
///
/// struct RequireToken;
///
/// impl Middleware for RequireToken {
///     fn handle(&self, req: &mut Request, next: Next<'_>) -> Result<Response> {
///         if req.header("authorization").is_none() {
///             return Ok(Response::unauthorized());
///         }
///         req.set("user", "token-holder");
///         next.run(req)
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Processes the request, optionally delegating to `next`.
    fn handle(&self, req: &mut Request, next: Next<'_>) -> Result<Response>;
}

/// Middleware built from a closure. See [`from_fn`].
pub struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request, Next<'_>) -> Result<Response> + Send + Sync,
{
    fn handle(&self, req: &mut Request, next: Next<'_>) -> Result<Response> {
        (self.0)(req, next)
    }
}

/// Wraps a closure as middleware.
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut Request, Next<'_>) -> Result<Response> + Send + Sync,
{
    FnMiddleware(f)
}

/// A middleware as attached to a route or the router.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// An instance shared by every request.
    Shared {
        /// Type name, for listings.
        label: &'static str,
        /// The instance.
        middleware: Arc<dyn Middleware>,
    },
    /// An identifier looked up in the [`MiddlewareRegistry`] per request.
    Named(String),
}

impl MiddlewareRef {
    /// Attaches an instance directly.
    pub fn shared<M: Middleware + 'static>(middleware: M) -> Self {
        Self::Shared {
            label: std::any::type_name::<M>(),
            middleware: Arc::new(middleware),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl fmt::Display for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared { label, .. } => f.write_str(label),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared { label, .. } => f.debug_tuple("Shared").field(label).finish(),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// An instantiated pipeline stage.
enum Stage<'a> {
    Borrowed(&'a dyn Middleware),
    Owned(Box<dyn Middleware>),
}

impl<'a> Deref for Stage<'a> {
    type Target = dyn Middleware + 'a;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(mw) => *mw,
            Self::Owned(mw) => mw.as_ref(),
        }
    }
}

/// Table of middleware identifiers.
///
/// Named middleware is built fresh from its factory each time a stage runs.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, MiddlewareFactory>,
}

impl MiddlewareRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under an identifier, replacing any previous one.
    pub fn register<F, M>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Middleware + 'static,
    {
        let boxed: MiddlewareFactory =
            Arc::new(move || -> Box<dyn Middleware> { Box::new(factory()) });
        self.factories.insert(name.into(), boxed);
    }

    /// Returns true if the identifier is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Checks that a reference can be instantiated.
    pub fn check(&self, mref: &MiddlewareRef) -> Result<()> {
        match mref {
            MiddlewareRef::Named(name) if !self.contains(name) => {
                Err(RouterError::MiddlewareNotFound(name.clone()))
            }
            _ => Ok(()),
        }
    }

    fn instantiate<'a>(&self, mref: &'a MiddlewareRef) -> Result<Stage<'a>> {
        match mref {
            MiddlewareRef::Shared { middleware, .. } => Ok(Stage::Borrowed(middleware.as_ref())),
            MiddlewareRef::Named(name) => self
                .factories
                .get(name)
                .map(|factory| Stage::Owned(factory()))
                .ok_or_else(|| {
                    warn!(middleware = %name, "middleware identifier is not registered");
                    RouterError::MiddlewareNotFound(name.clone())
                }),
        }
    }
}

/// Wraps `terminal` in `stack`, first element outermost.
///
/// Named stages are resolved lazily, when the stage is reached, so a bad
/// identifier aborts the dispatch at that point.
pub fn compose<'a>(
    stack: &'a [MiddlewareRef],
    registry: &'a MiddlewareRegistry,
    terminal: Continuation<'a>,
) -> Continuation<'a> {
    stack.iter().rev().fold(terminal, |next, mref| {
        let wrapped: Continuation<'a> = Box::new(move |req: &mut Request| {
            let stage = registry.instantiate(mref)?;
            trace!(middleware = %mref, "entering middleware");
            stage.handle(req, Next { inner: &*next })
        });
        wrapped
    })
}

/// Middleware that logs requests and response statuses.
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> Result<Response> {
        info!(method = %req.method, path = %req.path, "--> request");
        let res = next.run(req)?;
        info!(status = res.status, "<-- response");
        Ok(res)
    }
}
