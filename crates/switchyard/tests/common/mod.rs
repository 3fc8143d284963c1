#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::json;
use switchyard::{
    from_fn, Controller, Middleware, MiddlewareRef, Next, Request, Response, Result, Router,
    RouterError,
};

/// Shared event log for ordering assertions.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Middleware recording `<tag>:before` and `<tag>:after` around `next`.
pub fn recorder(log: &Log, tag: &'static str) -> MiddlewareRef {
    let log = Arc::clone(log);
    MiddlewareRef::shared(from_fn(move |req, next| {
        log.lock().unwrap().push(format!("{tag}:before"));
        let res = next.run(req);
        log.lock().unwrap().push(format!("{tag}:after"));
        res
    }))
}

/// Rejects requests without an `Authorization` header, otherwise stores the user.
#[derive(Default)]
pub struct AuthMiddleware;

impl Middleware for AuthMiddleware {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> Result<Response> {
        if req.header("authorization").is_none() {
            return Ok(Response::unauthorized());
        }
        req.set("user", json!({"id": 1, "name": "Test User"}));
        next.run(req)
    }
}

#[derive(Default)]
pub struct UserController;

impl Controller for UserController {
    fn actions(&self) -> &'static [&'static str] {
        &["show", "list"]
    }

    fn call(&self, action: &str, req: &Request) -> Result<Response> {
        match action {
            "show" => Ok(Response::text(format!(
                "user {}",
                req.param("id").unwrap_or("?")
            ))),
            "list" => Ok(Response::text("users")),
            other => Err(RouterError::ActionNotFound {
                controller: "UserController".into(),
                action: other.into(),
            }),
        }
    }
}

#[derive(Default)]
pub struct AdminController;

impl Controller for AdminController {
    fn actions(&self) -> &'static [&'static str] {
        &["dashboard"]
    }

    fn call(&self, _action: &str, req: &Request) -> Result<Response> {
        let name = req
            .user()
            .and_then(|user| user["name"].as_str())
            .unwrap_or("anonymous");
        Ok(Response::text(format!("dashboard for {name}")))
    }
}

/// Router with controllers and the `auth` middleware registered.
pub fn router() -> Router {
    let mut router = Router::new();
    router
        .register_controller("App::Controllers::UserController", UserController::default)
        .register_controller("App::Controllers::AdminController", AdminController::default)
        .register_middleware("auth", AuthMiddleware::default);
    router
}

pub fn body(res: &Response) -> String {
    res.body_string().unwrap_or_default()
}
