//! Sample application: controllers, middleware and the route table.

use serde_json::json;
use switchyard::{
    Controller, Group, LoggingMiddleware, Method, Middleware, Next, Request, Response, Result,
    Router, RouterError,
};

/// Requires an `Authorization` header and stores the user for handlers.
#[derive(Default)]
pub struct AuthMiddleware;

impl Middleware for AuthMiddleware {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> Result<Response> {
        if req.header("authorization").is_none() {
            return Ok(Response::new(401).body("Unauthorized!"));
        }
        req.set("user", json!({"id": 1, "name": "Test User"}));
        next.run(req)
    }
}

fn unknown_action(controller: &str, action: &str) -> RouterError {
    RouterError::ActionNotFound {
        controller: controller.to_string(),
        action: action.to_string(),
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
                "User detail: {}",
                req.param("id").unwrap_or_default()
            ))),
            "list" => Ok(Response::text("User list")),
            other => Err(unknown_action("UserController", other)),
        }
    }
}

#[derive(Default)]
pub struct AdminController;

impl Controller for AdminController {
    fn actions(&self) -> &'static [&'static str] {
        &["dashboard"]
    }

    fn call(&self, action: &str, _req: &Request) -> Result<Response> {
        match action {
            "dashboard" => Ok(Response::text("Admin Dashboard")),
            other => Err(unknown_action("AdminController", other)),
        }
    }
}

#[derive(Default)]
pub struct ProfileController;

impl Controller for ProfileController {
    fn actions(&self) -> &'static [&'static str] {
        &["show"]
    }

    fn call(&self, action: &str, req: &Request) -> Result<Response> {
        match action {
            "show" => Ok(Response::text(format!(
                "Profile: {}",
                req.param("id").unwrap_or_default()
            ))),
            other => Err(unknown_action("ProfileController", other)),
        }
    }
}

fn inputs_json(req: &Request) -> String {
    let body: serde_json::Map<_, _> = req
        .inputs()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::Value::Object(body).to_string()
}

/// Builds the sample route table.
pub fn build_router() -> Result<Router> {
    let mut router = Router::new();

    router
        .register_controller("App::Controllers::UserController", UserController::default)
        .register_controller("App::Controllers::AdminController", AdminController::default)
        .register_controller("App::Controllers::ProfileController", ProfileController::default)
        .register_middleware("auth", AuthMiddleware::default)
        .register_middleware("log", || LoggingMiddleware);

    router.middleware("log");

    router.get("/hello", |_req| "Hello World!")?;
    router.post("/api/data", |req| format!("Received: {}", inputs_json(req)))?;
    router.add_route(
        Method::Get,
        "/users/{id}",
        "App::Controllers::UserController@show",
    )?;
    router.add_route(
        Method::Get,
        "/users",
        ("App::Controllers::UserController", "list"),
    )?;
    router.get("/secret", |_req| "Secret area!")?.middleware(["auth"]);

    router.group(
        Group::new()
            .prefix("/admin")
            .middleware(["auth"])
            .namespace("App::Controllers"),
        |admin| {
            admin.add_route(Method::Get, "/dashboard", "AdminController@dashboard")?;
            admin.add_route(Method::Get, "/users", "UserController@list")?;
            Ok(())
        },
    )?;

    router.group(Group::new().prefix("/api"), |api| {
        api.group(Group::new().prefix("/v1"), |v1| {
            v1.get("/ping", |_req| "pong")?;
            Ok(())
        })
    })?;

    router
        .add_route(
            Method::Get,
            "/profile/{id}",
            "App::Controllers::ProfileController@show",
        )?
        .name("profile.show")?;

    router.put("/put-example", |_req| "PUT request")?;
    router.patch("/patch-example", |_req| "PATCH request")?;
    router.delete("/delete-example", |_req| "DELETE request")?;

    router.get("/search/{term}", |req| {
        format!(
            "Search: {}, Page: {}",
            req.param("term").unwrap_or_default(),
            req.query("page").unwrap_or("1")
        )
    })?;

    router.post("/json", |req| format!("JSON: {}", inputs_json(req)))?;

    router
        .get("/me", |req| {
            let name = req
                .user()
                .and_then(|user| user["name"].as_str())
                .unwrap_or("Anonymous");
            format!("Logged in as: {name}")
        })?
        .middleware(["auth"]);

    router.get("/multi/{foo}/{bar}", |req| {
        let params: serde_json::Map<_, _> = req
            .params()
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        format!("Parameters: {}", serde_json::Value::Object(params))
    })?;

    router.fallback(|_req| "Page not found!");

    router.verify()?;
    Ok(router)
}
