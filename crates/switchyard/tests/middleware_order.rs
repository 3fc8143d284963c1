//! Middleware ordering, short-circuiting and attribute passing.

mod common;
use common::*;

use std::sync::Arc;

use switchyard::{from_fn, MiddlewareRef, Request, Response, RouterError};

#[test]
fn test_global_wraps_route_middleware() {
    let events = log();
    let mut router = router();
    router.middleware(recorder(&events, "L"));

    let handler_events = Arc::clone(&events);
    router
        .get("/", move |_req| {
            handler_events.lock().unwrap().push("handler".to_string());
            "ok"
        })
        .unwrap()
        .middleware([recorder(&events, "A")]);

    let res = router.handle(Request::get("/")).unwrap();
    assert_eq!(body(&res), "ok");
    assert_eq!(
        entries(&events),
        ["L:before", "A:before", "handler", "A:after", "L:after"]
    );
}

#[test]
fn test_global_middleware_runs_in_registration_order() {
    let events = log();
    let mut router = router();
    router
        .middleware(recorder(&events, "g1"))
        .middleware(recorder(&events, "g2"));
    router
        .get("/", |_req| "ok")
        .unwrap()
        .middleware([recorder(&events, "r1"), recorder(&events, "r2")]);

    router.handle(Request::get("/")).unwrap();
    assert_eq!(
        entries(&events),
        [
            "g1:before", "g2:before", "r1:before", "r2:before", "r2:after", "r1:after",
            "g2:after", "g1:after"
        ]
    );
}

#[test]
fn test_short_circuit_skips_handler_and_inner_stages() {
    let events = log();
    let mut router = router();
    router.middleware(recorder(&events, "outer"));

    let handler_events = Arc::clone(&events);
    router
        .get("/secret", move |_req| {
            handler_events.lock().unwrap().push("handler".to_string());
            "hidden"
        })
        .unwrap()
        .middleware([MiddlewareRef::from("auth"), recorder(&events, "inner")]);

    let res = router.handle(Request::get("/secret")).unwrap();
    assert_eq!(res.status, 401);
    assert_eq!(entries(&events), ["outer:before", "outer:after"]);
}

#[test]
fn test_attributes_set_by_middleware_reach_the_handler() {
    let mut router = router();
    router
        .get("/me", |req| {
            let name = req
                .user()
                .and_then(|user| user["name"].as_str())
                .unwrap_or("Anonymous");
            format!("Logged in: {name}")
        })
        .unwrap()
        .middleware(["auth"]);

    let res = router
        .handle(Request::get("/me").with_header("Authorization", "Bearer t"))
        .unwrap();
    assert_eq!(body(&res), "Logged in: Test User");
}

#[test]
fn test_middleware_can_post_process_the_response() {
    let mut router = router();
    router.middleware(MiddlewareRef::shared(from_fn(|req, next| {
        let res = next.run(req)?;
        Ok(res.header("X-Powered-By", "switchyard"))
    })));
    router.get("/", |_req| "ok").unwrap();

    let res = router.handle(Request::get("/")).unwrap();
    assert_eq!(
        res.headers.get("X-Powered-By").map(String::as_str),
        Some("switchyard")
    );
}

#[test]
fn test_global_middleware_does_not_run_without_a_match() {
    let events = log();
    let mut router = router();
    router.middleware(recorder(&events, "g"));

    let res = router.handle(Request::get("/missing")).unwrap();
    assert_eq!(res.status, 404);
    assert!(entries(&events).is_empty());
}

#[test]
fn test_unregistered_middleware_aborts_dispatch_when_reached() {
    let events = log();
    let mut router = router();
    router.middleware(recorder(&events, "g"));
    router
        .get("/", |_req| "ok")
        .unwrap()
        .middleware(["not-registered"]);

    let err = router.handle(Request::get("/")).unwrap_err();
    assert!(matches!(err, RouterError::MiddlewareNotFound(name) if name == "not-registered"));
    assert_eq!(entries(&events), ["g:before", "g:after"]);
}

#[test]
fn test_named_middleware_is_built_per_request() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    let mut router = router();
    router.register_middleware("counted", || {
        BUILT.fetch_add(1, Ordering::SeqCst);
        from_fn(|req, next| next.run(req))
    });
    router.middleware("counted");
    router.get("/", |_req| Response::ok()).unwrap();

    router.handle(Request::get("/")).unwrap();
    router.handle(Request::get("/")).unwrap();
    assert_eq!(BUILT.load(Ordering::SeqCst), 2);
}
