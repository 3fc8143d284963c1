//! Named routes and URL generation.

mod common;
use common::*;

use std::collections::HashMap;

use switchyard::{Group, Request, RouterError};

#[test]
fn test_url_for_profile() {
    let mut router = router();
    router
        .get("/profile/{id}", |_req| "")
        .unwrap()
        .name("profile.show")
        .unwrap();

    assert_eq!(
        router.url_for("profile.show", [("id", 42)]),
        Some("/profile/42".to_string())
    );
    assert_eq!(router.url_for("profile.missing", [("id", 42)]), None);
}

#[test]
fn test_url_for_accepts_maps_and_ignores_extra_keys() {
    let mut router = router();
    router
        .get("/posts/{post}/comments/{comment}", |_req| "")
        .unwrap()
        .name("comment")
        .unwrap();

    let params: HashMap<&str, &str> = [("post", "7"), ("comment", "3"), ("extra", "x")]
        .into_iter()
        .collect();
    assert_eq!(
        router.url_for("comment", params),
        Some("/posts/7/comments/3".to_string())
    );
}

#[test]
fn test_url_for_encodes_values() {
    let mut router = router();
    router
        .get("/search/{term}", |_req| "")
        .unwrap()
        .name("search")
        .unwrap();

    assert_eq!(
        router.url_for("search", [("term", "rust & go/c")]),
        Some("/search/rust%20%26%20go%2Fc".to_string())
    );
}

#[test]
fn test_try_url_for_reports_failures() {
    let mut router = router();
    router
        .get("/profile/{id}", |_req| "")
        .unwrap()
        .name("profile.show")
        .unwrap();

    assert!(matches!(
        router.try_url_for("nope", [("id", 1)]),
        Err(RouterError::RouteNotFound(name)) if name == "nope"
    ));
    assert!(matches!(
        router.try_url_for("profile.show", [("other", 1)]),
        Err(RouterError::MissingParameter { param, .. }) if param == "id"
    ));
}

#[test]
fn test_named_routes_inside_groups_use_the_full_path() {
    let mut router = router();
    router
        .group(Group::new().prefix("/api/v1"), |v1| {
            v1.get("/users/{id}", |_req| "")?.name("api.users.show")?;
            Ok(())
        })
        .unwrap();

    assert_eq!(
        router.url_for("api.users.show", [("id", "9")]).as_deref(),
        Some("/api/v1/users/9")
    );
    assert_eq!(
        router.named("api.users.show").map(|r| r.template()),
        Some("/api/v1/users/{id}")
    );
}

#[test]
fn test_route_names_are_unique() {
    let mut router = router();
    router.get("/a", |_req| "").unwrap().name("same").unwrap();
    let err = router.get("/b", |_req| "").unwrap().name("same").err().unwrap();

    assert!(matches!(err, RouterError::DuplicateRouteName(_)));
    assert_eq!(
        router.url_for("same", Vec::<(&str, &str)>::new()).as_deref(),
        Some("/a")
    );
}

#[test]
fn test_generated_urls_dispatch_back_to_their_values() {
    let mut router = router();
    router
        .get("/search/{term}", |req| {
            format!("term={}", req.param("term").unwrap_or_default())
        })
        .unwrap()
        .name("search")
        .unwrap();

    for term in ["a b", "rust & go/c", "100%", "plain"] {
        let url = router.url_for("search", [("term", term)]).unwrap();
        let res = router.handle(Request::get(url)).unwrap();
        assert_eq!(body(&res), format!("term={term}"));
    }
}
