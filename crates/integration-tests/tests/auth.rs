//! Integration tests for registration, login and sessions.

#![allow(clippy::unwrap_used)]

use cosmic_blueprints_integration_tests::{PASSWORD, TestContext};
use serde_json::{Value, json};

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_starts_session() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();

    let resp = client
        .post(ctx.url("/users/register"))
        .json(&json!({
            "username": "luna",
            "email": "Luna@Example.com",
            "password": PASSWORD,
            "birthDate": "1990-03-21",
            "birthLocation": "Lisbon",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["username"], "luna");
    assert_eq!(user["isAdmin"], false);
    assert_eq!(user["birthDate"], "1990-03-21");
    assert!(user.get("passwordHash").is_none());

    let (status, me) = ctx.get_json(&client, "/users/me").await;
    assert_eq!(status, 200);
    assert_eq!(me["id"], user["id"]);
}

#[tokio::test]
async fn test_register_rejects_duplicates_in_any_case() {
    let ctx = TestContext::new().await;
    ctx.customer("orion").await;

    let resp = TestContext::client()
        .post(ctx.url("/users/register"))
        .json(&json!({
            "username": "ORION",
            "email": "someone-else@example.com",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = TestContext::client()
        .post(ctx.url("/users/register"))
        .json(&json!({
            "username": "orion2",
            "email": "ORION@example.com",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let ctx = TestContext::new().await;

    let resp = TestContext::client()
        .post(ctx.url("/users/register"))
        .json(&json!({
            "username": "vega",
            "email": "vega@example.com",
            "password": "short",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// =============================================================================
// Login / logout
// =============================================================================

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = TestContext::new().await;
    ctx.customer("sirius").await;
    let client = TestContext::client();

    let wrong_password = client
        .post(ctx.url("/users/login"))
        .json(&json!({ "username": "sirius", "password": "not the password" }))
        .send()
        .await
        .unwrap();
    let unknown_user = client
        .post(ctx.url("/users/login"))
        .json(&json!({ "username": "nobody", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), 401);
    assert_eq!(unknown_user.status(), 401);
    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_user.json().await.unwrap();
    assert_eq!(a, b);

    let (status, _) = ctx.get_json(&client, "/users/me").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_username() {
    let ctx = TestContext::new().await;
    ctx.customer("rigel").await;
    let client = TestContext::client();

    let resp = client
        .post(ctx.url("/users/login"))
        .json(&json!({ "username": "RIGEL", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (status, me) = ctx.get_json(&client, "/users/me").await;
    assert_eq!(status, 200);
    assert_eq!(me["username"], "rigel");
}

#[tokio::test]
async fn test_logout_ends_session_and_is_idempotent() {
    let ctx = TestContext::new().await;
    let client = ctx.customer("altair").await;

    for _ in 0..2 {
        let resp = client.post(ctx.url("/users/logout")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["message"], "Logged out successfully");
    }

    let (status, body) = ctx.get_json(&client, "/users/me").await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Authentication required");
}
