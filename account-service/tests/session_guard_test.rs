//! Session guard integration tests.

mod common;

use common::{body_json, TestApp};
use serde_json::{json, Map, Value};

fn session(entries: Value) -> Map<String, Value> {
    entries.as_object().cloned().unwrap()
}

#[tokio::test]
async fn me_without_cookie_is_unauthorized() {
    let app = TestApp::spawn().await;

    let res = app.get("/users/me", None).await;

    assert_eq!(res.status(), 401);
    let body = body_json(res).await;
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn unknown_session_id_is_unauthorized() {
    let app = TestApp::spawn().await;

    let res = app.get("/users/me", Some("session_id=does-not-exist")).await;

    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn authenticated_flag_must_be_boolean_true() {
    let app = TestApp::spawn().await;
    app.login_as("John Doe", "john@example.com").await;

    for flag in [json!("true"), json!(1), json!(false), Value::Null] {
        app.session_store.insert_raw(
            "forged",
            session(json!({
                "user_id": 1,
                "email": "john@example.com",
                "authenticated": flag,
                "created_at": 1
            })),
        );

        let res = app.get("/users/me", Some("session_id=forged")).await;
        assert_eq!(res.status(), 401, "flag {flag} was accepted");
    }
}

#[tokio::test]
async fn identity_fields_must_be_present_and_typed() {
    let app = TestApp::spawn().await;
    app.login_as("John Doe", "john@example.com").await;

    let payloads = [
        json!({ "email": "john@example.com", "authenticated": true }),
        json!({ "user_id": 1, "authenticated": true }),
        json!({ "user_id": "1", "email": "john@example.com", "authenticated": true }),
        json!({ "user_id": 1, "email": 7, "authenticated": true }),
    ];

    for payload in payloads {
        app.session_store.insert_raw("forged", session(payload.clone()));
        let res = app.get("/users/me", Some("session_id=forged")).await;
        assert_eq!(res.status(), 401, "payload {payload} was accepted");
    }
}

#[tokio::test]
async fn well_formed_session_is_authorized() {
    let app = TestApp::spawn().await;
    app.login_as("John Doe", "john@example.com").await;
    app.session_store.insert_raw(
        "handmade",
        session(json!({
            "user_id": 1,
            "email": "john@example.com",
            "authenticated": true,
            "created_at": 1
        })),
    );

    let res = app.get("/users/me", Some("session_id=handmade")).await;

    assert_eq!(res.status(), 200);
    let body = body_json(res).await;
    assert_eq!(body["name"], "John Doe");
}

#[tokio::test]
async fn failed_refresh_does_not_block_the_request() {
    let app = TestApp::spawn().await;
    let cookie = app.login_as("John Doe", "john@example.com").await;
    app.session_store.set_fail_touch(true);

    let res = app.get("/users/me", Some(&cookie)).await;

    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn session_for_deleted_user_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.login_as("John Doe", "john@example.com").await;
    app.session_store.insert_raw(
        "orphan",
        session(json!({
            "user_id": 42,
            "email": "ghost@example.com",
            "authenticated": true
        })),
    );

    let res = app.get("/users/me", Some("session_id=orphan")).await;

    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn authenticated_caller_cannot_log_in_again() {
    let app = TestApp::spawn().await;
    let cookie = app.login_as("John Doe", "john@example.com").await;

    let res = app
        .post_json(
            "/auth/login",
            json!({ "email": "john@example.com", "password": common::TEST_PASSWORD }),
            Some(&cookie),
        )
        .await;

    assert_eq!(res.status(), 403);
    assert_eq!(app.session_store.session_count(), 1);
}

#[tokio::test]
async fn stale_cookie_does_not_block_login() {
    let app = TestApp::spawn().await;
    app.register("John Doe", "john@example.com", common::TEST_PASSWORD)
        .await;

    let res = app
        .post_json(
            "/auth/login",
            json!({ "email": "john@example.com", "password": common::TEST_PASSWORD }),
            Some("session_id=expired"),
        )
        .await;

    assert_eq!(res.status(), 200);
}
