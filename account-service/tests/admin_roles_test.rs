//! Role and permission administration integration tests.

mod common;

use axum::http::Method;
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn admin_routes_require_the_api_key() {
    let app = TestApp::spawn().await;

    let res = app
        .send(
            axum::http::Request::builder()
                .method("GET")
                .uri("/admin/roles")
                .header("x-admin-api-key", "wrong-key")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status(), 401);

    let res = app.get("/admin/roles", None).await;
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn empty_configured_key_disables_admin_routes() {
    let mut config = common::test_config();
    config.security.admin_api_key = String::new();
    let app = TestApp::spawn_with(config).await;

    let res = app
        .send(
            axum::http::Request::builder()
                .method("GET")
                .uri("/admin/roles")
                .header("x-admin-api-key", "")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn create_and_list_roles() {
    let app = TestApp::spawn().await;
    let admin = app.create_role("admin").await;
    let editor = app.create_role("editor").await;

    let res = app.admin(Method::GET, "/admin/roles", None).await;

    assert_eq!(res.status(), 200);
    let body = body_json(res).await;
    assert_eq!(
        body,
        json!([
            { "id": admin, "name": "admin" },
            { "id": editor, "name": "editor" }
        ])
    );
}

#[tokio::test]
async fn duplicate_role_is_a_conflict() {
    let app = TestApp::spawn().await;
    app.create_role("admin").await;

    let res = app
        .admin(Method::POST, "/admin/roles", Some(json!({ "name": "admin" })))
        .await;

    assert_eq!(res.status(), 409);
    let body = body_json(res).await;
    assert_eq!(body["error"], "Role already exists");
}

#[tokio::test]
async fn duplicate_permission_is_a_conflict() {
    let app = TestApp::spawn().await;
    app.create_permission("users.read").await;

    let res = app
        .admin(
            Method::POST,
            "/admin/permissions",
            Some(json!({ "name": "users.read" })),
        )
        .await;

    assert_eq!(res.status(), 409);
}

#[tokio::test]
async fn empty_role_name_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app
        .admin(Method::POST, "/admin/roles", Some(json!({ "name": "" })))
        .await;

    assert_eq!(res.status(), 400);
    let body = body_json(res).await;
    assert_eq!(body["fields"]["name"], "name is required");
}

#[tokio::test]
async fn granted_permissions_fan_in_to_me() {
    // Arrange
    let app = TestApp::spawn().await;
    let cookie = app.login_as("John Doe", "john@example.com").await;

    let admin = app.create_role("admin").await;
    let auditor = app.create_role("auditor").await;
    let write = app.create_permission("users.write").await;
    let read = app.create_permission("users.read").await;

    for (role, permission) in [(admin, write), (admin, read), (auditor, read)] {
        let res = app
            .admin(
                Method::POST,
                &format!("/admin/roles/{role}/permissions/{permission}"),
                None,
            )
            .await;
        assert_eq!(res.status(), 204);
    }
    // Granting twice is harmless.
    let res = app
        .admin(
            Method::POST,
            &format!("/admin/roles/{admin}/permissions/{read}"),
            None,
        )
        .await;
    assert_eq!(res.status(), 204);

    for role in [admin, auditor] {
        let res = app
            .admin(Method::POST, &format!("/admin/users/1/roles/{role}"), None)
            .await;
        assert_eq!(res.status(), 204);
    }

    // Act
    let res = app.get("/users/me", Some(&cookie)).await;

    // Assert
    assert_eq!(res.status(), 200);
    let body = body_json(res).await;
    assert_eq!(
        body["roles"],
        json!([
            { "id": admin, "name": "admin", "permissions": ["users.read", "users.write"] },
            { "id": auditor, "name": "auditor", "permissions": ["users.read"] }
        ])
    );
}

#[tokio::test]
async fn role_without_permissions_is_listed_empty() {
    let app = TestApp::spawn().await;
    let cookie = app.login_as("John Doe", "john@example.com").await;
    let guest = app.create_role("guest").await;
    app.admin(Method::POST, &format!("/admin/users/1/roles/{guest}"), None)
        .await;

    let body = body_json(app.get("/users/me", Some(&cookie)).await).await;

    assert_eq!(
        body["roles"],
        json!([{ "id": guest, "name": "guest", "permissions": [] }])
    );
}

#[tokio::test]
async fn removing_a_role_takes_effect_on_next_read() {
    let app = TestApp::spawn().await;
    let cookie = app.login_as("John Doe", "john@example.com").await;
    let editor = app.create_role("editor").await;
    app.admin(Method::POST, &format!("/admin/users/1/roles/{editor}"), None)
        .await;

    let res = app
        .admin(Method::DELETE, &format!("/admin/users/1/roles/{editor}"), None)
        .await;
    assert_eq!(res.status(), 204);

    let body = body_json(app.get("/users/me", Some(&cookie)).await).await;
    assert_eq!(body["roles"], json!([]));

    let res = app
        .admin(Method::DELETE, &format!("/admin/users/1/roles/{editor}"), None)
        .await;
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let app = TestApp::spawn().await;
    app.register("John Doe", "john@example.com", common::TEST_PASSWORD)
        .await;
    let role = app.create_role("editor").await;

    let res = app
        .admin(Method::POST, &format!("/admin/roles/{role}/permissions/99"), None)
        .await;
    assert_eq!(res.status(), 404);

    let res = app
        .admin(Method::POST, &format!("/admin/users/42/roles/{role}"), None)
        .await;
    assert_eq!(res.status(), 404);
    assert_eq!(body_json(res).await["error"], "User not found");

    let res = app
        .admin(Method::POST, "/admin/users/1/roles/99", None)
        .await;
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn non_numeric_ids_are_json_bad_requests() {
    let app = TestApp::spawn().await;

    let res = app
        .admin(Method::POST, "/admin/users/one/roles/2", None)
        .await;

    assert_eq!(res.status(), 400);
    let body = body_json(res).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid path parameter"));
}
