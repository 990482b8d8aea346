//! Integration tests for the HTTP boundary: dual-mode authentication and
//! error mapping, driven through the real router against an in-memory store

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use taskdeck_api::{build_router, AppState};
use tower::ServiceExt; // For oneshot()

async fn test_app() -> Router {
    let db = taskdeck_db::connect("sqlite::memory:")
        .await
        .expect("Failed to connect");
    taskdeck_db::migrate(&db).await.expect("Failed to migrate");

    build_router(
        Arc::new(AppState {
            db,
            allow_signup: true,
        }),
        false,
    )
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json");
    match body {
        Some(value) => builder.body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request")
}

/// Register a user and return their session token.
async fn register(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "long-enough-pw",
            }),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["token"].as_str().expect("token in response").to_string()
}

#[tokio::test]
async fn protected_route_without_credential_is_401() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "MISSING_AUTH");
}

#[tokio::test]
async fn malformed_authorization_header_is_401() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("Authorization", "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_AUTH_FORMAT");
}

#[tokio::test]
async fn register_login_me_roundtrip() {
    let app = test_app().await;
    let token = register(&app, "alice").await;

    // Bearer token works.
    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["username"], "alice");
    assert_eq!(me["userType"], "human");

    // So does the session cookie.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("Cookie", format!("taskdeck_session={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Fresh login issues a distinct session.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "alice", "password": "long-enough-pw" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    assert_ne!(login["token"], json!(token));
}

#[tokio::test]
async fn wrong_password_login_is_401() {
    let app = test_app().await;
    register(&app, "bob").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "bob", "password": "wrong" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = test_app().await;
    let token = register(&app, "carol").await;

    let response = app
        .clone()
        .oneshot(authed_request("POST", "/api/auth/logout", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(authed_request("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bot_token_authenticates_and_is_permission_gated() {
    let app = test_app().await;
    let token = register(&app, "dave").await;

    // dave needs a team before creating projects.
    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/teams",
            &token,
            Some(json!({ "name": "Acme" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Create a read-only bot.
    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/bots",
            &token,
            Some(json!({ "username": "reader", "permissions": ["read"] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let bot_token = created["token"].as_str().expect("bot token");
    assert!(bot_token.starts_with("bot_"));

    // The bot resolves via the same bearer header.
    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/auth/me", bot_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["userType"], "bot");
    assert_eq!(me["permissions"], json!(["read"]));

    // Reading is allowed.
    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/projects", bot_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Creating projects is not.
    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/projects",
            bot_token,
            Some(json!({ "name": "Forbidden" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_bot_token_is_401() {
    let app = test_app().await;

    let response = app
        .oneshot(authed_request("GET", "/api/auth/me", "bot_deadbeef00", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn project_cascade_delete_reports_counts_over_http() {
    let app = test_app().await;
    let token = register(&app, "erin").await;

    app.clone()
        .oneshot(authed_request(
            "POST",
            "/api/teams",
            &token,
            Some(json!({ "name": "Globex" })),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/projects",
            &token,
            Some(json!({ "name": "P1" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let project = body_json(response).await;
    let project_id = project["id"].as_str().expect("project id").to_string();

    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/tasks",
            &token,
            Some(json!({ "projectId": project_id, "title": "T1" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task = body_json(response).await;
    let task_id = task["id"].as_str().expect("task id").to_string();

    let response = app
        .clone()
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/projects/{project_id}"),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["deleted"], json!(true));
    assert_eq!(summary["tasksDeleted"], json!(1));
    assert_eq!(summary["subtasksDeleted"], json!(0));

    let response = app
        .oneshot(authed_request(
            "GET",
            &format!("/api/tasks/{task_id}"),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_team_name_maps_to_conflict() {
    let app = test_app().await;
    let first = register(&app, "frank").await;
    let second = register(&app, "grace").await;

    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/teams",
            &first,
            Some(json!({ "name": "Initech" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed_request(
            "POST",
            "/api/teams",
            &second,
            Some(json!({ "name": "Initech" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "DUPLICATE_TEAM_NAME");
}
