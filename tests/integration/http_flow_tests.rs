// ==============================
// tests/integration/http_flow_tests.rs
// ==============================
//! End-to-end flows through the HTTP router
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use gatekeeper_lib::config::Settings;
use gatekeeper_lib::router::create_router;
use gatekeeper_lib::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::test_utils::{create_admin, create_user, setup_test_env, STRONG_PASSWORD};

fn app_with(settings: Settings) -> (Router, crate::test_utils::TestEnv) {
    let env = setup_test_env(settings);
    (create_router(env.state.clone()), env)
}

fn post_json(uri: &str, client: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-real-ip", client)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: &str, uri: &str, session_id: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {session_id}"))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, identifier: &str, password: &str) -> Response {
    app.clone()
        .oneshot(post_json(
            "/auth/login",
            "192.0.2.10",
            json!({ "identifier": identifier, "password": password }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = create_router(Arc::new(AppState::in_memory(Settings::default())));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_register_login_me_logout() {
    let (app, _env) = app_with(Settings::default());

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/register",
            "192.0.2.1",
            json!({
                "identifier": "alice",
                "email": "alice@example.com",
                "password": STRONG_PASSWORD,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = json_body(response).await;
    assert_eq!(user["identifier"], "alice");
    assert_eq!(user["display_name"], "alice");
    assert!(user.get("password_hash").is_none());

    let response = login(&app, "alice", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let body = json_body(response).await;
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert!(cookie.starts_with(&format!("session_id={session_id};")));

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/me", &session_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = json_body(response).await;
    assert_eq!(me["user"]["identifier"], "alice");
    assert_eq!(me["session"]["id"], session_id.as_str());

    // The cookie works as well as the header
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, format!("session_id={session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed("POST", "/api/logout", &session_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(cleared.to_str().unwrap().contains("Max-Age=0"));

    let response = app
        .oneshot(authed("GET", "/api/me", &session_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "SESS_001");
}

#[tokio::test]
async fn test_register_validation() {
    let (app, env) = app_with(Settings::default());
    create_user(&env.state.sessions, "alice").await;

    let weak = app
        .clone()
        .oneshot(post_json(
            "/auth/register",
            "192.0.2.2",
            json!({ "identifier": "bob", "email": "bob@example.com", "password": "short" }),
        ))
        .await
        .unwrap();
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);

    let taken = app
        .oneshot(post_json(
            "/auth/register",
            "192.0.2.3",
            json!({
                "identifier": "alice",
                "email": "new@example.com",
                "password": STRONG_PASSWORD,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(taken.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(taken).await["error"]["code"], "USER_002");
}

#[tokio::test]
async fn test_login_routes_are_rate_limited_per_client() {
    let (app, _env) = app_with(Settings::default());

    // Default auth limiter: burst of 3
    for _ in 0..3 {
        let response = login(&app, "nobody", "Wrong-Horse-00").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = login(&app, "nobody", "Wrong-Horse-00").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"]["code"], "RATE_001");

    // A different client still gets through
    let response = app
        .oneshot(post_json(
            "/auth/login",
            "192.0.2.99",
            json!({ "identifier": "nobody", "password": "Wrong-Horse-00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lockout_over_http() {
    let mut settings = Settings::default();
    settings.rate_limit.auth.burst = 50;
    let (app, env) = app_with(settings);
    create_user(&env.state.sessions, "alice").await;

    for _ in 0..5 {
        let response = login(&app, "alice", "Wrong-Horse-00").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = login(&app, "alice", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"]["code"], "AUTH_003");
}

#[tokio::test]
async fn test_admin_dashboard_requires_admin_role() {
    let (app, env) = app_with(Settings::default());
    create_user(&env.state.sessions, "alice").await;
    create_admin(&env.state.sessions, "root").await;

    let user_session = json_body(login(&app, "alice", STRONG_PASSWORD).await).await;
    let admin_session = json_body(login(&app, "root", STRONG_PASSWORD).await).await;

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/admin/dashboard",
            user_session["session_id"].as_str().unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(authed(
            "GET",
            "/api/admin/dashboard",
            admin_session["session_id"].as_str().unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["admin"], "root");
}

#[tokio::test]
async fn test_change_password_signs_out_everywhere() {
    let (app, env) = app_with(Settings::default());
    create_user(&env.state.sessions, "alice").await;

    let first = json_body(login(&app, "alice", STRONG_PASSWORD).await).await;
    let second = json_body(login(&app, "alice", STRONG_PASSWORD).await).await;
    let first = first["session_id"].as_str().unwrap().to_string();
    let second = second["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/sessions", &first))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["sessions"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/password")
                .header(header::AUTHORIZATION, format!("Bearer {first}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "current_password": STRONG_PASSWORD,
                        "new_password": "Brand-New-Secret-7",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    for session_id in [&first, &second] {
        let response = app
            .clone()
            .oneshot(authed("GET", "/api/me", session_id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = login(&app, "alice", "Brand-New-Secret-7").await;
    assert_eq!(response.status(), StatusCode::OK);
}

fn authed_json(method: &str, uri: &str, session_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {session_id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_revoke_session_by_id() {
    let (app, env) = app_with(Settings::default());
    create_user(&env.state.sessions, "alice").await;
    create_user(&env.state.sessions, "bob").await;

    let current = json_body(login(&app, "alice", STRONG_PASSWORD).await).await;
    let other = json_body(login(&app, "alice", STRONG_PASSWORD).await).await;
    let bob = json_body(login(&app, "bob", STRONG_PASSWORD).await).await;
    let current = current["session_id"].as_str().unwrap().to_string();
    let other = other["session_id"].as_str().unwrap().to_string();
    let bob = bob["session_id"].as_str().unwrap().to_string();

    // Bob cannot revoke a session of Alice
    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/sessions/{other}"), &bob))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"]["code"], "AUTH_005");

    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/sessions/{other}"), &current))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/me", &other))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Revoking the current session also clears the cookie
    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/sessions/{current}"), &current))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));

    let response = app.oneshot(authed("GET", "/api/me", &bob)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile_over_http() {
    let (app, env) = app_with(Settings::default());
    create_user(&env.state.sessions, "alice").await;
    create_user(&env.state.sessions, "bob").await;
    let session = json_body(login(&app, "alice", STRONG_PASSWORD).await).await;
    let session = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed_json(
            "PATCH",
            "/api/me",
            &session,
            json!({ "display_name": "Alice A.", "email": "alice@new.example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let user = json_body(response).await;
    assert_eq!(user["display_name"], "Alice A.");
    assert_eq!(user["email"], "alice@new.example.com");

    let response = app
        .clone()
        .oneshot(authed_json(
            "PATCH",
            "/api/me",
            &session,
            json!({ "email": "bob@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    for invalid in [json!({ "display_name": "   " }), json!({ "email": "not-an-address" })] {
        let response = app
            .clone()
            .oneshot(authed_json("PATCH", "/api/me", &session, invalid))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = login(&app, "alice@new.example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}
