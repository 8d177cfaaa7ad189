//! Router tests that never reach the backend: health, page, session guards
//! and request validation.
//!
//! Run with: cargo test --test routes_test

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    routing::{patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;
use utoipa::OpenApi;
use water_monitor::backend::SupabaseClient;
use water_monitor::common::AppState;
use water_monitor::config::{Config, Deployment};
use water_monitor::pipeline::Thresholds;
use water_monitor::routes::{build_router, ApiDoc};

const NEW_USER_ID: &str = "5f0c6f57-5d7a-4c3e-9a39-0f5d1a1b2c3d";

fn test_config() -> Config {
    // Nothing listens here; any request that reaches the backend fails fast
    config_for("http://127.0.0.1:9")
}

fn config_for(supabase_url: &str) -> Config {
    Config {
        supabase_url: supabase_url.to_string(),
        supabase_anon_key: "anon".to_string(),
        readings_table: "mediciones".to_string(),
        devices_table: "devices".to_string(),
        profiles_table: "profiles".to_string(),
        request_timeout_seconds: 2,
        realtime_heartbeat_seconds: 30,
        window_capacity: 20,
        thresholds: Thresholds::default(),
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        deployment: Deployment::Local,
    }
}

fn app() -> Router {
    app_for(&test_config())
}

fn app_for(config: &Config) -> Router {
    let client = SupabaseClient::new(config);
    build_router(AppState::new(config, client))
}

async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
    send_to(app(), request).await
}

async fn send_to(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn error_message(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn healthz_is_ok() {
    let (status, _) = send(get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn dashboard_page_is_served() {
    let (status, body) = send(get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("EventSource"));
}

#[tokio::test]
async fn dashboard_snapshot_before_sign_in() {
    let (status, body) = send(get("/api/dashboard")).await;
    assert_eq!(status, StatusCode::OK);

    let snapshot: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(snapshot["status"], "connecting");
    assert_eq!(snapshot["reading_count"], 0);
    assert!(snapshot["view"].is_null());
    assert!(snapshot["subject"].is_null());
}

#[tokio::test]
async fn refresh_without_session_is_unavailable() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/refresh")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_message(&body), "No active session");
}

#[tokio::test]
async fn session_requires_sign_in() {
    let (status, _) = send(get("/api/session")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(json_request(
        Method::POST,
        "/api/device",
        &json!({ "mac_address": "AA:BB:CC:DD:EE:FF" }),
    ))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_sign_in() {
    let (status, _) = send(get("/api/admin/users")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(get("/api/admin/devices")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(json_request(
        Method::PUT,
        "/api/admin/users/5f0c6f57-5d7a-4c3e-9a39-0f5d1a1b2c3d/role",
        &json!({ "role": "admin" }),
    ))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_requires_every_field() {
    let (status, body) = send(json_request(
        Method::POST,
        "/api/signup",
        &json!({
            "email": "ana@example.com",
            "password": "secret",
            "full_name": "Ana",
            "phone": "",
            "address": "Calle 1"
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("phone"));
}

#[tokio::test]
async fn sign_in_rejects_malformed_email() {
    let (status, _) = send(json_request(
        Method::POST,
        "/api/session",
        &json!({ "email": "not-an-email", "password": "x" }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sign_out_without_session_still_succeeds() {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/session")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn docs_are_served() {
    let (status, _) = send(get("/docs")).await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn openapi_lists_every_route() {
    let doc = ApiDoc::openapi();
    for path in [
        "/healthz",
        "/",
        "/api/dashboard",
        "/api/dashboard/stream",
        "/api/refresh",
        "/api/session",
        "/api/signup",
        "/api/device",
        "/api/admin/users",
        "/api/admin/users/{user_id}/role",
        "/api/admin/devices",
    ] {
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }
}

/// Minimal Supabase stand-in: sign-up answers with `signup_body`, profile
/// PATCHes are answered with one row and their `Authorization` header kept.
async fn fake_supabase(signup_body: Value) -> (String, Arc<Mutex<Vec<String>>>) {
    let profile_auth = Arc::new(Mutex::new(Vec::new()));
    let recorder = profile_auth.clone();

    let app = Router::new()
        .route(
            "/auth/v1/signup",
            post(move || {
                let body = signup_body.clone();
                async move { Json(body) }
            }),
        )
        .route(
            "/rest/v1/profiles",
            patch(move |headers: HeaderMap| {
                let recorder = recorder.clone();
                async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    recorder.lock().unwrap().push(auth);
                    Json(json!([{ "id": NEW_USER_ID, "full_name": "Ana" }]))
                }
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), profile_auth)
}

fn sign_up_request() -> Request<Body> {
    json_request(
        Method::POST,
        "/api/signup",
        &json!({
            "email": "ana@example.com",
            "password": "secret",
            "full_name": "Ana",
            "phone": "555-0100",
            "address": "Calle 1"
        }),
    )
}

#[tokio::test]
async fn sign_up_stores_profile_as_the_new_account() {
    let (url, profile_auth) = fake_supabase(json!({
        "access_token": "new-user-token",
        "user": { "id": NEW_USER_ID, "email": "ana@example.com" }
    }))
    .await;

    let (status, body) = send_to(app_for(&config_for(&url)), sign_up_request()).await;

    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(created["user_id"], NEW_USER_ID);
    assert_eq!(
        profile_auth.lock().unwrap().clone(),
        vec!["Bearer new-user-token".to_string()]
    );
}

#[tokio::test]
async fn sign_up_awaiting_confirmation_skips_profile_write() {
    let (url, profile_auth) = fake_supabase(json!({
        "id": NEW_USER_ID,
        "email": "ana@example.com"
    }))
    .await;

    let (status, _) = send_to(app_for(&config_for(&url)), sign_up_request()).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(profile_auth.lock().unwrap().is_empty());
}
