#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use sitevault_api::auth::jwt::{generate_access_token, JwtConfig};
use sitevault_api::config::{ServerConfig, StoreBackend};
use sitevault_api::router::build_app_router;
use sitevault_api::state::AppState;
use sitevault_core::engine::{EngineConfig, SnapshotEngine};
use sitevault_core::store::MemorySnapshotStore;
use sitevault_events::EventBus;

/// Build a test `ServerConfig` with safe defaults on the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        engine: EngineConfig::default(),
        store: StoreBackend::Memory,
        log_json: false,
    }
}

/// A router plus the pieces tests inspect directly.
pub struct TestApp {
    pub router: Router,
    pub engine: Arc<SnapshotEngine>,
    pub event_bus: Arc<EventBus>,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with all middleware layers over a fresh
/// in-memory snapshot store.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());
    let engine = Arc::new(
        SnapshotEngine::new(Arc::new(MemorySnapshotStore::new()))
            .with_notifier(Arc::clone(&event_bus) as _)
            .with_config(config.engine),
    );

    let state = AppState {
        engine: Arc::clone(&engine),
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
    };

    TestApp {
        router: build_app_router(state, &config),
        engine,
        event_bus,
    }
}

/// A valid access token for `user` in `org` with `role`.
pub fn token(user: &str, org: &str, role: &str) -> String {
    generate_access_token(user, org, role, &test_config().jwt).unwrap()
}

/// Supervisor of organisation A.
pub fn supervisor_a() -> String {
    token("sup-1", "org-A", "supervisor")
}

/// Supervisor of organisation B.
pub fn supervisor_b() -> String {
    token("sup-2", "org-B", "supervisor")
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn get_anonymous(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn delete_anonymous(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None, None).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Create a snapshot as `token` and return the response `data`.
pub async fn create(
    app: &TestApp,
    token: &str,
    entity_type: &str,
    entity_id: &str,
    data: serde_json::Value,
) -> serde_json::Value {
    let response = post_json(
        app.app(),
        &format!("/api/v1/snapshots/{entity_type}/{entity_id}"),
        token,
        serde_json::json!({ "data": data }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}
