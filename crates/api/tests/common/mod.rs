#![allow(dead_code)]

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use teamdesk_api::auth::jwt::{generate_access_token, JwtConfig};
use teamdesk_api::config::{RealtimeConfig, ServerConfig};
use teamdesk_api::router::build_app_router;
use teamdesk_api::state::AppState;
use teamdesk_core::identity::CallerIdentity;
use teamdesk_core::roles::Role;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:4200".to_string()],
        request_timeout_secs: 30,
        realtime: RealtimeConfig::default(),
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

pub fn test_state() -> AppState {
    AppState::new(test_config())
}

/// Build the full application router over `state`, with the same middleware
/// stack production uses.
pub fn build_test_app(state: AppState) -> Router {
    let config = test_config();
    build_app_router(state, &config)
}

pub fn admin(user_id: i64, username: &str) -> CallerIdentity {
    CallerIdentity::new(user_id, username, vec![Role::Admin])
}

pub fn member(user_id: i64, username: &str) -> CallerIdentity {
    CallerIdentity::new(user_id, username, vec![Role::Member])
}

/// Sign a session token the way the login service would.
pub fn token_for(identity: &CallerIdentity) -> String {
    generate_access_token(identity, &test_config().jwt).expect("token generation should succeed")
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should be handled")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Decode a text frame queued by the registry.
pub fn frame_json(message: Message) -> serde_json::Value {
    match message {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("frame should be JSON"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}
