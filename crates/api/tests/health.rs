mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, build_test_app, get, member, send, test_state};

#[tokio::test]
async fn health_returns_ok() {
    let response = get(build_test_app(test_state()), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["connections"], 0);
}

#[tokio::test]
async fn health_counts_connections() {
    let state = test_state();
    let _conn = state.ws_manager.admit("c".into(), Some(member(1, "ann"))).await;

    let json = body_json(get(build_test_app(state), "/health").await).await;
    assert_eq!(json["connections"], 1);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let response = get(build_test_app(test_state()), "/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let response = get(build_test_app(test_state()), "/health").await;

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn client_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-42")
        .body(Body::empty())
        .unwrap();
    let response = send(build_test_app(test_state()), request).await;

    assert_eq!(response.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn cors_exposes_request_id_to_the_frontend() {
    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:4200")
        .body(Body::empty())
        .unwrap();
    let response = send(build_test_app(test_state()), request).await;

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:4200"
    );
    let exposed = response.headers()["access-control-expose-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-request-id"));
}

#[tokio::test]
async fn websocket_without_session_is_refused_before_upgrade() {
    let state = test_state();
    let response = get(build_test_app(state.clone()), "/api/ws").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.ws_manager.connection_count().await, 0);
}

#[tokio::test]
async fn websocket_with_invalid_token_is_refused() {
    let response = get(build_test_app(test_state()), "/api/ws?token=garbage").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
