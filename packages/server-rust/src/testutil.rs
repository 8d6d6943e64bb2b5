//! Helpers shared by handler tests.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tower::ServiceExt;

use crate::network::{build_router, AppState, NetworkConfig, ShutdownController};
use crate::rpc::MemoryClient;

/// PASETO v2 public token for `username` with a dummy signature.
pub(crate) fn paseto_token(username: &str) -> String {
    let mut raw = serde_json::to_vec(&serde_json::json!({ "username": username })).unwrap();
    raw.extend_from_slice(&[0u8; 64]);
    format!("v2.public.{}", URL_SAFE_NO_PAD.encode(raw))
}

pub(crate) fn test_state() -> (AppState, Arc<MemoryClient>) {
    let client = Arc::new(MemoryClient::new());
    let state = AppState {
        client: client.clone(),
        shutdown: Arc::new(ShutdownController::new()),
        config: Arc::new(NetworkConfig::default()),
        start_time: Instant::now(),
    };
    (state, client)
}

pub(crate) fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub(crate) fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub(crate) fn bearer(mut req: Request<Body>, username: &str) -> Request<Body> {
    let value = format!("Bearer {}", paseto_token(username));
    req.headers_mut()
        .insert("authorization", value.parse().unwrap());
    req
}

/// Sends `req` through the full router and returns status and JSON body.
pub(crate) async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = build_router(state).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
