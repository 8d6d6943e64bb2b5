//! End-to-end gateway behavior against a scripted RPC service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{EncodingKey, Header};
use kvgw_core::{IScanOptions, Index, Item, ItemList, ItemsCount, Page, ScanOptions};
use kvgw_server::network::ShutdownController;
use kvgw_server::{build_router, AppState, CallContext, KvClient, NetworkConfig, RpcCode, RpcError};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// RPC service that records what it was asked and answers from a script.
#[derive(Default)]
struct ScriptedClient {
    count_prefixes: Mutex<Vec<Vec<u8>>>,
    count_reply: u64,
    page_reply: Vec<&'static [u8]>,
    iscan_calls: Mutex<Vec<IScanOptions>>,
    /// When set, `count` parks until its call context is cancelled.
    park_count: bool,
    parked: Mutex<Option<CancellationToken>>,
}

impl ScriptedClient {
    fn calls(&self) -> usize {
        self.count_prefixes.lock().len() + self.iscan_calls.lock().len()
    }
}

#[async_trait]
impl KvClient for ScriptedClient {
    async fn count(&self, ctx: &CallContext, prefix: &[u8]) -> Result<ItemsCount, RpcError> {
        self.count_prefixes.lock().push(prefix.to_vec());
        if self.park_count {
            *self.parked.lock() = Some(ctx.cancel.clone());
            ctx.cancel.cancelled().await;
            return Err(RpcError::cancelled());
        }
        Ok(ItemsCount {
            count: self.count_reply,
        })
    }

    async fn iscan(&self, _ctx: &CallContext, opts: IScanOptions) -> Result<Page, RpcError> {
        self.iscan_calls.lock().push(opts);
        let items = self
            .page_reply
            .iter()
            .enumerate()
            .map(|(i, key)| Item {
                key: key.to_vec(),
                value: b"v".to_vec(),
                index: i as u64,
            })
            .collect();
        Ok(Page { items, more: false })
    }

    async fn get(&self, _ctx: &CallContext, _key: &[u8]) -> Result<Item, RpcError> {
        Err(RpcError::new(RpcCode::Unimplemented, "get"))
    }

    async fn set(&self, _ctx: &CallContext, _key: &[u8], _value: &[u8]) -> Result<Index, RpcError> {
        Err(RpcError::new(RpcCode::Unimplemented, "set"))
    }

    async fn get_batch(&self, _ctx: &CallContext, _keys: &[Vec<u8>]) -> Result<ItemList, RpcError> {
        Err(RpcError::new(RpcCode::Unimplemented, "get_batch"))
    }

    async fn scan(&self, _ctx: &CallContext, _opts: &ScanOptions) -> Result<ItemList, RpcError> {
        Err(RpcError::new(RpcCode::Unimplemented, "scan"))
    }
}

fn state(client: Arc<ScriptedClient>) -> AppState {
    AppState {
        client,
        shutdown: Arc::new(ShutdownController::new()),
        config: Arc::new(NetworkConfig::default()),
        start_time: Instant::now(),
    }
}

fn paseto(username: &str) -> String {
    let mut raw = serde_json::to_vec(&serde_json::json!({ "username": username })).unwrap();
    raw.extend_from_slice(&[9u8; 64]);
    format!("v2.public.{}", URL_SAFE_NO_PAD.encode(raw))
}

fn jwt(username: &str) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &serde_json::json!({ "username": username }),
        &EncodingKey::from_secret(b"irrelevant"),
    )
    .unwrap()
}

async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = build_router(state).oneshot(req).await.unwrap();
    let status = response.status();
    assert_eq!(response.headers()["content-type"], "application/json");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn isolated_count_prefixes_the_rpc_key() {
    let client = Arc::new(ScriptedClient {
        count_reply: 7,
        ..ScriptedClient::default()
    });
    let req = Request::get("/v1/immurestproxy/item/count/YQ==?multi-tenant")
        .header("authorization", format!("Bearer {}", paseto("alice")))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(state(client.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "count": 7 }));
    assert_eq!(*client.count_prefixes.lock(), vec![b"alice:a".to_vec()]);
}

#[tokio::test]
async fn isolated_iscan_strips_tenant_prefix() {
    let client = Arc::new(ScriptedClient {
        page_reply: vec![&b"bob:k1"[..], &b"bob:k2"[..]],
        ..ScriptedClient::default()
    });
    let req = Request::post("/v1/immurestproxy/item/iscan?multi-tenant")
        .header("authorization", format!("Bearer {}", jwt("bob")))
        .body(Body::from(r#"{"pageNumber":1,"pageSize":10}"#))
        .unwrap();

    let (status, body) = send(state(client.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["key"], "azE=");
    assert_eq!(body["items"][1]["key"], "azI=");
    assert_eq!(
        *client.iscan_calls.lock(),
        vec![IScanOptions {
            page_number: 1,
            page_size: 10
        }]
    );
}

#[tokio::test]
async fn iscan_without_flag_is_untouched() {
    let client = Arc::new(ScriptedClient {
        page_reply: vec![&b"bob:k1"[..], &b"bob:k2"[..]],
        ..ScriptedClient::default()
    });
    // A token alone does not turn isolation on.
    let req = Request::post("/v1/immurestproxy/item/iscan")
        .header("authorization", format!("Bearer {}", paseto("bob")))
        .body(Body::from(r#"{"pageNumber":1,"pageSize":10}"#))
        .unwrap();

    let (status, body) = send(state(client), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["key"], "Ym9iOmsx");
    assert_eq!(body["items"][1]["key"], "Ym9iOmsy");
}

#[tokio::test]
async fn missing_authorization_fails_before_rpc() {
    let client = Arc::new(ScriptedClient::default());
    let req = Request::get("/v1/immurestproxy/item/count/YQ==?multi-tenant")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(state(client.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 16);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("error parsing public payload of auth token"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn dropped_request_cancels_inflight_rpc() {
    let client = Arc::new(ScriptedClient {
        park_count: true,
        ..ScriptedClient::default()
    });
    let router = build_router(state(client.clone()));
    let req = Request::get("/v1/immurestproxy/item/count/YQ==")
        .body(Body::empty())
        .unwrap();
    let request = tokio::spawn(router.oneshot(req));

    let token = loop {
        if let Some(token) = client.parked.lock().clone() {
            break token;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert!(!token.is_cancelled());

    request.abort();
    let _ = request.await;
    assert!(token.is_cancelled());
}
