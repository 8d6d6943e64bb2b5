//! Single-item reads and writes.
//!
//! - `GET  /v1/immurestproxy/item/{key}`
//! - `POST /v1/immurestproxy/item` with `{"key": ..., "value": ...}`

use std::collections::HashMap;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use bytes::Bytes;
use kvgw_core::{decode_bytes, KeyValue};

use super::AppState;
use crate::gateway::{decode_body, dispatch, encode_json, GatewayError, RequestScope, TenantScope};

pub async fn get_handler(
    State(state): State<AppState>,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let scope = RequestScope::new(&headers, state.config.rpc_timeout);

    let Path(params) = params.map_err(|e| GatewayError::type_mismatch("key", e))?;
    let raw = params
        .get("key")
        .ok_or(GatewayError::MissingParameter("key"))?;
    let key = decode_bytes(raw).map_err(|e| GatewayError::type_mismatch("key", e))?;

    let tenant = TenantScope::from_request(&uri, &headers)?;
    let key = tenant.prefix_one(key);

    let mut item = dispatch("get", scope.call(), state.client.get(scope.call(), &key)).await?;
    tenant.unprefix(std::slice::from_mut(&mut item));
    encode_json(&item)
}

/// Stores a value and returns the index assigned to the write.
pub async fn set_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let scope = RequestScope::new(&headers, state.config.rpc_timeout);

    let kv: KeyValue = decode_body(&body)?;
    let key = kv.key.ok_or(GatewayError::MissingParameter("key"))?;

    let tenant = TenantScope::from_request(&uri, &headers)?;
    let key = tenant.prefix_one(key);

    let index = dispatch(
        "set",
        scope.call(),
        state.client.set(scope.call(), &key, &kv.value),
    )
    .await?;
    encode_json(&index)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::testutil::{bearer, get, post_json, send, test_state};

    #[tokio::test]
    async fn set_writes_into_tenant_namespace() {
        let (state, client) = test_state();
        // {"key": "k1", "value": "v1"}
        let req = bearer(
            post_json(
                "/v1/immurestproxy/item?multi-tenant",
                r#"{"key":"azE=","value":"djE="}"#,
            ),
            "alice",
        );
        let (status, body) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["index"], 0);

        let raw = send(state, get("/v1/immurestproxy/item/YWxpY2U6azE=")).await;
        assert_eq!(raw.0, StatusCode::OK);
        assert_eq!(raw.1["value"], "djE=");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn get_returns_key_without_prefix() {
        let (state, client) = test_state();
        client.insert(b"alice:k1", b"v1");

        let req = bearer(get("/v1/immurestproxy/item/azE=?multi-tenant"), "alice");
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key"], "azE=");
        assert_eq!(body["value"], "djE=");
    }

    #[tokio::test]
    async fn other_tenants_keys_are_invisible() {
        let (state, client) = test_state();
        client.insert(b"bob:k1", b"secret");

        let req = bearer(get("/v1/immurestproxy/item/azE=?multi-tenant"), "alice");
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 5);
    }

    #[tokio::test]
    async fn set_without_key_is_missing_parameter() {
        let (state, client) = test_state();
        let (status, body) =
            send(state, post_json("/v1/immurestproxy/item", r#"{"value":"djE="}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "missing parameter key");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn set_with_non_base64_key_is_type_mismatch() {
        let (state, client) = test_state();
        let (status, _body) = send(
            state,
            post_json("/v1/immurestproxy/item", r#"{"key":"***","value":""}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn non_utf8_key_path_is_type_mismatch() {
        let (state, client) = test_state();
        let (status, body) = send(state, get("/v1/immurestproxy/item/%FF%FE")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 3);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("type mismatch, parameter: key"));
        assert_eq!(client.call_count(), 0);
    }
}
