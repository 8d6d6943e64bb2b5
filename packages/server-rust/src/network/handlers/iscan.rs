//! `POST /v1/immurestproxy/item/iscan`

use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use bytes::Bytes;
use kvgw_core::IScanOptions;

use super::AppState;
use crate::gateway::{decode_body, dispatch, encode_json, GatewayError, RequestScope, TenantScope};

/// Returns one page of entries in insertion order.
///
/// Body: `{"pageNumber": n, "pageSize": m}`; an empty body sends zeros and
/// lets the RPC service reject them.
// TODO: the RPC `iscan` call takes no key prefix, so with isolation on a page
// can still hold other tenants' entries (passed through with raw keys).
// Needs a prefix argument on the service side.
pub async fn iscan_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let scope = RequestScope::new(&headers, state.config.rpc_timeout);

    let opts: IScanOptions = decode_body(&body)?;
    let tenant = TenantScope::from_request(&uri, &headers)?;

    let mut page = dispatch("iscan", scope.call(), state.client.iscan(scope.call(), opts)).await?;
    tenant.unprefix(&mut page.items);
    encode_json(&page)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::testutil::{bearer, post_json, send, test_state};

    const PATH: &str = "/v1/immurestproxy/item/iscan";

    #[tokio::test]
    async fn strips_tenant_prefix_from_page_keys() {
        let (state, client) = test_state();
        client.insert(b"bob:k1", b"v1");
        client.insert(b"bob:k2", b"v2");

        let req = bearer(
            post_json(&format!("{PATH}?multi-tenant"), r#"{"pageNumber":1,"pageSize":10}"#),
            "bob",
        );
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::OK);
        // base64("k1"), base64("k2")
        assert_eq!(body["items"][0]["key"], "azE=");
        assert_eq!(body["items"][1]["key"], "azI=");
        assert_eq!(body["more"], false);
    }

    #[tokio::test]
    async fn keys_are_untouched_without_isolation() {
        let (state, client) = test_state();
        client.insert(b"bob:k1", b"v1");

        let (status, body) =
            send(state, post_json(PATH, r#"{"pageNumber":1,"pageSize":10}"#)).await;
        assert_eq!(status, StatusCode::OK);
        // base64("bob:k1")
        assert_eq!(body["items"][0]["key"], "Ym9iOmsx");
    }

    #[tokio::test]
    async fn foreign_keys_pass_through() {
        let (state, client) = test_state();
        client.insert(b"bob:k1", b"v1");
        client.insert(b"eve:k9", b"v9");

        let req = bearer(
            post_json(&format!("{PATH}?multi-tenant"), r#"{"pageNumber":1,"pageSize":10}"#),
            "bob",
        );
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["key"], "azE=");
        // base64("eve:k9")
        assert_eq!(body["items"][1]["key"], "ZXZlOms5");
    }

    #[tokio::test]
    async fn empty_body_surfaces_upstream_rejection() {
        let (state, client) = test_state();
        let (status, body) = send(state, post_json(PATH, "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 3);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_before_rpc() {
        let (state, client) = test_state();
        let (status, _body) = send(state, post_json(PATH, "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_token_never_reaches_rpc() {
        let (state, client) = test_state();
        let req = post_json(&format!("{PATH}?multi-tenant"), r#"{"pageNumber":1,"pageSize":10}"#);
        let (status, _body) = send(state, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(client.call_count(), 0);
    }
}
