//! `POST /v1/immurestproxy/item/scan`

use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use bytes::Bytes;
use kvgw_core::ScanOptions;

use super::AppState;
use crate::gateway::{decode_body, dispatch, encode_json, GatewayError, RequestScope, TenantScope};

/// Key-ordered scan. Body: `{"prefix", "offset", "limit", "reverse"}`.
///
/// Both `prefix` and `offset` are keys. An empty prefix still gets the
/// tenant prefix, so an isolated scan never leaves the namespace; an empty
/// offset means "from the start" and is sent as-is.
pub async fn scan_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let scope = RequestScope::new(&headers, state.config.rpc_timeout);

    let mut opts: ScanOptions = decode_body(&body)?;
    let tenant = TenantScope::from_request(&uri, &headers)?;
    opts.prefix = tenant.prefix_one(opts.prefix);
    if !opts.offset.is_empty() {
        opts.offset = tenant.prefix_one(opts.offset);
    }

    let mut items = dispatch("scan", scope.call(), state.client.scan(scope.call(), &opts)).await?;
    tenant.unprefix(&mut items.items);
    encode_json(&items)
}
