//! `POST /v1/immurestproxy/batch/get`

use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use bytes::Bytes;
use kvgw_core::KeyList;

use super::AppState;
use crate::gateway::{decode_body, dispatch, encode_json, GatewayError, RequestScope, TenantScope};

/// Fetches several keys in one call. Body: `{"keys": [{"key": ...}, ...]}`.
///
/// Keys that do not exist are left out of the response.
pub async fn get_batch_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let scope = RequestScope::new(&headers, state.config.rpc_timeout);

    let list: KeyList = decode_body(&body)?;
    let keys = list
        .keys
        .into_iter()
        .map(|k| k.key.ok_or(GatewayError::MissingParameter("keys.key")))
        .collect::<Result<Vec<_>, _>>()?;

    let tenant = TenantScope::from_request(&uri, &headers)?;
    let keys = tenant.prefix_many(keys);

    let mut items = dispatch(
        "get_batch",
        scope.call(),
        state.client.get_batch(scope.call(), &keys),
    )
    .await?;
    tenant.unprefix(&mut items.items);
    encode_json(&items)
}
