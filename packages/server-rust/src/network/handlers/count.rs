//! `GET /v1/immurestproxy/item/count/{prefix}`

use std::collections::HashMap;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use kvgw_core::decode_bytes;

use super::AppState;
use crate::gateway::{dispatch, encode_json, GatewayError, RequestScope, TenantScope};

/// Counts the keys under a prefix within the caller's namespace.
///
/// The `prefix` path parameter is a base64 byte string.
pub async fn count_handler(
    State(state): State<AppState>,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let scope = RequestScope::new(&headers, state.config.rpc_timeout);

    let Path(params) = params.map_err(|e| GatewayError::type_mismatch("prefix", e))?;
    let raw = params
        .get("prefix")
        .ok_or(GatewayError::MissingParameter("prefix"))?;
    let prefix = decode_bytes(raw).map_err(|e| GatewayError::type_mismatch("prefix", e))?;

    let tenant = TenantScope::from_request(&uri, &headers)?;
    let prefix = tenant.prefix_one(prefix);

    let count = dispatch("count", scope.call(), state.client.count(scope.call(), &prefix)).await?;
    encode_json(&count)
}
