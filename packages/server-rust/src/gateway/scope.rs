//! Per-request scopes: the caller's tenant namespace and the RPC call context.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Uri};
use kvgw_core::{derive_prefix, KeyBearing, TenantPrefix};
use tokio_util::sync::DropGuard;
use uuid::Uuid;

use super::error::GatewayError;
use crate::rpc::CallContext;

/// Query parameter whose presence turns tenant isolation on.
pub const ISOLATION_PARAM: &str = "multi-tenant";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tenant namespace of one request.
///
/// Built once per request from the query string and `Authorization` header.
/// All key material going to the RPC service passes through
/// [`prefix_one`](Self::prefix_one) or [`prefix_many`](Self::prefix_many),
/// and all keys coming back through [`unprefix`](Self::unprefix).
#[derive(Debug, Clone, Default)]
pub struct TenantScope {
    prefix: Option<TenantPrefix>,
}

impl TenantScope {
    /// Derives the scope for a request.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TypeMismatch`] for a malformed query string and
    /// [`GatewayError::AuthToken`] when isolation is requested and the bearer
    /// token is missing, not ASCII, or unparseable.
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Result<Self, GatewayError> {
        let isolation = isolation_requested(uri)?;
        let authorization = match headers.get(AUTHORIZATION) {
            Some(value) if isolation => Some(value.to_str().map_err(|_| {
                GatewayError::AuthToken(kvgw_core::TokenError::UnknownFormat)
            })?),
            _ => None,
        };
        let prefix = derive_prefix(isolation, authorization)?;
        Ok(Self { prefix })
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&TenantPrefix> {
        self.prefix.as_ref()
    }

    #[must_use]
    pub fn prefix_one(&self, key: Vec<u8>) -> Vec<u8> {
        kvgw_core::prefix_one(self.prefix(), key)
    }

    #[must_use]
    pub fn prefix_many(&self, keys: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        kvgw_core::prefix_many(self.prefix(), keys)
    }

    pub fn unprefix<T: KeyBearing>(&self, items: &mut [T]) {
        kvgw_core::unprefix(self.prefix(), items);
    }
}

/// `true` when the percent-decoded query names [`ISOLATION_PARAM`], with or
/// without a value.
///
/// # Errors
///
/// Returns [`GatewayError::TypeMismatch`] if the query cannot be decoded.
pub fn isolation_requested(uri: &Uri) -> Result<bool, GatewayError> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri)
        .map_err(|e| GatewayError::type_mismatch("query", e))?;
    Ok(params.contains_key(ISOLATION_PARAM))
}

/// Call context owned by one gateway request.
///
/// Dropping the scope cancels the context, so an RPC still in flight when the
/// handler finishes or the client disconnects is aborted.
pub struct RequestScope {
    call: CallContext,
    _cancel_on_drop: DropGuard,
}

impl RequestScope {
    #[must_use]
    pub fn new(headers: &HeaderMap, rpc_timeout: Option<Duration>) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

        let mut call = CallContext::new(request_id);
        call.deadline = rpc_timeout.map(|timeout| tokio::time::Instant::now() + timeout);
        let guard = call.cancel.clone().drop_guard();
        Self {
            call,
            _cancel_on_drop: guard,
        }
    }

    #[must_use]
    pub fn call(&self) -> &CallContext {
        &self.call
    }
}
