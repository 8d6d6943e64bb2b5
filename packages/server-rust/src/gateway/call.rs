//! The shared steps of every gateway handler: body decoding, RPC dispatch
//! under cancellation and deadline, and JSON encoding.

use std::future::Future;
use std::time::Instant;

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info_span, Instrument};

use super::error::GatewayError;
use crate::rpc::{CallContext, RpcError};

/// Decodes a JSON request body. An empty body yields the default value.
///
/// # Errors
///
/// Returns [`GatewayError::TypeMismatch`] for malformed or mistyped JSON.
pub fn decode_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::type_mismatch("body", e))
}

/// Runs one RPC call bounded by the request's cancellation token and deadline.
///
/// The call is wrapped in an `rpc` span recording its outcome and duration.
///
/// # Errors
///
/// Returns [`GatewayError::Upstream`] when the call fails, is cancelled, or
/// runs past the deadline.
pub async fn dispatch<T, F>(
    endpoint: &'static str,
    ctx: &CallContext,
    call: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    let span = info_span!(
        "rpc",
        endpoint,
        request_id = %ctx.request_id,
        duration_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );

    async move {
        let start = Instant::now();
        let bounded = async {
            match ctx.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, call)
                    .await
                    .unwrap_or_else(|_elapsed| Err(RpcError::deadline_exceeded())),
                None => call.await,
            }
        };

        let result = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => Err(RpcError::cancelled()),
            result = bounded => result,
        };

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;
        let current = tracing::Span::current();
        current.record("duration_ms", duration_ms);
        match &result {
            Ok(_) => {
                current.record("outcome", "ok");
            }
            Err(err) => {
                current.record("outcome", err.code.as_str());
            }
        }

        result.map_err(GatewayError::Upstream)
    }
    .instrument(span)
    .await
}

/// Serializes `value` as the JSON response body.
///
/// # Errors
///
/// Returns [`GatewayError::Marshal`] if serialization fails.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Response, GatewayError> {
    let body = serde_json::to_vec(value)?;
    Ok((
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}
