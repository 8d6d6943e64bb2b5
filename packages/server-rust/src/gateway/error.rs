//! Request-terminating gateway errors and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kvgw_core::TokenError;
use serde_json::json;
use tracing::{debug, warn};

use crate::rpc::{RpcCode, RpcError};

/// Every way a gateway request can fail. Each variant ends the request.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Isolation was requested but the bearer token could not be read.
    #[error("error parsing public payload of auth token: {0}")]
    AuthToken(#[from] TokenError),

    #[error("missing parameter {0}")]
    MissingParameter(&'static str),

    #[error("type mismatch, parameter: {param}, error: {reason}")]
    TypeMismatch { param: &'static str, reason: String },

    #[error(transparent)]
    Upstream(#[from] RpcError),

    #[error("failed to marshal response: {0}")]
    Marshal(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn type_mismatch(param: &'static str, reason: impl ToString) -> Self {
        Self::TypeMismatch {
            param,
            reason: reason.to_string(),
        }
    }

    /// RPC-style code reported in the error body.
    #[must_use]
    pub fn code(&self) -> RpcCode {
        match self {
            Self::AuthToken(_) => RpcCode::Unauthenticated,
            Self::MissingParameter(_) | Self::TypeMismatch { .. } => RpcCode::InvalidArgument,
            Self::Upstream(err) => err.code,
            Self::Marshal(_) => RpcCode::Internal,
        }
    }

    /// Upstream failures keep the status their own code maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.code().http_status()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            warn!(%code, %status, error = %message, "gateway request failed");
        } else {
            debug!(%code, %status, error = %message, "gateway request rejected");
        }

        let body = json!({
            "error": message,
            "code": code.as_i32(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
