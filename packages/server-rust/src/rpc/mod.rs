//! The key-value RPC service the gateway forwards to.
//!
//! Only the call surface lives here. Transport, serialization and storage
//! belong to whatever implements [`KvClient`].

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use axum::http::StatusCode;
use kvgw_core::{IScanOptions, Index, Item, ItemList, ItemsCount, Page, ScanOptions};
use tokio_util::sync::CancellationToken;

pub use memory::MemoryClient;

/// Per-call context handed to every [`KvClient`] method.
///
/// Cancelled when the inbound HTTP request goes away; implementations that
/// perform I/O should stop as soon as `cancel` fires.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub request_id: String,
    pub cancel: CancellationToken,
    pub deadline: Option<tokio::time::Instant>,
}

impl CallContext {
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }
}

/// Status codes reported by the RPC service (gRPC numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl RpcCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Cancelled => 1,
            Self::Unknown => 2,
            Self::InvalidArgument => 3,
            Self::DeadlineExceeded => 4,
            Self::NotFound => 5,
            Self::AlreadyExists => 6,
            Self::PermissionDenied => 7,
            Self::ResourceExhausted => 8,
            Self::FailedPrecondition => 9,
            Self::Aborted => 10,
            Self::OutOfRange => 11,
            Self::Unimplemented => 12,
            Self::Internal => 13,
            Self::Unavailable => 14,
            Self::DataLoss => 15,
            Self::Unauthenticated => 16,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "Canceled",
            Self::Unknown => "Unknown",
            Self::InvalidArgument => "InvalidArgument",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::PermissionDenied => "PermissionDenied",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::FailedPrecondition => "FailedPrecondition",
            Self::Aborted => "Aborted",
            Self::OutOfRange => "OutOfRange",
            Self::Unimplemented => "Unimplemented",
            Self::Internal => "Internal",
            Self::Unavailable => "Unavailable",
            Self::DataLoss => "DataLoss",
            Self::Unauthenticated => "Unauthenticated",
        }
    }

    /// HTTP status for this code. This is the only place the gateway turns
    /// RPC outcomes into transport statuses.
    #[must_use]
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::InvalidArgument | Self::FailedPrecondition | Self::OutOfRange => {
                StatusCode::BAD_REQUEST
            }
            Self::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists | Self::Aborted => StatusCode::CONFLICT,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            Self::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unknown | Self::Internal | Self::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the RPC service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: RpcCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(RpcCode::Cancelled, "context canceled")
    }

    #[must_use]
    pub fn deadline_exceeded() -> Self {
        Self::new(RpcCode::DeadlineExceeded, "context deadline exceeded")
    }
}

/// Client for the key-value RPC service.
///
/// All keys passed in and returned are physical keys; tenant prefixing is
/// applied by the gateway before calling and undone after.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Number of keys starting with `prefix`.
    async fn count(&self, ctx: &CallContext, prefix: &[u8]) -> Result<ItemsCount, RpcError>;

    /// One page of entries in insertion order. Page numbers start at 1.
    async fn iscan(&self, ctx: &CallContext, opts: IScanOptions) -> Result<Page, RpcError>;

    async fn get(&self, ctx: &CallContext, key: &[u8]) -> Result<Item, RpcError>;

    async fn set(&self, ctx: &CallContext, key: &[u8], value: &[u8]) -> Result<Index, RpcError>;

    /// Entries for every key that exists, in request order.
    async fn get_batch(&self, ctx: &CallContext, keys: &[Vec<u8>]) -> Result<ItemList, RpcError>;

    /// Entries in key order, filtered by prefix.
    async fn scan(&self, ctx: &CallContext, opts: &ScanOptions) -> Result<ItemList, RpcError>;
}
