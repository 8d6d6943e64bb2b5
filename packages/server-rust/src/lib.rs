//! `kvgw` server: an HTTP/JSON gateway in front of a key-value RPC service,
//! with per-request tenant isolation of the keyspace.

pub mod gateway;
pub mod network;
pub mod rpc;

pub use gateway::{GatewayError, TenantScope};
pub use network::{build_router, AppState, NetworkConfig, NetworkModule};
pub use rpc::{CallContext, KvClient, MemoryClient, RpcCode, RpcError};

#[cfg(test)]
pub(crate) mod testutil;
