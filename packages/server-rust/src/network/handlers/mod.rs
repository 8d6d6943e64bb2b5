//! HTTP handler definitions for the gateway.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports every handler for building the router.

pub mod batch;
pub mod count;
pub mod health;
pub mod item;
pub mod iscan;
pub mod scan;

pub use batch::get_batch_handler;
pub use count::count_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use item::{get_handler, set_handler};
pub use iscan::iscan_handler;
pub use scan::scan_handler;

use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::rpc::KvClient;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Everything is behind `Arc` and never mutated after construction, so
/// concurrent requests share it without locking.
#[derive(Clone)]
pub struct AppState {
    /// Client for the key-value RPC service.
    pub client: Arc<dyn KvClient>,
    /// Health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
