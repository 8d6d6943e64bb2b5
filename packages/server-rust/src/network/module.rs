//! Network module with deferred startup lifecycle.
//!
//! `new()` wires shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    count_handler, get_batch_handler, get_handler, health_handler, iscan_handler,
    liveness_handler, readiness_handler, scan_handler, set_handler, AppState,
};
use super::middleware::with_http_layers;
use super::shutdown::ShutdownController;
use crate::rpc::KvClient;

/// Builds the gateway router for `state`, middleware included.
///
/// Routes:
/// - `GET  /health`, `/health/live`, `/health/ready`
/// - `GET  /v1/immurestproxy/item/count/{prefix}`
/// - `POST /v1/immurestproxy/item/iscan`
/// - `POST /v1/immurestproxy/item/scan`
/// - `GET  /v1/immurestproxy/item/{key}`
/// - `POST /v1/immurestproxy/item`
/// - `POST /v1/immurestproxy/batch/get`
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    let routes = Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/v1/immurestproxy/item/count/{prefix}", get(count_handler))
        .route("/v1/immurestproxy/item/iscan", post(iscan_handler))
        .route("/v1/immurestproxy/item/scan", post(scan_handler))
        .route("/v1/immurestproxy/item/{key}", get(get_handler))
        .route("/v1/immurestproxy/item", post(set_handler))
        .route("/v1/immurestproxy/batch/get", post(get_batch_handler));

    with_http_layers(routes, &config).with_state(state)
}

/// Owns the HTTP server lifecycle.
///
/// The RPC client and shutdown controller are created before the listener
/// is bound and shared with every request through [`AppState`].
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    client: Arc<dyn KvClient>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    #[must_use]
    pub fn new(config: NetworkConfig, client: Arc<dyn KvClient>) -> Self {
        Self {
            config,
            listener: None,
            client,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    fn app_state(&self) -> AppState {
        AppState {
            client: Arc::clone(&self.client),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        }
    }

    pub fn build_router(&self) -> Router {
        build_router(self.app_state())
    }

    /// Binds the TCP listener and returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves or the shutdown controller
    /// is triggered, then drains in-flight requests for up to `drain_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called or the server fails.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        let mut triggered = self.shutdown.shutdown_receiver();
        let stop = async move {
            tokio::select! {
                () = shutdown => {}
                _ = triggered.wait_for(|stopping| *stopping) => {}
            }
        };

        self.shutdown.set_ready();
        info!("Serving HTTP gateway");

        axum::serve(listener, router)
            .with_graceful_shutdown(stop)
            .await?;

        self.shutdown.trigger_shutdown();
        if self.shutdown.wait_for_drain(self.config.drain_timeout).await {
            info!("All in-flight requests drained");
        } else {
            warn!(
                in_flight = self.shutdown.in_flight_count(),
                "Drain timeout expired with requests still in flight"
            );
        }
        Ok(())
    }
}
