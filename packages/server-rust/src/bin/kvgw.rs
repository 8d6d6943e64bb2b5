//! `kvgw` -- HTTP/JSON gateway with per-tenant key isolation.
//!
//! Runs against the in-memory key-value service. Configuration comes from
//! flags or the matching `KVGW_*` environment variables.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use kvgw_server::{MemoryClient, NetworkConfig, NetworkModule};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "kvgw", version, about = "HTTP/JSON gateway for a key-value RPC service")]
struct Args {
    /// Address to bind.
    #[arg(long, env = "KVGW_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 picks a free port).
    #[arg(long, env = "KVGW_PORT", default_value_t = 3323)]
    port: u16,

    /// End-to-end HTTP request timeout, in seconds.
    #[arg(long, env = "KVGW_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Deadline for each RPC call, in milliseconds (0 disables it).
    #[arg(long, env = "KVGW_RPC_TIMEOUT_MS", default_value_t = 10_000)]
    rpc_timeout_ms: u64,

    /// Allowed CORS origins, comma separated.
    #[arg(long, env = "KVGW_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "KVGW_MAX_BODY_BYTES", default_value_t = 4 * 1024 * 1024)]
    max_body_bytes: usize,

    #[arg(long, env = "KVGW_LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,
}

impl Args {
    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            rpc_timeout: (self.rpc_timeout_ms > 0)
                .then(|| Duration::from_millis(self.rpc_timeout_ms)),
            max_body_bytes: self.max_body_bytes,
            ..NetworkConfig::default()
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Plain => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.network_config();
    info!(?config, "Starting kvgw");

    let mut module = NetworkModule::new(config, Arc::new(MemoryClient::new()));
    module.start().await?;
    module.serve(shutdown_signal()).await
}
