//! Demo server exposing the request chain over HTTP.
//!
//! Run two instances, pointing one at the other with `--upstream`, and call
//! `/relay` on the first to watch a chain grow across hops.

use std::time::Duration;

use clap::Parser;
use reqchain_server::logging::{self, LogFormat, LoggingConfig};
use reqchain_server::network::{NetworkConfig, NetworkModule};
use reqchain_server::ChainConfig;
use tracing::{info, warn};

/// Request id chain demo server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Bind address.
    #[arg(long, env = "REQCHAIN_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on; 0 picks a free one.
    #[arg(long, env = "REQCHAIN_PORT", default_value_t = 8080)]
    port: u16,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQCHAIN_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Base URL that `/relay` forwards to.
    #[arg(long, env = "REQCHAIN_UPSTREAM")]
    upstream: Option<String>,

    /// Keep at most this many ids per chain (newest kept).
    #[arg(long, env = "REQCHAIN_MAX_CHAIN_LEN")]
    max_chain_len: Option<usize>,

    /// Log filter directives.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_filter: String,

    /// Log output format.
    #[arg(long, env = "REQCHAIN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            upstream: self.upstream.clone(),
            chain: ChainConfig {
                max_chain_len: self.max_chain_len,
            },
        }
    }

    fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            filter: self.log_filter.clone(),
            format: self.log_format,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.logging_config())?;

    let mut module = NetworkModule::new(args.network_config());
    let port = module.start().await?;
    info!(port, upstream = ?args.upstream, "chain server starting");

    module.serve(shutdown_signal()).await
}

/// Resolves on ctrl-c.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; shutting down");
    }
    info!("shutdown signal received");
}
