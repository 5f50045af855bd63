//! HTTP handler definitions for the chain server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod chain;
pub mod health;

pub use chain::{chain_handler, relay_handler, ChainReport, RelayError};
pub use health::{health_handler, liveness_handler};

use std::sync::Arc;
use std::time::Instant;

use super::NetworkConfig;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references and a pooled HTTP client, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Network configuration (bind address, upstream, chain settings).
    pub config: Arc<NetworkConfig>,
    /// Client for calls to the upstream service.
    pub client: reqwest::Client,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates the state for a server using `config`.
    ///
    /// The upstream client bypasses system proxies: upstreams are peer
    /// services addressed directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: NetworkConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            config: Arc::new(config),
            client: reqwest::Client::builder().no_proxy().build()?,
            start_time: Instant::now(),
        })
    }
}
