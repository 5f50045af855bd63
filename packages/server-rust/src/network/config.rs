//! Network configuration types for the demo chain server.

use std::time::Duration;

use crate::service::ChainConfig;

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// Base URL of the service `/relay` forwards to, e.g. `http://10.0.0.2:8080`.
    pub upstream: Option<String>,
    /// Request chain handling.
    pub chain: ChainConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            request_timeout: Duration::from_secs(30),
            upstream: None,
            chain: ChainConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.upstream.is_none());
        assert!(config.chain.max_chain_len.is_none());
    }
}
