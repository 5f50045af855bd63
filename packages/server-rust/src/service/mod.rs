//! Request chain service layer.
//!
//! 1. **Configuration** (`config`): how inbound chains are extended
//! 2. **Middleware** (`middleware`): Tower layers that scope each request

pub mod config;
pub mod middleware;

pub use config::ChainConfig;
pub use middleware::{RequestChainLayer, RequestChainService};
