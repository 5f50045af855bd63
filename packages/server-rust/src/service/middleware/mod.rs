//! Tower middleware layers for request correlation.
//!
//! - [`request_chain`]: Per-request chain scope, log span and response header

pub mod request_chain;

pub use request_chain::{RequestChainLayer, RequestChainService};
