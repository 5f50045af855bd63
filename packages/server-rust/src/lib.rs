//! `reqchain` server: per-request chain scope, Tower middleware, outbound
//! propagation, and log output carrying the active request id chain.

pub mod logging;
pub mod network;
pub mod propagate;
pub mod scope;
pub mod service;

pub use propagate::{attach_to_outgoing_request, inject_chain};
pub use scope::{
    bind_current, current_chain, current_chain_string, end_request, request_unit,
    sync_request_unit, CorrelationScope, RequestGuard, ScopeError,
};
pub use service::{ChainConfig, RequestChainLayer, RequestChainService};
