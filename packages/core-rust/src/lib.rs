//! `reqchain` core: request ids, request id chains, and the header wire format.
//!
//! Everything here is pure: no I/O, no async, no global state.

pub mod chain;
pub mod id;

pub use chain::{ChainParseError, RequestIdChain};
pub use id::{IdSource, RandomIdSource, RequestId};

/// HTTP header carrying request ids, both inbound and outbound.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Name of the logging field holding the serialized active chain.
///
/// `tracing` field names are identifiers fixed at the macro call site, so the
/// server's per-request span spells this out literally; keep the two equal.
pub const LOG_FIELD: &str = "requestIdChain";

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
