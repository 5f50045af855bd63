/// Configuration for request chain handling.
///
/// Controls how inbound chains are extended before they are activated.
#[derive(Debug, Clone, Default)]
pub struct ChainConfig {
    /// Maximum number of ids kept in a chain, newest first. `None` keeps the
    /// whole inbound chain. The current request's id is always kept.
    pub max_chain_len: Option<usize>,
}
