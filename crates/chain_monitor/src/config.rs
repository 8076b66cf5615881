use serde::{Deserialize, Serialize};
use url::Url;

fn default_confirmation_depth() -> u64 {
    12
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_batch_blocks() -> u64 {
    2_000
}

/// One watched chain. Confirmation depth is per chain: 12 for
/// Ethereum-family mainnets, 1 is acceptable for optimistic L2s when the
/// operator says so.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u32,
    pub name: String,
    pub rpc_url: Url,
    /// Address of the Signal contract, 0x-prefixed.
    pub signal_address: String,
    #[serde(default = "default_confirmation_depth")]
    pub confirmation_depth: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on the block span of one getLogs call.
    #[serde(default = "default_batch_blocks")]
    pub batch_blocks: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub chains: Vec<ChainConfig>,
    /// Capacity of the signal-id dedup ring.
    #[serde(default = "MonitorConfig::default_dedup_capacity")]
    pub dedup_capacity: usize,
}

impl MonitorConfig {
    pub fn default_dedup_capacity() -> usize {
        10_000
    }
}
