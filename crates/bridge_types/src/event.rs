use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{RequestId, SignalId, hex_serde};

/// A confirmed `SignalSent` observation, deduplicated by `signal_id`.
///
/// Two observations of the same signal must be byte-identical; the monitor
/// compares [`SignalEvent::canonical_digest`] to enforce that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    /// Chain the log was observed on.
    pub chain_id: u32,
    pub signal_id: SignalId,
    pub src_chain_id: u32,
    pub dst_chain_id: u32,
    #[serde(with = "hex_serde")]
    pub src_address: [u8; 20],
    #[serde(with = "hex_serde")]
    pub dst_address: [u8; 20],
    pub nonce: u32,
    #[serde(with = "hex_serde::vec")]
    pub payload: Vec<u8>,
    #[serde(with = "hex_serde")]
    pub observed_tx_hash: [u8; 32],
    pub block_number: u64,
    pub timestamp: u64,
}

impl SignalEvent {
    pub fn request_id(&self) -> RequestId {
        RequestId::derive(&self.signal_id, &self.observed_tx_hash)
    }

    /// The canonical bytes-to-sign preimage:
    /// `signalId ∥ u32_be(srcChainId) ∥ u32_be(dstChainId) ∥ u32_be(nonce) ∥ payload`.
    pub fn signed_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 4 + 4 + 4 + self.payload.len());
        out.extend_from_slice(self.signal_id.as_bytes());
        out.extend_from_slice(&self.src_chain_id.to_be_bytes());
        out.extend_from_slice(&self.dst_chain_id.to_be_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Digest over every field, used to detect a signal id being replayed
    /// with different content.
    pub fn canonical_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.chain_id.to_be_bytes());
        hasher.update(self.signal_id.as_bytes());
        hasher.update(self.src_chain_id.to_be_bytes());
        hasher.update(self.dst_chain_id.to_be_bytes());
        hasher.update(self.src_address);
        hasher.update(self.dst_address);
        hasher.update(self.nonce.to_be_bytes());
        hasher.update((self.payload.len() as u64).to_be_bytes());
        hasher.update(&self.payload);
        hasher.update(self.observed_tx_hash);
        hasher.update(self.block_number.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.finalize().into()
    }
}
