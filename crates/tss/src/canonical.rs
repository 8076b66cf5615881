//! The canonical bytes-to-sign. The destination contract reconstructs the
//! same digest; any drift here breaks the bridge, so the preimage layout is
//! locked down by tests.

use k256::{ProjectivePoint, Scalar};

use bridge_types::SignalEvent;

use crate::curve::{compress, scalar_from_digest, tagged_hash};

const MESSAGE_TAG: &str = "SignalBridge/msg";
const CHALLENGE_TAG: &str = "SignalBridge/challenge";

/// `H(signalId ∥ u32_be(src) ∥ u32_be(dst) ∥ u32_be(nonce) ∥ payload)`
/// under the scheme's tagged hash.
pub fn canonical_message(event: &SignalEvent) -> [u8; 32] {
    tagged_hash(MESSAGE_TAG, &[&event.signed_payload()])
}

/// Schnorr challenge `c = H_tag(R ∥ Y ∥ m)`.
pub fn challenge(group_nonce: &ProjectivePoint, group_key: &ProjectivePoint, message: &[u8; 32]) -> Scalar {
    let digest = tagged_hash(CHALLENGE_TAG, &[&compress(group_nonce), &compress(group_key), message]);
    scalar_from_digest(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_types::SignalId;

    fn event() -> SignalEvent {
        SignalEvent {
            chain_id: 1,
            signal_id: SignalId([0x01; 32]),
            src_chain_id: 1,
            dst_chain_id: 56,
            src_address: [0xaa; 20],
            dst_address: [0xbb; 20],
            nonce: 7,
            payload: vec![0xde, 0xad],
            observed_tx_hash: [0x02; 32],
            block_number: 10,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(canonical_message(&event()), canonical_message(&event()));
    }

    #[test]
    fn digest_ignores_observation_metadata() {
        // Only the signed preimage matters; where the log was observed must
        // not shift the digest.
        let mut other = event();
        other.block_number = 999;
        other.observed_tx_hash = [0x55; 32];
        assert_eq!(canonical_message(&event()), canonical_message(&other));
    }

    #[test]
    fn digest_covers_each_signed_field() {
        let base = canonical_message(&event());

        let mut changed = event();
        changed.nonce = 8;
        assert_ne!(base, canonical_message(&changed));

        let mut changed = event();
        changed.dst_chain_id = 57;
        assert_ne!(base, canonical_message(&changed));

        let mut changed = event();
        changed.payload = vec![0xde];
        assert_ne!(base, canonical_message(&changed));
    }
}
