use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bridge_types::{PartyId, RequestId, SignalId};

/// Context lane used by messages that belong to no ceremony or request.
pub const CONTROL_CONTEXT: &str = "control";

/// A share scalar encrypted to the recipient's transport identity:
/// ephemeral ECDH, HKDF-SHA256, AES-256-GCM. All fields hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedShare {
    pub ephemeral_point: String,
    pub iv: String,
    pub ciphertext: String,
}

/// Schnorr proof of knowledge of a committed secret, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokProof {
    pub nonce_point: String,
    pub response: String,
}

/// Every message exchanged between validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WirePayload {
    #[serde(rename = "VALIDATOR_REGISTER")]
    ValidatorRegister { validator_id: PartyId, timestamp: u64 },
    #[serde(rename = "HEARTBEAT")]
    Heartbeat {
        uptime_secs: u64,
        active_chains: Vec<u32>,
        pending: usize,
        has_key_share: bool,
    },
    #[serde(rename = "DKG_START")]
    DkgStart {
        ceremony_id: Uuid,
        threshold: u16,
        total_parties: u16,
    },
    #[serde(rename = "DKG_COMMITMENT")]
    DkgCommitment {
        ceremony_id: Uuid,
        party_id: PartyId,
        commitments: Vec<String>,
        proof: PokProof,
    },
    #[serde(rename = "DKG_SHARE")]
    DkgShare {
        ceremony_id: Uuid,
        from_party: PartyId,
        to_party: PartyId,
        encrypted_share: EncryptedShare,
    },
    #[serde(rename = "DKG_COMPLAINT")]
    DkgComplaint {
        ceremony_id: Uuid,
        from_party: PartyId,
        against_party: PartyId,
        reason: String,
    },
    #[serde(rename = "DKG_PUBLIC_KEY_SHARE")]
    DkgPublicKeyShare {
        ceremony_id: Uuid,
        party_id: PartyId,
        public_key_share: String,
    },
    #[serde(rename = "SIGNAL_EVENT")]
    SignalEventSeen {
        signal_id: SignalId,
        src_chain_id: u32,
        dst_chain_id: u32,
        tx_hash: String,
        request_id: RequestId,
    },
    #[serde(rename = "SIGNING_REQUEST")]
    SigningRequest {
        request_id: RequestId,
        message: String,
        participants: Vec<u16>,
    },
    #[serde(rename = "SIGNING_NONCE_COMMITMENT")]
    NonceCommitment {
        request_id: RequestId,
        party_id: PartyId,
        commitment: String,
    },
    #[serde(rename = "SIGNING_NONCE_REVEAL")]
    NonceReveal {
        request_id: RequestId,
        party_id: PartyId,
        nonce_point: String,
    },
    #[serde(rename = "PARTIAL_SIGNATURE")]
    PartialSignature {
        request_id: RequestId,
        party_id: PartyId,
        nonce_point: String,
        partial: String,
        public_key_share: String,
    },
    #[serde(rename = "SIGNATURE_COMPLETE")]
    SignatureComplete {
        request_id: RequestId,
        signature: String,
        participants: Vec<u16>,
    },
}

impl WirePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            WirePayload::ValidatorRegister { .. } => "VALIDATOR_REGISTER",
            WirePayload::Heartbeat { .. } => "HEARTBEAT",
            WirePayload::DkgStart { .. } => "DKG_START",
            WirePayload::DkgCommitment { .. } => "DKG_COMMITMENT",
            WirePayload::DkgShare { .. } => "DKG_SHARE",
            WirePayload::DkgComplaint { .. } => "DKG_COMPLAINT",
            WirePayload::DkgPublicKeyShare { .. } => "DKG_PUBLIC_KEY_SHARE",
            WirePayload::SignalEventSeen { .. } => "SIGNAL_EVENT",
            WirePayload::SigningRequest { .. } => "SIGNING_REQUEST",
            WirePayload::NonceCommitment { .. } => "SIGNING_NONCE_COMMITMENT",
            WirePayload::NonceReveal { .. } => "SIGNING_NONCE_REVEAL",
            WirePayload::PartialSignature { .. } => "PARTIAL_SIGNATURE",
            WirePayload::SignatureComplete { .. } => "SIGNATURE_COMPLETE",
        }
    }

    /// The FIFO lane this payload travels on: its ceremony id, its request
    /// id, or the shared control lane.
    pub fn context(&self) -> String {
        match self {
            WirePayload::ValidatorRegister { .. } | WirePayload::Heartbeat { .. } => CONTROL_CONTEXT.to_string(),
            WirePayload::DkgStart { ceremony_id, .. }
            | WirePayload::DkgCommitment { ceremony_id, .. }
            | WirePayload::DkgShare { ceremony_id, .. }
            | WirePayload::DkgComplaint { ceremony_id, .. }
            | WirePayload::DkgPublicKeyShare { ceremony_id, .. } => ceremony_id.to_string(),
            WirePayload::SignalEventSeen { request_id, .. }
            | WirePayload::SigningRequest { request_id, .. }
            | WirePayload::NonceCommitment { request_id, .. }
            | WirePayload::NonceReveal { request_id, .. }
            | WirePayload::PartialSignature { request_id, .. }
            | WirePayload::SignatureComplete { request_id, .. } => request_id.to_string(),
        }
    }

    pub fn ceremony_id(&self) -> Option<Uuid> {
        match self {
            WirePayload::DkgStart { ceremony_id, .. }
            | WirePayload::DkgCommitment { ceremony_id, .. }
            | WirePayload::DkgShare { ceremony_id, .. }
            | WirePayload::DkgComplaint { ceremony_id, .. }
            | WirePayload::DkgPublicKeyShare { ceremony_id, .. } => Some(*ceremony_id),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            WirePayload::SignalEventSeen { request_id, .. }
            | WirePayload::SigningRequest { request_id, .. }
            | WirePayload::NonceCommitment { request_id, .. }
            | WirePayload::NonceReveal { request_id, .. }
            | WirePayload::PartialSignature { request_id, .. }
            | WirePayload::SignatureComplete { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }
}

/// Delivery envelope: sender, FIFO lane, sequence within the lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub sender: PartyId,
    pub context: String,
    pub sequence: u64,
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub payload: WirePayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_spec_type_tags() {
        let payload = WirePayload::DkgStart {
            ceremony_id: Uuid::nil(),
            threshold: 3,
            total_parties: 5,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "DKG_START");
        assert_eq!(json["payload"]["threshold"], 3);
    }

    #[test]
    fn message_round_trips() {
        let msg = WireMessage {
            sender: PartyId::new(2).unwrap(),
            context: CONTROL_CONTEXT.to_string(),
            sequence: 9,
            timestamp_ms: 1,
            payload: WirePayload::Heartbeat {
                uptime_secs: 5,
                active_chains: vec![1, 56],
                pending: 0,
                has_key_share: true,
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: WireMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
