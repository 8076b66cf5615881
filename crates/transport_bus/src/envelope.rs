use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::errors::TransportError;
use crate::messages::WireMessage;

/// Authenticated wrapper around a wire message: an ECDSA/secp256k1 signature
/// over the canonical JSON serialization, verified against the sender's
/// registered identity key before the message enters the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub message: WireMessage,
    pub signature: String,
}

impl SignedEnvelope {
    pub fn seal(key: &SigningKey, message: WireMessage) -> Result<Self, TransportError> {
        let bytes = serde_json::to_vec(&message).map_err(|e| TransportError::Serialization(e.to_string()))?;
        let signature: Signature = key.sign(&bytes);
        Ok(Self {
            message,
            signature: hex::encode(signature.to_bytes()),
        })
    }

    pub fn verify(&self, key: &VerifyingKey) -> Result<(), TransportError> {
        let bytes =
            serde_json::to_vec(&self.message).map_err(|e| TransportError::Serialization(e.to_string()))?;
        let raw = hex::decode(&self.signature)
            .map_err(|e| TransportError::AuthenticationFailed(format!("signature hex: {e}")))?;
        let signature = Signature::from_slice(&raw)
            .map_err(|e| TransportError::AuthenticationFailed(format!("signature bytes: {e}")))?;
        key.verify(&bytes, &signature)
            .map_err(|_| TransportError::AuthenticationFailed("signature does not verify".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PartyIdentity;
    use crate::messages::{CONTROL_CONTEXT, WirePayload};
    use bridge_types::PartyId;

    fn sample_message(sender: u16) -> WireMessage {
        WireMessage {
            sender: PartyId::new(sender).unwrap(),
            context: CONTROL_CONTEXT.to_string(),
            sequence: 0,
            timestamp_ms: 12,
            payload: WirePayload::ValidatorRegister {
                validator_id: PartyId::new(sender).unwrap(),
                timestamp: 12,
            },
        }
    }

    #[test]
    fn sealed_envelope_verifies() {
        let identity = PartyIdentity::generate();
        let envelope = SignedEnvelope::seal(identity.signing_key(), sample_message(1)).unwrap();
        envelope.verify(&identity.verifying_key()).unwrap();
    }

    #[test]
    fn foreign_key_is_rejected() {
        let identity = PartyIdentity::generate();
        let other = PartyIdentity::generate();
        let envelope = SignedEnvelope::seal(identity.signing_key(), sample_message(1)).unwrap();
        assert!(envelope.verify(&other.verifying_key()).is_err());
    }

    #[test]
    fn tampered_message_is_rejected() {
        let identity = PartyIdentity::generate();
        let mut envelope = SignedEnvelope::seal(identity.signing_key(), sample_message(1)).unwrap();
        envelope.message.sequence = 7;
        assert!(envelope.verify(&identity.verifying_key()).is_err());
    }
}
