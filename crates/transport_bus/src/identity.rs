use std::collections::BTreeMap;

use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

use bridge_types::PartyId;

use crate::errors::TransportError;

/// This party's transport identity: a long-lived secp256k1 keypair used for
/// envelope signatures and for encrypting DKG shares to this party.
#[derive(Clone)]
pub struct PartyIdentity {
    signing_key: SigningKey,
}

impl PartyIdentity {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_hex(raw: &str) -> Result<Self, TransportError> {
        let bytes = hex::decode(raw.trim()).map_err(|e| TransportError::InvalidIdentity(e.to_string()))?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|e| TransportError::InvalidIdentity(e.to_string()))?;
        Ok(Self { signing_key })
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key.verifying_key()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().to_encoded_point(true).as_bytes())
    }

    /// The identity secret as a curve scalar, for ECDH share decryption.
    pub fn dh_scalar(&self) -> k256::Scalar {
        *self.signing_key.as_nonzero_scalar().as_ref()
    }
}

impl std::fmt::Debug for PartyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PartyIdentity({})", self.public_key_hex())
    }
}

/// Registered identity keys of the whole committee.
#[derive(Debug, Clone, Default)]
pub struct PeerDirectory {
    keys: BTreeMap<PartyId, VerifyingKey>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, party: PartyId, key: VerifyingKey) {
        self.keys.insert(party, key);
    }

    pub fn insert_hex(&mut self, party: PartyId, raw: &str) -> Result<(), TransportError> {
        let bytes = hex::decode(raw.trim()).map_err(|e| TransportError::InvalidIdentity(e.to_string()))?;
        let key =
            VerifyingKey::from_sec1_bytes(&bytes).map_err(|e| TransportError::InvalidIdentity(e.to_string()))?;
        self.insert(party, key);
        Ok(())
    }

    pub fn get(&self, party: PartyId) -> Option<&VerifyingKey> {
        self.keys.get(&party)
    }

    /// The identity public key as a curve point, for ECDH share encryption.
    pub fn dh_point(&self, party: PartyId) -> Option<k256::ProjectivePoint> {
        self.keys.get(&party).map(|k| k256::ProjectivePoint::from(*k.as_affine()))
    }

    pub fn parties(&self) -> impl Iterator<Item = PartyId> + '_ {
        self.keys.keys().copied()
    }
}
