use std::collections::{BTreeMap, HashMap};
use std::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::{Field, PrimeField};
use k256::{FieldBytes, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use bridge_types::{RequestId, hex_serde};

use crate::errors::KeyStoreError;

/// Name a key share is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId(pub String);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for KeyId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureAlgorithm {
    SchnorrSecp256k1,
    EcdsaSecp256k1,
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::SchnorrSecp256k1 => write!(f, "schnorr_secp256k1"),
            SignatureAlgorithm::EcdsaSecp256k1 => write!(f, "ecdsa_secp256k1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    ThresholdSign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub algorithm: SignatureAlgorithm,
    pub created_at_ms: u64,
    pub usages: Vec<KeyUsage>,
}

/// The secret scalar of this party. Never serialized, never printed.
pub struct SecretShare(Zeroizing<[u8; 32]>);

impl SecretShare {
    pub fn from_scalar(scalar: &Scalar) -> Self {
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&scalar.to_bytes());
        Self(Zeroizing::new(raw))
    }

    pub fn from_bytes(raw: [u8; 32]) -> Self {
        Self(Zeroizing::new(raw))
    }

    pub fn scalar(&self) -> Result<Scalar, KeyStoreError> {
        Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*self.0)))
            .filter(|s| !bool::from(s.is_zero()))
            .ok_or_else(|| KeyStoreError::InvalidMaterial("share is not a valid non-zero scalar".into()))
    }

    /// Raw bytes, for encrypting at rest or shipping to a remote custodian.
    pub fn expose_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Clone for SecretShare {
    fn clone(&self) -> Self {
        Self(Zeroizing::new(*self.0))
    }
}

impl fmt::Debug for SecretShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretShare(<redacted>)")
    }
}

/// Compressed nonce point `R = r·G` returned by a nonce commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoncePoint(#[serde(with = "hex_serde")] pub [u8; 33]);

/// Everything public that the DKG produced, kept for audit and for partial
/// verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicArtifacts {
    pub metadata: KeyMetadata,
    #[serde(with = "hex_serde")]
    pub public_share: [u8; 33],
    #[serde(with = "hex_serde")]
    pub group_key: [u8; 33],
    /// Feldman commitment sets, dealer party id -> compressed points.
    pub commitments: BTreeMap<u16, Vec<String>>,
    pub participants: Vec<u16>,
}

/// A full key record as written at the end of a DKG ceremony.
#[derive(Debug, Clone)]
pub struct KeyShareRecord {
    pub metadata: KeyMetadata,
    pub secret_share: SecretShare,
    pub public_share: [u8; 33],
    pub group_key: [u8; 33],
    pub commitments: BTreeMap<u16, Vec<String>>,
    pub participants: Vec<u16>,
}

impl KeyShareRecord {
    pub fn public_artifacts(&self) -> PublicArtifacts {
        PublicArtifacts {
            metadata: self.metadata.clone(),
            public_share: self.public_share,
            group_key: self.group_key,
            commitments: self.commitments.clone(),
            participants: self.participants.clone(),
        }
    }
}

/// Pending signing nonces, keyed by `(key, request)`. Consumed exactly once.
#[derive(Default)]
pub(crate) struct NonceCache {
    pending: Mutex<HashMap<(KeyId, RequestId), Zeroizing<[u8; 32]>>>,
}

impl NonceCache {
    /// Samples a fresh nonce for the request, replacing any pending one, and
    /// returns its public point.
    pub(crate) async fn commit(&self, key_id: &KeyId, request_id: &RequestId) -> NoncePoint {
        let nonce = Scalar::random(&mut OsRng);
        let point = (ProjectivePoint::GENERATOR * nonce).to_affine();
        let mut raw = [0u8; 33];
        raw.copy_from_slice(point.to_encoded_point(true).as_bytes());

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&nonce.to_bytes());
        self.pending
            .lock()
            .await
            .insert((key_id.clone(), *request_id), Zeroizing::new(bytes));
        NoncePoint(raw)
    }

    pub(crate) async fn take(&self, key_id: &KeyId, request_id: &RequestId) -> Result<Scalar, KeyStoreError> {
        let bytes = self
            .pending
            .lock()
            .await
            .remove(&(key_id.clone(), *request_id))
            .ok_or_else(|| KeyStoreError::NonceMissing {
                key_id: key_id.clone(),
                request_id: request_id.to_string(),
            })?;
        Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*bytes)))
            .ok_or_else(|| KeyStoreError::Corrupted("pending nonce is not a valid scalar".into()))
    }
}

/// `z = r + c·λ·s mod q`, the Schnorr response for one partial signature.
pub(crate) fn schnorr_response(share: &Scalar, nonce: &Scalar, challenge: &Scalar, lambda: &Scalar) -> Scalar {
    *nonce + *challenge * *lambda * *share
}

/// Rejects signing requests against a key whose metadata names a different
/// scheme.
pub(crate) fn require_schnorr(key_id: &KeyId, metadata: &KeyMetadata) -> Result<(), KeyStoreError> {
    if metadata.algorithm != SignatureAlgorithm::SchnorrSecp256k1 {
        return Err(KeyStoreError::AlgorithmMismatch {
            key_id: key_id.clone(),
            stored: metadata.algorithm.to_string(),
            requested: SignatureAlgorithm::SchnorrSecp256k1.to_string(),
        });
    }
    Ok(())
}
