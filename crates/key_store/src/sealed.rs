//! Envelope encryption of share material to a recipient's secp256k1 key:
//! ephemeral ECDH, HKDF-SHA256 bound to the caller's context, AES-256-GCM.
//!
//! Used by the remote custody backend to wrap the share before it travels,
//! and by the key-generation layer to encrypt dealt shares to their
//! recipients. The associated data binds a sealed blob to its context so it
//! cannot be replayed elsewhere.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use k256::elliptic_curve::Field;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

const KDF_INFO: &str = "SignalBridge/sealed-share";

#[derive(Debug, Error)]
pub enum SealError {
    #[error("invalid recipient key: {0}")]
    InvalidRecipient(String),
    #[error("sealing failed: {0}")]
    Seal(String),
    #[error("opening failed: {0}")]
    Open(String),
}

/// A share encrypted to one recipient. All fields hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedShare {
    pub ephemeral_point: String,
    pub iv: String,
    pub ciphertext: String,
}

/// Parses a compressed recipient public key.
pub fn recipient_from_hex(raw: &str) -> Result<ProjectivePoint, SealError> {
    let bytes = hex::decode(raw.trim()).map_err(|e| SealError::InvalidRecipient(e.to_string()))?;
    let encoded = EncodedPoint::from_bytes(&bytes).map_err(|e| SealError::InvalidRecipient(e.to_string()))?;
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or_else(|| SealError::InvalidRecipient("not a curve point".into()))?;
    Ok(ProjectivePoint::from(affine))
}

fn derive_key(shared_point: &ProjectivePoint, aad: &[u8]) -> Result<Zeroizing<[u8; 32]>, SealError> {
    let encoded = shared_point.to_affine().to_encoded_point(false);
    let x = encoded
        .x()
        .ok_or_else(|| SealError::Seal("shared point at infinity".into()))?;

    let hkdf = Hkdf::<Sha256>::new(Some(aad), x.as_slice());
    let mut key = Zeroizing::new([0u8; 32]);
    hkdf.expand(KDF_INFO.as_bytes(), key.as_mut_slice())
        .map_err(|e| SealError::Seal(e.to_string()))?;
    Ok(key)
}

fn random_nonzero_scalar() -> Scalar {
    loop {
        let scalar = Scalar::random(&mut OsRng);
        if !bool::from(scalar.is_zero()) {
            return scalar;
        }
    }
}

pub fn seal(recipient: &ProjectivePoint, plaintext: &[u8], aad: &[u8]) -> Result<SealedShare, SealError> {
    let ephemeral = random_nonzero_scalar();
    let ephemeral_point = ProjectivePoint::GENERATOR * ephemeral;
    let key = derive_key(&(*recipient * ephemeral), aad)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_ref()).map_err(|e| SealError::Seal(e.to_string()))?;
    let mut iv = [0u8; 12];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
        .map_err(|e| SealError::Seal(e.to_string()))?;

    let mut ephemeral_bytes = [0u8; 33];
    ephemeral_bytes.copy_from_slice(ephemeral_point.to_affine().to_encoded_point(true).as_bytes());
    Ok(SealedShare {
        ephemeral_point: hex::encode(ephemeral_bytes),
        iv: hex::encode(iv),
        ciphertext: hex::encode(ciphertext),
    })
}

pub fn open(identity_secret: &Scalar, sealed: &SealedShare, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, SealError> {
    let ephemeral_point = recipient_from_hex(&sealed.ephemeral_point).map_err(|e| SealError::Open(e.to_string()))?;
    let key = derive_key(&(ephemeral_point * identity_secret), aad)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_ref()).map_err(|e| SealError::Open(e.to_string()))?;
    let iv = hex::decode(&sealed.iv).map_err(|e| SealError::Open(e.to_string()))?;
    if iv.len() != 12 {
        return Err(SealError::Open(format!("iv has {} bytes", iv.len())));
    }
    let ciphertext = hex::decode(&sealed.ciphertext).map_err(|e| SealError::Open(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(&iv), Payload { msg: &ciphertext, aad })
        .map(Zeroizing::new)
        .map_err(|_| SealError::Open("authentication failed".into()))
}
