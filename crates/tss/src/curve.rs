//! Hex and hash plumbing for secp256k1 points and scalars.

use k256::elliptic_curve::bigint::U256;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::{Field, PrimeField};
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::errors::CryptoError;

pub fn compress(point: &ProjectivePoint) -> [u8; 33] {
    let mut raw = [0u8; 33];
    raw.copy_from_slice(point.to_affine().to_encoded_point(true).as_bytes());
    raw
}

pub fn point_to_hex(point: &ProjectivePoint) -> String {
    hex::encode(compress(point))
}

pub fn point_from_bytes(raw: &[u8]) -> Result<ProjectivePoint, CryptoError> {
    let encoded = EncodedPoint::from_bytes(raw).map_err(|e| CryptoError::InvalidPoint(e.to_string()))?;
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or_else(|| CryptoError::InvalidPoint("not on curve".into()))?;
    Ok(ProjectivePoint::from(affine))
}

pub fn point_from_hex(raw: &str) -> Result<ProjectivePoint, CryptoError> {
    let bytes = hex::decode(raw.trim()).map_err(|e| CryptoError::InvalidPoint(e.to_string()))?;
    point_from_bytes(&bytes)
}

pub fn scalar_to_hex(scalar: &Scalar) -> String {
    hex::encode(scalar.to_bytes())
}

/// Parses a canonical scalar; non-canonical encodings are rejected rather
/// than silently reduced.
pub fn scalar_from_hex(raw: &str) -> Result<Scalar, CryptoError> {
    let bytes = hex::decode(raw.trim()).map_err(|e| CryptoError::InvalidScalar(e.to_string()))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::InvalidScalar(format!("expected 32 bytes, got {}", v.len())))?;
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(arr)))
        .ok_or_else(|| CryptoError::InvalidScalar("non-canonical scalar encoding".into()))
}

/// Parses a canonical 32-byte scalar encoding.
pub fn scalar_from_bytes32(raw: &[u8; 32]) -> Result<Scalar, CryptoError> {
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*raw)))
        .ok_or_else(|| CryptoError::InvalidScalar("non-canonical scalar encoding".into()))
}

pub fn random_nonzero_scalar() -> Scalar {
    loop {
        let scalar = Scalar::random(&mut OsRng);
        if !bool::from(scalar.is_zero()) {
            return scalar;
        }
    }
}

/// BIP-340-style tagged hash: `SHA256(SHA256(tag) ∥ SHA256(tag) ∥ data…)`.
pub fn tagged_hash(tag: &str, chunks: &[&[u8]]) -> [u8; 32] {
    let tag_digest = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_digest);
    hasher.update(tag_digest);
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

/// Hash-to-scalar by wide-enough reduction of a 32-byte digest.
pub fn scalar_from_digest(digest: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*digest))
}
