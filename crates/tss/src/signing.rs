//! Partial-signature production, verification and aggregation for the
//! commit–reveal threshold Schnorr ceremony.

use k256::{ProjectivePoint, Scalar};

use bridge_types::{PartyId, RequestId};

use crate::canonical::challenge;
use crate::curve::{compress, point_from_bytes, tagged_hash};
use crate::errors::CryptoError;

const NONCE_COMMIT_TAG: &str = "SignalBridge/nonce-commit";

/// One party's contribution to a signing ceremony.
#[derive(Debug, Clone)]
pub struct PartialSig {
    pub party: PartyId,
    pub nonce_point: ProjectivePoint,
    pub response: Scalar,
}

/// Final 65-byte signature: compressed `R` followed by `z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedSignature {
    pub group_nonce: ProjectivePoint,
    pub response: Scalar,
}

impl AggregatedSignature {
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut raw = [0u8; 65];
        raw[..33].copy_from_slice(&compress(&self.group_nonce));
        raw[33..].copy_from_slice(&self.response.to_bytes());
        raw
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        if raw.len() != 65 {
            return Err(CryptoError::InvalidPoint(format!(
                "signature has {} bytes, expected 65",
                raw.len()
            )));
        }
        let group_nonce = point_from_bytes(&raw[..33])?;
        let mut scalar_bytes = [0u8; 32];
        scalar_bytes.copy_from_slice(&raw[33..]);
        let response = crate::curve::scalar_from_bytes32(&scalar_bytes)?;
        Ok(Self { group_nonce, response })
    }
}

/// Hash commitment to a nonce point, broadcast before any point is revealed.
pub fn nonce_commitment_hash(request_id: &RequestId, party: PartyId, nonce_point: &[u8; 33]) -> [u8; 32] {
    tagged_hash(
        NONCE_COMMIT_TAG,
        &[&request_id.0, &party.as_u16().to_be_bytes(), nonce_point],
    )
}

/// `z_j·G == R_j + c·λ_j·X_j`
pub fn verify_partial(
    partial: &PartialSig,
    challenge_scalar: &Scalar,
    lambda: &Scalar,
    public_share: &ProjectivePoint,
) -> bool {
    ProjectivePoint::GENERATOR * partial.response
        == partial.nonce_point + *public_share * (*challenge_scalar * *lambda)
}

/// `R = Σ R_j`, `z = Σ z_j` over the full participant set.
pub fn aggregate(partials: &[PartialSig]) -> AggregatedSignature {
    let group_nonce = partials
        .iter()
        .fold(ProjectivePoint::IDENTITY, |acc, p| acc + p.nonce_point);
    let response = partials.iter().fold(Scalar::ZERO, |acc, p| acc + p.response);
    AggregatedSignature { group_nonce, response }
}

/// Last line of defence before emission: `z·G == R + c·Y`.
pub fn verify_signature(group_key: &ProjectivePoint, message: &[u8; 32], signature: &AggregatedSignature) -> bool {
    let c = challenge(&signature.group_nonce, group_key, message);
    ProjectivePoint::GENERATOR * signature.response == signature.group_nonce + *group_key * c
}
