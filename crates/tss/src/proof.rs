//! Schnorr proof of knowledge of a Feldman constant term.
//!
//! Binds the ceremony id and dealer id into the Fiat–Shamir challenge so a
//! proof cannot be replayed into another ceremony or claimed by another
//! party.

use k256::{ProjectivePoint, Scalar};
use uuid::Uuid;

use bridge_types::PartyId;
use transport_bus::PokProof;

use crate::curve::{
    compress, point_from_hex, point_to_hex, random_nonzero_scalar, scalar_from_digest, scalar_from_hex,
    scalar_to_hex, tagged_hash,
};
use crate::errors::CryptoError;

const POK_TAG: &str = "SignalBridge/dkg-pok";

#[derive(Debug, Clone)]
pub struct ProofOfKnowledge {
    pub nonce_point: ProjectivePoint,
    pub response: Scalar,
}

fn challenge(
    ceremony_id: &Uuid,
    party: PartyId,
    commitment0: &ProjectivePoint,
    nonce_point: &ProjectivePoint,
) -> Scalar {
    let digest = tagged_hash(
        POK_TAG,
        &[
            ceremony_id.as_bytes(),
            &party.as_u16().to_be_bytes(),
            &compress(commitment0),
            &compress(nonce_point),
        ],
    );
    scalar_from_digest(&digest)
}

/// Proves knowledge of `secret` where `commitment0 = secret·G`.
pub fn prove_constant_term(
    ceremony_id: &Uuid,
    party: PartyId,
    secret: &Scalar,
    commitment0: &ProjectivePoint,
) -> ProofOfKnowledge {
    let k = random_nonzero_scalar();
    let nonce_point = ProjectivePoint::GENERATOR * k;
    let c = challenge(ceremony_id, party, commitment0, &nonce_point);
    ProofOfKnowledge {
        nonce_point,
        response: k + c * secret,
    }
}

/// `z·G == R + c·C₀`
pub fn verify_constant_term(
    ceremony_id: &Uuid,
    party: PartyId,
    commitment0: &ProjectivePoint,
    proof: &ProofOfKnowledge,
) -> bool {
    let c = challenge(ceremony_id, party, commitment0, &proof.nonce_point);
    ProjectivePoint::GENERATOR * proof.response == proof.nonce_point + *commitment0 * c
}

impl ProofOfKnowledge {
    pub fn to_wire(&self) -> PokProof {
        PokProof {
            nonce_point: point_to_hex(&self.nonce_point),
            response: scalar_to_hex(&self.response),
        }
    }

    pub fn from_wire(raw: &PokProof) -> Result<Self, CryptoError> {
        Ok(Self {
            nonce_point: point_from_hex(&raw.nonce_point)?,
            response: scalar_from_hex(&raw.response)?,
        })
    }
}
