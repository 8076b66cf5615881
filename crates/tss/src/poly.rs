//! Shamir polynomials and Feldman commitments over secp256k1.

use k256::{ProjectivePoint, Scalar};

use bridge_types::PartyId;

use crate::curve::random_nonzero_scalar;
use crate::errors::CryptoError;

/// A dealer's secret polynomial of degree `t-1`; the constant term is the
/// dealer's contribution to the group secret.
pub struct SecretPolynomial {
    coefficients: Vec<Scalar>,
}

impl SecretPolynomial {
    pub fn random(threshold: u16) -> Self {
        let coefficients = (0..threshold).map(|_| random_nonzero_scalar()).collect();
        Self { coefficients }
    }

    pub fn constant_term(&self) -> &Scalar {
        &self.coefficients[0]
    }

    /// `f(x)` by Horner's rule. `x` is a party id, never zero.
    pub fn evaluate(&self, x: PartyId) -> Scalar {
        let x = Scalar::from(u64::from(x.as_u16()));
        let mut acc = Scalar::ZERO;
        for coefficient in self.coefficients.iter().rev() {
            acc = acc * x + coefficient;
        }
        acc
    }

    /// Feldman commitments `C_k = a_k·G`.
    pub fn commitments(&self) -> Vec<ProjectivePoint> {
        self.coefficients
            .iter()
            .map(|a| ProjectivePoint::GENERATOR * a)
            .collect()
    }
}

/// `Σ x^k·C_k`, the public image of `f(x)` reconstructed from commitments.
pub fn expected_share_point(commitments: &[ProjectivePoint], x: PartyId) -> ProjectivePoint {
    let x = Scalar::from(u64::from(x.as_u16()));
    let mut x_power = Scalar::ONE;
    let mut acc = ProjectivePoint::IDENTITY;
    for commitment in commitments {
        acc += *commitment * x_power;
        x_power *= x;
    }
    acc
}

/// Feldman check: does `share·G` match the dealer's commitments at `x`?
pub fn verify_share(share: &Scalar, x: PartyId, commitments: &[ProjectivePoint]) -> bool {
    ProjectivePoint::GENERATOR * share == expected_share_point(commitments, x)
}

/// Lagrange coefficient `λ_i` at zero for the given participant set:
/// `Π_{j≠i} x_j / (x_j − x_i)`.
pub fn lagrange_at_zero(participants: &[PartyId], party: PartyId) -> Result<Scalar, CryptoError> {
    let x_i = Scalar::from(u64::from(party.as_u16()));
    let mut numerator = Scalar::ONE;
    let mut denominator = Scalar::ONE;

    for other in participants {
        if *other == party {
            continue;
        }
        let x_j = Scalar::from(u64::from(other.as_u16()));
        numerator *= x_j;
        denominator *= x_j - x_i;
    }

    let inverse = Option::<Scalar>::from(denominator.invert()).ok_or(CryptoError::DuplicateEvaluationPoint)?;
    Ok(numerator * inverse)
}
