use std::collections::BTreeMap;

use k256::ProjectivePoint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bridge_types::{PartyId, ThresholdParams};
use key_store::PublicArtifacts;

use crate::curve::{point_from_bytes, point_from_hex};
use crate::errors::CryptoError;
use crate::poly::expected_share_point;

/// Public DKG output in parsed form, loaded once after key generation and
/// immutable afterwards: the group key and every party's public share, both
/// derived from the recorded Feldman commitments.
#[derive(Debug, Clone)]
pub struct GroupArtifacts {
    pub params: ThresholdParams,
    pub group_key: ProjectivePoint,
    pub public_shares: BTreeMap<PartyId, ProjectivePoint>,
    pub participants: Vec<PartyId>,
}

impl GroupArtifacts {
    /// Rebuilds the parsed artifacts from a key-store record, cross-checking
    /// the stored group key against the commitment constant terms.
    pub fn from_public(artifacts: &PublicArtifacts) -> Result<Self, CryptoError> {
        let participants = artifacts
            .participants
            .iter()
            .map(|id| PartyId::new(*id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CryptoError::InvalidPoint(e.to_string()))?;

        let mut commitment_sets: BTreeMap<PartyId, Vec<ProjectivePoint>> = BTreeMap::new();
        for (dealer, commitments) in &artifacts.commitments {
            let dealer = PartyId::new(*dealer).map_err(|e| CryptoError::InvalidPoint(e.to_string()))?;
            let points = commitments
                .iter()
                .map(|raw| point_from_hex(raw))
                .collect::<Result<Vec<_>, _>>()?;
            commitment_sets.insert(dealer, points);
        }

        let threshold = commitment_sets
            .values()
            .next()
            .map(Vec::len)
            .ok_or_else(|| CryptoError::InvalidPoint("no commitment sets recorded".into()))?;
        if commitment_sets.values().any(|set| set.len() != threshold) {
            return Err(CryptoError::InvalidPoint("uneven commitment set lengths".into()));
        }
        let params = ThresholdParams::new(threshold as u16, participants.len() as u16)
            .map_err(|e| CryptoError::InvalidPoint(e.to_string()))?;

        let group_key = commitment_sets
            .values()
            .fold(ProjectivePoint::IDENTITY, |acc, set| acc + set[0]);
        let recorded = point_from_bytes(&artifacts.group_key)?;
        if group_key != recorded {
            return Err(CryptoError::InvalidPoint(
                "recorded group key disagrees with commitment constant terms".into(),
            ));
        }

        let mut public_shares = BTreeMap::new();
        for party in &participants {
            let share_point = commitment_sets
                .values()
                .fold(ProjectivePoint::IDENTITY, |acc, set| acc + expected_share_point(set, *party));
            public_shares.insert(*party, share_point);
        }

        Ok(Self {
            params,
            group_key,
            public_shares,
            participants,
        })
    }

    pub fn public_share(&self, party: PartyId) -> Option<&ProjectivePoint> {
        self.public_shares.get(&party)
    }
}

/// Operator-facing result of a completed key generation ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DkgSummary {
    pub ceremony_id: Uuid,
    pub group_key: String,
    pub public_key_share: String,
    pub participants: Vec<u16>,
}
