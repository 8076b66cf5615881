use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::TypeError;

/// Identity of a validator in the committee, in `[1, N]`.
///
/// Doubles as the Shamir evaluation point of the party, which is why zero is
/// rejected everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartyId(u16);

impl PartyId {
    pub fn new(raw: u16) -> Result<Self, TypeError> {
        if raw == 0 {
            return Err(TypeError::ZeroPartyId);
        }
        Ok(Self(raw))
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for PartyId {
    type Error = TypeError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        PartyId::new(raw)
    }
}

impl Serialize for PartyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.0)
    }
}

impl<'de> Deserialize<'de> for PartyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u16::deserialize(deserializer)?;
        PartyId::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Immutable `(t, N)` threshold parameters, fixed at DKG time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub threshold: u16,
    pub total_parties: u16,
}

impl ThresholdParams {
    pub fn new(threshold: u16, total_parties: u16) -> Result<Self, TypeError> {
        if threshold < 2 || threshold > total_parties {
            return Err(TypeError::InvalidThreshold {
                threshold,
                total_parties,
            });
        }
        Ok(Self {
            threshold,
            total_parties,
        })
    }

    pub fn all_parties(&self) -> impl Iterator<Item = PartyId> + '_ {
        (1..=self.total_parties).map(PartyId)
    }

    pub fn contains(&self, party: PartyId) -> bool {
        party.as_u16() <= self.total_parties
    }
}

/// Sorted, deduplicated subset of the committee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSet(Vec<PartyId>);

impl ParticipantSet {
    pub fn from_list(raw: &[u16]) -> Result<Self, TypeError> {
        let mut parties = raw
            .iter()
            .map(|id| PartyId::new(*id))
            .collect::<Result<Vec<_>, _>>()?;
        parties.sort_unstable();
        parties.dedup();
        Ok(Self(parties))
    }

    pub fn to_list(&self) -> Vec<u16> {
        self.0.iter().map(PartyId::as_u16).collect()
    }

    pub fn contains(&self, party: PartyId) -> bool {
        self.0.binary_search(&party).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PartyId> + '_ {
        self.0.iter().copied()
    }

    /// Lowest party id of the set; the ceremony initiator.
    pub fn leader(&self) -> Option<PartyId> {
        self.0.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_party_id() {
        assert!(PartyId::new(0).is_err());
        assert!(ParticipantSet::from_list(&[0, 1, 2]).is_err());
    }

    #[test]
    fn threshold_bounds() {
        assert!(ThresholdParams::new(1, 5).is_err());
        assert!(ThresholdParams::new(6, 5).is_err());
        assert!(ThresholdParams::new(3, 5).is_ok());
        assert!(ThresholdParams::new(5, 5).is_ok());
    }

    #[test]
    fn participant_list_round_trip_is_identity_on_sorted_unique() {
        for list in [vec![1u16, 2, 3], vec![2, 4, 5], vec![1, 3, 4, 5]] {
            let set = ParticipantSet::from_list(&list).unwrap();
            assert_eq!(set.to_list(), list);
        }
    }

    #[test]
    fn participant_list_sorts_and_dedups() {
        let set = ParticipantSet::from_list(&[3, 1, 3, 2]).unwrap();
        assert_eq!(set.to_list(), vec![1, 2, 3]);
        assert_eq!(set.leader().unwrap().as_u16(), 1);
    }
}
