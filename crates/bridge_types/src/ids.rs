use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::TypeError;

/// How many bytes of the observed transaction hash are folded into a
/// request id.
pub const TX_HASH_PREFIX_LEN: usize = 8;

/// 32-byte digest assigned by the source chain; primary key of a signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub [u8; 32]);

impl SignalId {
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = raw.try_into().map_err(|v: Vec<u8>| TypeError::BadLength {
            expected: 32,
            got: v.len(),
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalId({})", self)
    }
}

impl Serialize for SignalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for SignalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SignalId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of one signing ceremony: the signal id concatenated with a
/// prefix of the transaction hash it was observed in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub [u8; 32 + TX_HASH_PREFIX_LEN]);

impl RequestId {
    pub fn derive(signal_id: &SignalId, observed_tx_hash: &[u8; 32]) -> Self {
        let mut raw = [0u8; 32 + TX_HASH_PREFIX_LEN];
        raw[..32].copy_from_slice(signal_id.as_bytes());
        raw[32..].copy_from_slice(&observed_tx_hash[..TX_HASH_PREFIX_LEN]);
        Self(raw)
    }

    pub fn signal_id(&self) -> SignalId {
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&self.0[..32]);
        SignalId(raw)
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 40] = raw.try_into().map_err(|v: Vec<u8>| TypeError::BadLength {
            expected: 40,
            got: v.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RequestId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
