//! Shared protocol data model for the bridge validator: party identities,
//! threshold parameters, signal ids and the chain event carried between the
//! monitor and the signing layer.

pub mod event;
pub mod hex_serde;
pub mod ids;
pub mod party;

pub use event::SignalEvent;
pub use ids::{RequestId, SignalId};
pub use party::{ParticipantSet, PartyId, ThresholdParams};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("party id must be in [1, {max}], got {got}")]
    PartyIdOutOfRange { got: u16, max: u16 },
    #[error("party id zero is reserved")]
    ZeroPartyId,
    #[error("invalid threshold parameters: t={threshold}, n={total_parties}")]
    InvalidThreshold { threshold: u16, total_parties: u16 },
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {got}")]
    BadLength { expected: usize, got: usize },
}
