use bridge_types::{PartyId, RequestId};
use thiserror::Error;
use uuid::Uuid;

use key_store::KeyStoreError;
use transport_bus::TransportError;

use crate::dkg::DkgRound;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid curve point: {0}")]
    InvalidPoint(String),
    #[error("invalid scalar: {0}")]
    InvalidScalar(String),
    #[error("share encryption failed: {0}")]
    Encryption(String),
    #[error("share decryption failed: {0}")]
    Decryption(String),
    #[error("duplicate evaluation point in participant set")]
    DuplicateEvaluationPoint,
}

#[derive(Debug, Error)]
pub enum DkgError {
    #[error("a key generation ceremony is already running")]
    AlreadyRunning,
    #[error("round {round:?} timed out, missing parties: {missing:?}")]
    Timeout { round: DkgRound, missing: Vec<PartyId> },
    #[error("party {party} sent {got} commitments, expected {expected}")]
    InvalidCommitmentCount {
        party: PartyId,
        expected: usize,
        got: usize,
    },
    #[error("proof of knowledge from party {party} rejected")]
    ProofRejected { party: PartyId },
    #[error("share from party {party} failed verification")]
    ShareRejected { party: PartyId },
    #[error("public key share announced by party {party} is inconsistent with its commitments")]
    InconsistentPublicShare { party: PartyId },
    #[error("ceremony {ceremony_id} aborted by party {by}: {reason}")]
    Aborted {
        ceremony_id: Uuid,
        by: PartyId,
        reason: String,
    },
    #[error("ceremony channel closed")]
    ChannelClosed,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("invalid ceremony parameters: {0}")]
    InvalidParameters(String),
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("no key share present, run key generation first")]
    NoKeyShare,
    #[error("request {request_id} timed out waiting for nonce exchange")]
    NonceExchangeTimeout { request_id: RequestId },
    #[error("nonce reveal from party {party} does not match its commitment")]
    NonceCommitmentMismatch { party: PartyId },
    #[error("partial signature from party {party} outside the participant set")]
    UnexpectedParticipant { party: PartyId },
    #[error("partial signature from party {party} failed verification")]
    InvalidPartial { party: PartyId },
    #[error("insufficient partial signatures: got {got}, need {need}")]
    InsufficientPartials { got: usize, need: usize },
    #[error("aggregated signature failed verification against the group key")]
    AggregationInvalid,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
