use bridge_types::PartyId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unknown peer: {0}")]
    UnknownPeer(PartyId),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("delivery to {to} failed: {reason}")]
    Delivery { to: PartyId, reason: String },
    #[error("envelope authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("inbound channel closed")]
    ChannelClosed,
    #[error("invalid identity key: {0}")]
    InvalidIdentity(String),
}
