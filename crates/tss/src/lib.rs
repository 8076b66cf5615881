//! The TSS coordination core: Feldman/Pedersen distributed key generation,
//! commit–reveal threshold Schnorr signing, and the node-side routing that
//! drives both over the transport bus.

pub mod canonical;
pub mod coordinator;
pub mod curve;
pub mod dkg;
pub mod errors;
pub mod metrics;
pub mod node;
pub mod poly;
pub mod proof;
pub mod share_crypto;
pub mod signing;
pub mod types;

pub use coordinator::{CoordinatorEvent, SigningCoordinator};
pub use dkg::{DkgEngine, DkgOutcome};
pub use errors::{CryptoError, DkgError, SigningError};
pub use metrics::NodeMetrics;
pub use node::{NodeConfig, TssNode};
pub use types::{DkgSummary, GroupArtifacts};
