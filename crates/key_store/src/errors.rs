use thiserror::Error;

use crate::types::KeyId;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("key not found: {0}")]
    KeyNotFound(KeyId),
    #[error("key already exists: {0}")]
    AlreadyExists(KeyId),
    #[error("algorithm mismatch for key {key_id}: stored {stored}, requested {requested}")]
    AlgorithmMismatch {
        key_id: KeyId,
        stored: String,
        requested: String,
    },
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("stored key material is corrupted: {0}")]
    Corrupted(String),
    #[error("no pending nonce for key {key_id}, request {request_id}")]
    NonceMissing { key_id: KeyId, request_id: String },
    #[error("invalid key material: {0}")]
    InvalidMaterial(String),
}

impl KeyStoreError {
    /// None of the store failures are locally retryable; callers propagate.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
