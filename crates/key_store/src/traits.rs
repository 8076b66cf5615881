use async_trait::async_trait;
use k256::Scalar;

use bridge_types::RequestId;

use crate::errors::KeyStoreError;
use crate::types::{KeyId, KeyShareRecord, NoncePoint, PublicArtifacts};

/// Oracle over this party's long-lived key share.
///
/// Injected as `Arc<dyn KeyStore>` at construction so tests can substitute
/// the memory backend.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Writes a key record atomically. Fails with `AlreadyExists` unless
    /// `overwrite` is set.
    async fn put(&self, key_id: &KeyId, record: KeyShareRecord, overwrite: bool) -> Result<(), KeyStoreError>;

    /// Public side of a stored key: share point, group key, commitments,
    /// participants, metadata.
    async fn public_artifacts(&self, key_id: &KeyId) -> Result<PublicArtifacts, KeyStoreError>;

    /// Reserves a fresh secret nonce for `request_id` and returns `R = r·G`.
    /// A repeated commit for the same request replaces the pending nonce.
    async fn nonce_commit(&self, key_id: &KeyId, request_id: &RequestId) -> Result<NoncePoint, KeyStoreError>;

    /// Consumes the pending nonce and produces the Schnorr response
    /// `z = r + challenge·lambda·s_i`. The share itself stays inside the
    /// store.
    async fn sign(
        &self,
        key_id: &KeyId,
        request_id: &RequestId,
        challenge: Scalar,
        lambda: Scalar,
    ) -> Result<Scalar, KeyStoreError>;

    async fn list(&self) -> Result<Vec<KeyId>, KeyStoreError>;

    async fn delete(&self, key_id: &KeyId) -> Result<(), KeyStoreError>;

    async fn healthcheck(&self) -> Result<(), KeyStoreError>;
}
