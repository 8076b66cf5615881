use std::collections::BTreeMap;

use async_trait::async_trait;
use k256::Scalar;
use tokio::sync::Mutex;

use bridge_types::RequestId;

use crate::errors::KeyStoreError;
use crate::traits::KeyStore;
use crate::types::{KeyId, KeyShareRecord, NonceCache, NoncePoint, PublicArtifacts, require_schnorr, schnorr_response};

/// In-memory backend for tests and local simulation.
#[derive(Default)]
pub struct MemoryKeyStore {
    records: Mutex<BTreeMap<KeyId, KeyShareRecord>>,
    nonces: NonceCache,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn put(&self, key_id: &KeyId, record: KeyShareRecord, overwrite: bool) -> Result<(), KeyStoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(key_id) && !overwrite {
            return Err(KeyStoreError::AlreadyExists(key_id.clone()));
        }
        records.insert(key_id.clone(), record);
        Ok(())
    }

    async fn public_artifacts(&self, key_id: &KeyId) -> Result<PublicArtifacts, KeyStoreError> {
        self.records
            .lock()
            .await
            .get(key_id)
            .map(KeyShareRecord::public_artifacts)
            .ok_or_else(|| KeyStoreError::KeyNotFound(key_id.clone()))
    }

    async fn nonce_commit(&self, key_id: &KeyId, request_id: &RequestId) -> Result<NoncePoint, KeyStoreError> {
        let records = self.records.lock().await;
        let record = records
            .get(key_id)
            .ok_or_else(|| KeyStoreError::KeyNotFound(key_id.clone()))?;
        require_schnorr(key_id, &record.metadata)?;
        drop(records);
        Ok(self.nonces.commit(key_id, request_id).await)
    }

    async fn sign(
        &self,
        key_id: &KeyId,
        request_id: &RequestId,
        challenge: Scalar,
        lambda: Scalar,
    ) -> Result<Scalar, KeyStoreError> {
        let records = self.records.lock().await;
        let record = records
            .get(key_id)
            .ok_or_else(|| KeyStoreError::KeyNotFound(key_id.clone()))?;
        require_schnorr(key_id, &record.metadata)?;
        let share = record.secret_share.scalar()?;
        drop(records);

        let nonce = self.nonces.take(key_id, request_id).await?;
        Ok(schnorr_response(&share, &nonce, &challenge, &lambda))
    }

    async fn list(&self) -> Result<Vec<KeyId>, KeyStoreError> {
        Ok(self.records.lock().await.keys().cloned().collect())
    }

    async fn delete(&self, key_id: &KeyId) -> Result<(), KeyStoreError> {
        self.records
            .lock()
            .await
            .remove(key_id)
            .map(|_| ())
            .ok_or_else(|| KeyStoreError::KeyNotFound(key_id.clone()))
    }

    async fn healthcheck(&self) -> Result<(), KeyStoreError> {
        Ok(())
    }
}
