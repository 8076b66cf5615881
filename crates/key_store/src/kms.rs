use async_trait::async_trait;
use k256::ProjectivePoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bridge_types::RequestId;
use global_utils::http_client::{HttpClient, HttpClientError};

use crate::errors::KeyStoreError;
use crate::sealed::{self, SealedShare};
use crate::traits::KeyStore;
use crate::types::{KeyId, KeyShareRecord, NoncePoint, PublicArtifacts};

/// Remote HSM/KMS backend: every operation is delegated to the custody
/// service. The share travels exactly once, at `put`, sealed to the
/// service's wrap key; it is never wire-plaintext even inside TLS.
pub struct RemoteKmsKeyStore {
    http: HttpClient,
    wrap_key: ProjectivePoint,
}

#[derive(Debug, Serialize)]
struct PutKeyRequest {
    sealed_share: SealedShare,
    artifacts: PublicArtifacts,
    overwrite: bool,
}

#[derive(Debug, Serialize)]
struct SignRequest {
    request_id: RequestId,
    challenge: String,
    lambda: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    partial: String,
}

#[derive(Debug, Serialize)]
struct NonceCommitRequest {
    request_id: RequestId,
}

#[derive(Debug, Deserialize)]
struct NonceCommitResponse {
    nonce_point: NoncePoint,
}

#[derive(Debug, Deserialize)]
struct ListKeysResponse {
    keys: Vec<KeyId>,
}

#[derive(Debug, Deserialize)]
struct EmptyResponse {}

impl RemoteKmsKeyStore {
    /// `wrap_key_hex` is the custody service's published compressed
    /// secp256k1 wrap key.
    pub fn new(http: HttpClient, wrap_key_hex: &str) -> Result<Self, KeyStoreError> {
        let wrap_key =
            sealed::recipient_from_hex(wrap_key_hex).map_err(|e| KeyStoreError::InvalidMaterial(e.to_string()))?;
        Ok(Self { http, wrap_key })
    }

    fn map_err(key_id: &KeyId, err: HttpClientError) -> KeyStoreError {
        match err.status() {
            Some(StatusCode::NOT_FOUND) => KeyStoreError::KeyNotFound(key_id.clone()),
            Some(StatusCode::CONFLICT) => KeyStoreError::AlreadyExists(key_id.clone()),
            Some(StatusCode::UNPROCESSABLE_ENTITY) => KeyStoreError::AlgorithmMismatch {
                key_id: key_id.clone(),
                stored: "remote".into(),
                requested: "schnorr_secp256k1".into(),
            },
            _ => KeyStoreError::BackendUnavailable(err.to_string()),
        }
    }
}

fn scalar_to_hex(scalar: &Scalar) -> String {
    hex::encode(scalar.to_bytes())
}

fn scalar_from_hex(raw: &str) -> Result<Scalar, KeyStoreError> {
    let bytes = hex::decode(raw).map_err(|e| KeyStoreError::Corrupted(format!("partial hex: {e}")))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| KeyStoreError::Corrupted(format!("partial has {} bytes", v.len())))?;
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(arr)))
        .ok_or_else(|| KeyStoreError::Corrupted("partial is not a canonical scalar".into()))
}

#[async_trait]
impl KeyStore for RemoteKmsKeyStore {
    #[instrument(level = "debug", skip(self, record))]
    async fn put(&self, key_id: &KeyId, record: KeyShareRecord, overwrite: bool) -> Result<(), KeyStoreError> {
        let sealed_share = sealed::seal(&self.wrap_key, record.secret_share.expose_bytes(), key_id.0.as_bytes())
            .map_err(|e| KeyStoreError::InvalidMaterial(e.to_string()))?;
        let body = PutKeyRequest {
            sealed_share,
            artifacts: record.public_artifacts(),
            overwrite,
        };
        let _: EmptyResponse = self
            .http
            .put(&format!("keys/{key_id}"), Some(&body), None)
            .await
            .map_err(|e| Self::map_err(key_id, e))?;
        Ok(())
    }

    async fn public_artifacts(&self, key_id: &KeyId) -> Result<PublicArtifacts, KeyStoreError> {
        self.http
            .get(&format!("keys/{key_id}/public"), None::<&()>, None)
            .await
            .map_err(|e| Self::map_err(key_id, e))
    }

    async fn nonce_commit(&self, key_id: &KeyId, request_id: &RequestId) -> Result<NoncePoint, KeyStoreError> {
        let body = NonceCommitRequest {
            request_id: *request_id,
        };
        let resp: NonceCommitResponse = self
            .http
            .post(&format!("keys/{key_id}/nonce-commit"), Some(&body), None)
            .await
            .map_err(|e| Self::map_err(key_id, e))?;
        Ok(resp.nonce_point)
    }

    async fn sign(
        &self,
        key_id: &KeyId,
        request_id: &RequestId,
        challenge: Scalar,
        lambda: Scalar,
    ) -> Result<Scalar, KeyStoreError> {
        let body = SignRequest {
            request_id: *request_id,
            challenge: scalar_to_hex(&challenge),
            lambda: scalar_to_hex(&lambda),
        };
        let resp: SignResponse = self
            .http
            .post(&format!("keys/{key_id}/sign"), Some(&body), None)
            .await
            .map_err(|e| Self::map_err(key_id, e))?;
        scalar_from_hex(&resp.partial)
    }

    async fn list(&self) -> Result<Vec<KeyId>, KeyStoreError> {
        let resp: ListKeysResponse = self
            .http
            .get("keys", None::<&()>, None)
            .await
            .map_err(|e| KeyStoreError::BackendUnavailable(e.to_string()))?;
        Ok(resp.keys)
    }

    async fn delete(&self, key_id: &KeyId) -> Result<(), KeyStoreError> {
        let _: EmptyResponse = self
            .http
            .delete(&format!("keys/{key_id}"), None)
            .await
            .map_err(|e| Self::map_err(key_id, e))?;
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), KeyStoreError> {
        let _: EmptyResponse = self
            .http
            .get("health", None::<&()>, None)
            .await
            .map_err(|e| KeyStoreError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }
}
