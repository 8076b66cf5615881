use std::collections::HashMap;
use std::path::{Path, PathBuf};

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, KeyInit, Nonce};
use async_trait::async_trait;
use k256::Scalar;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use bridge_types::RequestId;

use crate::errors::KeyStoreError;
use crate::traits::KeyStore;
use crate::types::{
    KeyId, KeyShareRecord, NonceCache, NoncePoint, PublicArtifacts, SecretShare, require_schnorr, schnorr_response,
};

/// AES-256-GCM with the 16-byte IV the on-disk layout carries.
type ShareCipher = AesGcm<Aes256, U16>;

const SALT_LEN: usize = 32;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const PBKDF2_ITERATIONS: u32 = 150_000;

const SHARE_SUFFIX: &str = ".share";
const ARTIFACTS_SUFFIX: &str = ".artifacts.json";

/// Encrypted-file backend.
///
/// One `<key_id>.share` file per key, laid out as
/// `salt(32) ∥ iv(16) ∥ tag(16) ∥ ciphertext`, keyed by
/// PBKDF2-HMAC-SHA256 over the operator passphrase. Public artifacts live in
/// a sibling `<key_id>.artifacts.json` for audit.
pub struct FileKeyStore {
    dir: PathBuf,
    passphrase: Zeroizing<String>,
    cache: Mutex<HashMap<KeyId, (SecretShare, PublicArtifacts)>>,
    nonces: NonceCache,
}

impl FileKeyStore {
    pub async fn open(dir: impl Into<PathBuf>, passphrase: impl Into<String>) -> Result<Self, KeyStoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("cannot create key dir: {e}")))?;
        warn!(dir = %dir.display(), "file key store selected; development only, use a remote backend in production");
        Ok(Self {
            dir,
            passphrase: Zeroizing::new(passphrase.into()),
            cache: Mutex::new(HashMap::new()),
            nonces: NonceCache::default(),
        })
    }

    fn share_path(&self, key_id: &KeyId) -> PathBuf {
        self.dir.join(format!("{key_id}{SHARE_SUFFIX}"))
    }

    fn artifacts_path(&self, key_id: &KeyId) -> PathBuf {
        self.dir.join(format!("{key_id}{ARTIFACTS_SUFFIX}"))
    }

    fn derive_key(&self, salt: &[u8]) -> Zeroizing<[u8; 32]> {
        let mut key = Zeroizing::new([0u8; 32]);
        pbkdf2_hmac::<Sha256>(self.passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, key.as_mut_slice());
        key
    }

    fn seal(&self, key_id: &KeyId, plaintext: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let key = self.derive_key(&salt);
        let cipher = ShareCipher::new_from_slice(key.as_ref())
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("cipher init: {e}")))?;
        let sealed = cipher
            .encrypt(
                Nonce::<U16>::from_slice(&iv),
                Payload {
                    msg: plaintext,
                    aad: key_id.0.as_bytes(),
                },
            )
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("encrypt: {e}")))?;

        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        let mut out = Vec::with_capacity(SALT_LEN + IV_LEN + TAG_LEN + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&iv);
        out.extend_from_slice(tag);
        out.extend_from_slice(ciphertext);
        Ok(out)
    }

    fn unseal(&self, key_id: &KeyId, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, KeyStoreError> {
        if blob.len() <= SALT_LEN + IV_LEN + TAG_LEN {
            return Err(KeyStoreError::Corrupted(format!(
                "share file too short: {} bytes",
                blob.len()
            )));
        }
        let (salt, rest) = blob.split_at(SALT_LEN);
        let (iv, rest) = rest.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let key = self.derive_key(salt);
        let cipher = ShareCipher::new_from_slice(key.as_ref())
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("cipher init: {e}")))?;

        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let plaintext = cipher
            .decrypt(
                Nonce::<U16>::from_slice(iv),
                Payload {
                    msg: &sealed,
                    aad: key_id.0.as_bytes(),
                },
            )
            .map_err(|_| KeyStoreError::Corrupted("authentication failed, wrong passphrase or tampered file".into()))?;
        Ok(Zeroizing::new(plaintext))
    }

    async fn load(&self, key_id: &KeyId) -> Result<(SecretShare, PublicArtifacts), KeyStoreError> {
        if let Some(entry) = self.cache.lock().await.get(key_id) {
            return Ok(entry.clone());
        }

        let share_path = self.share_path(key_id);
        let blob = match tokio::fs::read(&share_path).await {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeyStoreError::KeyNotFound(key_id.clone()));
            }
            Err(e) => return Err(KeyStoreError::BackendUnavailable(format!("read share: {e}"))),
        };
        let plaintext = self.unseal(key_id, &blob)?;
        let raw: [u8; 32] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| KeyStoreError::Corrupted(format!("share plaintext has {} bytes", plaintext.len())))?;
        let secret = SecretShare::from_bytes(raw);

        let artifacts_raw = tokio::fs::read(self.artifacts_path(key_id))
            .await
            .map_err(|e| KeyStoreError::Corrupted(format!("missing artifacts for {key_id}: {e}")))?;
        let artifacts: PublicArtifacts =
            serde_json::from_slice(&artifacts_raw).map_err(|e| KeyStoreError::Corrupted(format!("artifacts: {e}")))?;

        let entry = (secret, artifacts);
        self.cache.lock().await.insert(key_id.clone(), entry.clone());
        Ok(entry)
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), KeyStoreError> {
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }
}

fn validate_key_id(key_id: &KeyId) -> Result<(), KeyStoreError> {
    if key_id.0.is_empty()
        || !key_id
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(KeyStoreError::InvalidMaterial(format!(
            "key id {key_id:?} is not a valid file name"
        )));
    }
    Ok(())
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn put(&self, key_id: &KeyId, record: KeyShareRecord, overwrite: bool) -> Result<(), KeyStoreError> {
        validate_key_id(key_id)?;
        let share_path = self.share_path(key_id);
        if !overwrite && tokio::fs::try_exists(&share_path).await.unwrap_or(false) {
            return Err(KeyStoreError::AlreadyExists(key_id.clone()));
        }

        let sealed = self.seal(key_id, record.secret_share.expose_bytes())?;
        let artifacts = record.public_artifacts();
        let artifacts_json = serde_json::to_vec_pretty(&artifacts)
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("serialize artifacts: {e}")))?;

        Self::write_atomic(&share_path, &sealed).await?;
        Self::write_atomic(&self.artifacts_path(key_id), &artifacts_json).await?;

        self.cache
            .lock()
            .await
            .insert(key_id.clone(), (record.secret_share, artifacts));
        debug!(%key_id, "key share persisted");
        Ok(())
    }

    async fn public_artifacts(&self, key_id: &KeyId) -> Result<PublicArtifacts, KeyStoreError> {
        validate_key_id(key_id)?;
        let (_, artifacts) = self.load(key_id).await?;
        Ok(artifacts)
    }

    async fn nonce_commit(&self, key_id: &KeyId, request_id: &RequestId) -> Result<NoncePoint, KeyStoreError> {
        validate_key_id(key_id)?;
        let (_, artifacts) = self.load(key_id).await?;
        require_schnorr(key_id, &artifacts.metadata)?;
        Ok(self.nonces.commit(key_id, request_id).await)
    }

    async fn sign(
        &self,
        key_id: &KeyId,
        request_id: &RequestId,
        challenge: Scalar,
        lambda: Scalar,
    ) -> Result<Scalar, KeyStoreError> {
        validate_key_id(key_id)?;
        let (secret, artifacts) = self.load(key_id).await?;
        require_schnorr(key_id, &artifacts.metadata)?;
        let share = secret.scalar()?;
        let nonce = self.nonces.take(key_id, request_id).await?;
        Ok(schnorr_response(&share, &nonce, &challenge, &lambda))
    }

    async fn list(&self) -> Result<Vec<KeyId>, KeyStoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("read dir: {e}")))?;
        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("read dir: {e}")))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stem) = name.strip_suffix(SHARE_SUFFIX) {
                    keys.push(KeyId(stem.to_string()));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key_id: &KeyId) -> Result<(), KeyStoreError> {
        validate_key_id(key_id)?;
        let share_path = self.share_path(key_id);
        match tokio::fs::remove_file(&share_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeyStoreError::KeyNotFound(key_id.clone()));
            }
            Err(e) => return Err(KeyStoreError::BackendUnavailable(format!("remove share: {e}"))),
        }
        let _ = tokio::fs::remove_file(self.artifacts_path(key_id)).await;
        self.cache.lock().await.remove(key_id);
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), KeyStoreError> {
        tokio::fs::metadata(&self.dir)
            .await
            .map_err(|e| KeyStoreError::BackendUnavailable(format!("key dir unavailable: {e}")))?;
        Ok(())
    }
}
