use std::collections::BTreeMap;
use std::path::PathBuf;

use k256::elliptic_curve::Field;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{ProjectivePoint, Scalar};
use rand::rngs::OsRng;

use bridge_types::{RequestId, SignalId};
use key_store::{
    FileKeyStore, KeyId, KeyMetadata, KeyShareRecord, KeyStore, KeyStoreError, KeyUsage, SignatureAlgorithm,
};

fn scratch_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("keystore-{label}-{}", uuid::Uuid::new_v4()))
}

fn sample_record(algorithm: SignatureAlgorithm) -> (Scalar, KeyShareRecord) {
    let share = Scalar::random(&mut OsRng);
    let public = (ProjectivePoint::GENERATOR * share).to_affine();
    let mut public_share = [0u8; 33];
    public_share.copy_from_slice(public.to_encoded_point(true).as_bytes());

    let record = KeyShareRecord {
        metadata: KeyMetadata {
            algorithm,
            created_at_ms: 1_700_000_000_000,
            usages: vec![KeyUsage::ThresholdSign],
        },
        secret_share: key_store::SecretShare::from_scalar(&share),
        public_share,
        group_key: public_share,
        commitments: BTreeMap::new(),
        participants: vec![1, 2, 3, 4, 5],
    };
    (share, record)
}

fn sample_request() -> RequestId {
    RequestId::derive(&SignalId([7u8; 32]), &[9u8; 32])
}

#[tokio::test]
async fn share_round_trips_through_disk() -> anyhow::Result<()> {
    let dir = scratch_dir("roundtrip");
    let key_id = KeyId::from("bridge-group");
    let (share, record) = sample_record(SignatureAlgorithm::SchnorrSecp256k1);

    {
        let store = FileKeyStore::open(&dir, "correct horse battery").await?;
        store.put(&key_id, record, false).await?;
    }

    // A fresh store instance must decrypt what the first one wrote.
    let store = FileKeyStore::open(&dir, "correct horse battery").await?;
    let artifacts = store.public_artifacts(&key_id).await?;
    assert_eq!(artifacts.participants, vec![1, 2, 3, 4, 5]);

    // The share only surfaces through the signing relation:
    // z·G == R + (c·λ)·(s·G).
    let request = sample_request();
    let challenge = Scalar::from(42u64);
    let lambda = Scalar::from(5u64);
    let nonce_point = store.nonce_commit(&key_id, &request).await?;
    let z = store.sign(&key_id, &request, challenge, lambda).await?;

    let r_point = {
        use k256::elliptic_curve::sec1::FromEncodedPoint;
        let encoded = k256::EncodedPoint::from_bytes(nonce_point.0).unwrap();
        let affine = Option::<k256::AffinePoint>::from(k256::AffinePoint::from_encoded_point(&encoded)).unwrap();
        ProjectivePoint::from(affine)
    };
    let expected = r_point + (ProjectivePoint::GENERATOR * share) * (challenge * lambda);
    assert_eq!(ProjectivePoint::GENERATOR * z, expected);

    tokio::fs::remove_dir_all(&dir).await.ok();
    Ok(())
}

#[tokio::test]
async fn wrong_passphrase_is_rejected() -> anyhow::Result<()> {
    let dir = scratch_dir("badpass");
    let key_id = KeyId::from("bridge-group");
    let (_, record) = sample_record(SignatureAlgorithm::SchnorrSecp256k1);

    {
        let store = FileKeyStore::open(&dir, "right").await?;
        store.put(&key_id, record, false).await?;
    }

    let store = FileKeyStore::open(&dir, "wrong").await?;
    match store.public_artifacts(&key_id).await {
        Err(KeyStoreError::Corrupted(_)) => {}
        other => panic!("expected Corrupted, got {other:?}"),
    }

    tokio::fs::remove_dir_all(&dir).await.ok();
    Ok(())
}

#[tokio::test]
async fn second_put_requires_overwrite() -> anyhow::Result<()> {
    let dir = scratch_dir("overwrite");
    let key_id = KeyId::from("bridge-group");
    let store = FileKeyStore::open(&dir, "pass").await?;

    let (_, first) = sample_record(SignatureAlgorithm::SchnorrSecp256k1);
    let (_, second) = sample_record(SignatureAlgorithm::SchnorrSecp256k1);
    store.put(&key_id, first, false).await?;

    match store.put(&key_id, second.clone(), false).await {
        Err(KeyStoreError::AlreadyExists(_)) => {}
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
    store.put(&key_id, second, true).await?;

    tokio::fs::remove_dir_all(&dir).await.ok();
    Ok(())
}

#[tokio::test]
async fn ecdsa_key_refuses_schnorr_signing() -> anyhow::Result<()> {
    let dir = scratch_dir("algo");
    let key_id = KeyId::from("ecdsa-key");
    let store = FileKeyStore::open(&dir, "pass").await?;

    let (_, record) = sample_record(SignatureAlgorithm::EcdsaSecp256k1);
    store.put(&key_id, record, false).await?;

    match store.nonce_commit(&key_id, &sample_request()).await {
        Err(KeyStoreError::AlgorithmMismatch { .. }) => {}
        other => panic!("expected AlgorithmMismatch, got {other:?}"),
    }

    tokio::fs::remove_dir_all(&dir).await.ok();
    Ok(())
}

#[tokio::test]
async fn sign_without_commit_fails() -> anyhow::Result<()> {
    let dir = scratch_dir("nononce");
    let key_id = KeyId::from("bridge-group");
    let store = FileKeyStore::open(&dir, "pass").await?;
    let (_, record) = sample_record(SignatureAlgorithm::SchnorrSecp256k1);
    store.put(&key_id, record, false).await?;

    match store.sign(&key_id, &sample_request(), Scalar::ONE, Scalar::ONE).await {
        Err(KeyStoreError::NonceMissing { .. }) => {}
        other => panic!("expected NonceMissing, got {other:?}"),
    }

    tokio::fs::remove_dir_all(&dir).await.ok();
    Ok(())
}

#[tokio::test]
async fn missing_key_is_key_not_found() -> anyhow::Result<()> {
    let dir = scratch_dir("missing");
    let store = FileKeyStore::open(&dir, "pass").await?;

    match store.public_artifacts(&KeyId::from("nope")).await {
        Err(KeyStoreError::KeyNotFound(_)) => {}
        other => panic!("expected KeyNotFound, got {other:?}"),
    }

    tokio::fs::remove_dir_all(&dir).await.ok();
    Ok(())
}

#[test]
fn debug_output_redacts_share_bytes() {
    let (share, record) = sample_record(SignatureAlgorithm::SchnorrSecp256k1);
    let rendered = format!("{record:?}");
    assert!(rendered.contains("<redacted>"));
    assert!(!rendered.contains(&hex::encode(share.to_bytes())));
}
