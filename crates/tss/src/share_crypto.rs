//! Encryption of DKG shares to a recipient's transport identity.
//!
//! Reuses the key store's sealed-share envelope (ephemeral ECDH,
//! HKDF-SHA256, AES-256-GCM). The ceremony context doubles as associated
//! data so a share cannot be replayed between ceremonies or recipients.

use k256::{ProjectivePoint, Scalar};
use zeroize::Zeroizing;

use key_store::sealed::{self, SealedShare};
use transport_bus::EncryptedShare;

use crate::curve::{scalar_from_hex, scalar_to_hex};
use crate::errors::CryptoError;

pub fn encrypt_share(
    recipient_point: &ProjectivePoint,
    share: &Scalar,
    context: &[u8],
) -> Result<EncryptedShare, CryptoError> {
    let plaintext = Zeroizing::new(scalar_to_hex(share));
    let sealed = sealed::seal(recipient_point, plaintext.as_bytes(), context)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(EncryptedShare {
        ephemeral_point: sealed.ephemeral_point,
        iv: sealed.iv,
        ciphertext: sealed.ciphertext,
    })
}

pub fn decrypt_share(
    identity_secret: &Scalar,
    encrypted: &EncryptedShare,
    context: &[u8],
) -> Result<Scalar, CryptoError> {
    let sealed = SealedShare {
        ephemeral_point: encrypted.ephemeral_point.clone(),
        iv: encrypted.iv.clone(),
        ciphertext: encrypted.ciphertext.clone(),
    };
    let plaintext = sealed::open(identity_secret, &sealed, context)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    let as_str = std::str::from_utf8(&plaintext).map_err(|e| CryptoError::Decryption(e.to_string()))?;
    scalar_from_hex(as_str)
}

/// Context a share is bound to: ceremony, dealer, recipient.
pub fn share_context(ceremony_id: &uuid::Uuid, from: bridge_types::PartyId, to: bridge_types::PartyId) -> Vec<u8> {
    let mut context = Vec::with_capacity(16 + 2 + 2);
    context.extend_from_slice(ceremony_id.as_bytes());
    context.extend_from_slice(&from.as_u16().to_be_bytes());
    context.extend_from_slice(&to.as_u16().to_be_bytes());
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::random_nonzero_scalar;
    use bridge_types::PartyId;
    use uuid::Uuid;

    #[test]
    fn share_round_trips_between_identities() {
        let identity = random_nonzero_scalar();
        let identity_point = ProjectivePoint::GENERATOR * identity;
        let share = random_nonzero_scalar();
        let context = share_context(&Uuid::new_v4(), PartyId::new(1).unwrap(), PartyId::new(2).unwrap());

        let encrypted = encrypt_share(&identity_point, &share, &context).unwrap();
        let decrypted = decrypt_share(&identity, &encrypted, &context).unwrap();
        assert_eq!(decrypted, share);
    }

    #[test]
    fn wrong_identity_cannot_decrypt() {
        let identity = random_nonzero_scalar();
        let identity_point = ProjectivePoint::GENERATOR * identity;
        let share = random_nonzero_scalar();
        let context = share_context(&Uuid::new_v4(), PartyId::new(1).unwrap(), PartyId::new(2).unwrap());

        let encrypted = encrypt_share(&identity_point, &share, &context).unwrap();
        let other = random_nonzero_scalar();
        assert!(decrypt_share(&other, &encrypted, &context).is_err());
    }

    #[test]
    fn context_mismatch_fails_authentication() {
        let identity = random_nonzero_scalar();
        let identity_point = ProjectivePoint::GENERATOR * identity;
        let share = random_nonzero_scalar();
        let ceremony = Uuid::new_v4();
        let context = share_context(&ceremony, PartyId::new(1).unwrap(), PartyId::new(2).unwrap());
        let other_context = share_context(&ceremony, PartyId::new(1).unwrap(), PartyId::new(3).unwrap());

        let encrypted = encrypt_share(&identity_point, &share, &context).unwrap();
        assert!(decrypt_share(&identity, &encrypted, &other_context).is_err());
    }
}
