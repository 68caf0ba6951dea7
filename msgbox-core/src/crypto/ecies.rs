use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{EncodedPoint, PublicKey, SecretKey};
use sha2::{Digest, Sha256};

use super::aes_gcm::{aes256_gcm_decrypt, aes256_gcm_encrypt};
use super::envelope::EciesEnvelope;
use super::{CryptoError, Result};
use crate::constants::{ECIES_CURVE, IV_LEN, PRIVATE_KEY_LEN};
use crate::keys::KeyFamily;
use crate::traits::random::SecureRandom;

/// Attempts at drawing a valid scalar before giving up.
const KEYGEN_ATTEMPTS: usize = 8;

/// Generate a secp256k1 secret key from the provided SecureRandom source.
pub fn generate_secret_key(rng: &dyn SecureRandom) -> Result<SecretKey> {
    for _ in 0..KEYGEN_ATTEMPTS {
        let bytes = rng
            .random_bytes(PRIVATE_KEY_LEN)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        // Zero or >= n is astronomically unlikely; just draw again.
        if let Ok(secret) = SecretKey::from_slice(&bytes) {
            return Ok(secret);
        }
    }
    Err(CryptoError::KeyGeneration("no valid secp256k1 scalar drawn".into()))
}

/// Parse a SEC1-encoded secp256k1 public key (compressed or uncompressed).
pub fn parse_public_key(raw: &[u8]) -> Result<PublicKey> {
    let encoded = EncodedPoint::from_bytes(raw).map_err(|_| CryptoError::InvalidPublicKey)?;
    Option::from(PublicKey::from_encoded_point(&encoded)).ok_or(CryptoError::InvalidPublicKey)
}

/// ECDH on secp256k1, then SHA-256 of the shared x-coordinate.
pub fn derive_shared_key(secret: &SecretKey, peer: &PublicKey) -> Vec<u8> {
    let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    Sha256::digest(shared.raw_secret_bytes()).to_vec()
}

/// Encrypt to a raw recipient public key. Only secp256k1 can do the key
/// agreement; Ed25519 keys are rejected with `UnsupportedCurve`.
pub fn encrypt_ecies(
    message: &[u8],
    recipient_public_key: &[u8],
    family: KeyFamily,
    rng: &dyn SecureRandom,
) -> Result<EciesEnvelope> {
    if !family.supports_ecdh() {
        return Err(CryptoError::UnsupportedCurve(family.to_string()));
    }
    let recipient = parse_public_key(recipient_public_key)?;
    encrypt_ecies_to(message, &recipient, rng)
}

pub(crate) fn encrypt_ecies_to(
    message: &[u8],
    recipient: &PublicKey,
    rng: &dyn SecureRandom,
) -> Result<EciesEnvelope> {
    let ephemeral = generate_secret_key(rng)?;
    let key = derive_shared_key(&ephemeral, recipient);

    let iv = rng
        .random_bytes(IV_LEN)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let (encrypted_data, auth_tag) = aes256_gcm_encrypt(&key, &iv, message)?;

    let ephemeral_public = ephemeral.public_key().to_encoded_point(true);

    Ok(EciesEnvelope {
        ephemeral_public_key: BASE64.encode(ephemeral_public.as_bytes()),
        iv: BASE64.encode(iv),
        encrypted_data: BASE64.encode(encrypted_data),
        auth_tag: BASE64.encode(auth_tag),
        curve: ECIES_CURVE.to_string(),
    })
}

/// Recompute the shared key from the ephemeral public key and decrypt.
pub fn decrypt_ecies(envelope: &EciesEnvelope, secret: &SecretKey) -> Result<Vec<u8>> {
    if envelope.curve != ECIES_CURVE {
        return Err(CryptoError::UnsupportedCurve(envelope.curve.clone()));
    }

    let decode = |field: &str| BASE64.decode(field).map_err(|_| CryptoError::DecryptionFailed);
    let ephemeral_raw = decode(&envelope.ephemeral_public_key)?;
    let iv = decode(&envelope.iv)?;
    let encrypted_data = decode(&envelope.encrypted_data)?;
    let auth_tag = decode(&envelope.auth_tag)?;

    let ephemeral = parse_public_key(&ephemeral_raw).map_err(|_| CryptoError::DecryptionFailed)?;
    let key = derive_shared_key(secret, &ephemeral);

    aes256_gcm_decrypt(&key, &iv, &encrypted_data, &auth_tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::random::OsRandom;

    fn recipient() -> (SecretKey, Vec<u8>) {
        let secret = generate_secret_key(&OsRandom).unwrap();
        let public = secret.public_key().to_encoded_point(true).as_bytes().to_vec();
        (secret, public)
    }

    #[test]
    fn test_shared_secret_agrees() {
        let a = generate_secret_key(&OsRandom).unwrap();
        let b = generate_secret_key(&OsRandom).unwrap();
        let ab = derive_shared_key(&a, &b.public_key());
        let ba = derive_shared_key(&b, &a.public_key());
        assert_eq!(ab.len(), 32);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_ecies_roundtrip() {
        let (secret, public) = recipient();
        let envelope =
            encrypt_ecies(b"secret", &public, KeyFamily::EcdsaSecp256k1, &OsRandom).unwrap();
        assert_eq!(envelope.curve, "secp256k1");
        assert_eq!(BASE64.decode(&envelope.ephemeral_public_key).unwrap().len(), 33);
        assert_eq!(decrypt_ecies(&envelope, &secret).unwrap(), b"secret");
    }

    #[test]
    fn test_ecies_accepts_uncompressed_recipient() {
        let (secret, _) = recipient();
        let uncompressed = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
        assert_eq!(uncompressed.len(), 65);
        let envelope =
            encrypt_ecies(b"secret", &uncompressed, KeyFamily::EcdsaSecp256k1, &OsRandom).unwrap();
        assert_eq!(decrypt_ecies(&envelope, &secret).unwrap(), b"secret");
    }

    #[test]
    fn test_ecies_rejects_ed25519() {
        let result = encrypt_ecies(b"secret", &[0x01; 32], KeyFamily::Ed25519, &OsRandom);
        assert!(matches!(result, Err(CryptoError::UnsupportedCurve(_))));
    }

    #[test]
    fn test_ecies_wrong_key_fails() {
        let (_, public) = recipient();
        let (other, _) = recipient();
        let envelope =
            encrypt_ecies(b"secret", &public, KeyFamily::EcdsaSecp256k1, &OsRandom).unwrap();
        assert!(matches!(decrypt_ecies(&envelope, &other), Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_ecies_tampered_tag_fails() {
        let (secret, public) = recipient();
        let mut envelope =
            encrypt_ecies(b"secret", &public, KeyFamily::EcdsaSecp256k1, &OsRandom).unwrap();
        let mut tag = BASE64.decode(&envelope.auth_tag).unwrap();
        tag[15] ^= 0x80;
        envelope.auth_tag = BASE64.encode(tag);
        assert!(matches!(decrypt_ecies(&envelope, &secret), Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_ecies_unknown_curve_in_envelope() {
        let (secret, public) = recipient();
        let mut envelope =
            encrypt_ecies(b"secret", &public, KeyFamily::EcdsaSecp256k1, &OsRandom).unwrap();
        envelope.curve = "ed25519".to_string();
        assert!(matches!(decrypt_ecies(&envelope, &secret), Err(CryptoError::UnsupportedCurve(_))));
    }

    #[test]
    fn test_invalid_recipient_point() {
        let mut bogus = vec![0x02];
        bogus.extend_from_slice(&[0xff; 32]);
        let result = encrypt_ecies(b"x", &bogus, KeyFamily::EcdsaSecp256k1, &OsRandom);
        assert!(matches!(result, Err(CryptoError::InvalidPublicKey)));
    }
}
