use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand_core::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use super::aes_cbc::{aes256_cbc_decrypt, aes256_cbc_encrypt};
use super::envelope::RsaEnvelope;
use super::{CryptoError, Result};
use crate::constants::{AES_KEY_LEN, IV_LEN};
use crate::traits::random::SecureRandom;

/// Hybrid-encrypt `message`: AES-256-CBC under a fresh key, with the key
/// wrapped by RSA-OAEP(SHA-256) to the recipient.
pub fn encrypt_hybrid_rsa(
    message: &[u8],
    recipient: &RsaPublicKey,
    rng: &dyn SecureRandom,
) -> Result<RsaEnvelope> {
    let key = rng
        .random_bytes(AES_KEY_LEN)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let iv = rng
        .random_bytes(IV_LEN)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let encrypted_data = aes256_cbc_encrypt(&key, &iv, message)?;
    let encrypted_key = recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &key)
        .map_err(|e| CryptoError::EncryptionFailed(format!("RSA-OAEP: {e}")))?;

    Ok(RsaEnvelope {
        encrypted_key: BASE64.encode(encrypted_key),
        iv: BASE64.encode(iv),
        encrypted_data: BASE64.encode(encrypted_data),
    })
}

/// Invert [`encrypt_hybrid_rsa`]. Every failure is `DecryptionFailed`.
pub fn decrypt_hybrid_rsa(envelope: &RsaEnvelope, private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
    let encrypted_key = decode_field(&envelope.encrypted_key)?;
    let iv = decode_field(&envelope.iv)?;
    let encrypted_data = decode_field(&envelope.encrypted_data)?;

    let key = private_key
        .decrypt(Oaep::new::<Sha256>(), &encrypted_key)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    aes256_cbc_decrypt(&key, &iv, &encrypted_data)
}

fn decode_field(field: &str) -> Result<Vec<u8>> {
    BASE64.decode(field).map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::random::OsRandom;

    fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
        // Small modulus keeps the test fast; OAEP-SHA256 needs > 66 bytes of key.
        let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    #[test]
    fn test_hybrid_rsa_roundtrip() {
        let (private, public) = keypair();
        let envelope = encrypt_hybrid_rsa(b"hello world", &public, &OsRandom).unwrap();
        assert_eq!(decrypt_hybrid_rsa(&envelope, &private).unwrap(), b"hello world");
    }

    #[test]
    fn test_hybrid_rsa_unrelated_key_fails() {
        let (_, public) = keypair();
        let (other_private, _) = keypair();
        let envelope = encrypt_hybrid_rsa(b"hello world", &public, &OsRandom).unwrap();
        assert!(matches!(
            decrypt_hybrid_rsa(&envelope, &other_private),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_hybrid_rsa_fields_are_base64() {
        let (_, public) = keypair();
        let envelope = encrypt_hybrid_rsa(b"x", &public, &OsRandom).unwrap();
        assert_eq!(BASE64.decode(&envelope.iv).unwrap().len(), 16);
        assert_eq!(BASE64.decode(&envelope.encrypted_key).unwrap().len(), 128);
        assert_eq!(BASE64.decode(&envelope.encrypted_data).unwrap().len(), 16);
    }

    #[test]
    fn test_hybrid_rsa_garbage_fields() {
        let (private, public) = keypair();
        let mut envelope = encrypt_hybrid_rsa(b"x", &public, &OsRandom).unwrap();
        envelope.iv = "not base64!".to_string();
        assert!(matches!(
            decrypt_hybrid_rsa(&envelope, &private),
            Err(CryptoError::DecryptionFailed)
        ));
    }
}
