use aes_gcm::{
    aead::{consts::U16, Aead, KeyInit},
    aes::Aes256,
    AesGcm, Nonce,
};

use super::{CryptoError, Result};
use crate::constants::{AES_KEY_LEN, AUTH_TAG_LEN, IV_LEN};

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Encrypt with AES-256-GCM, returning the ciphertext and the detached 16-byte tag.
pub fn aes256_gcm_encrypt(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    check_lengths(key, nonce)?;

    let cipher = Aes256Gcm16::new_from_slice(key)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut sealed = cipher
        .encrypt(Nonce::<U16>::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let tag = sealed.split_off(sealed.len() - AUTH_TAG_LEN);
    Ok((sealed, tag))
}

/// Decrypt AES-256-GCM ciphertext with a detached tag.
pub fn aes256_gcm_decrypt(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>> {
    if key.len() != AES_KEY_LEN || nonce.len() != IV_LEN || tag.len() != AUTH_TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = Aes256Gcm16::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;

    let mut sealed = Vec::with_capacity(ciphertext.len() + AUTH_TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::<U16>::from_slice(nonce), sealed.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)
}

fn check_lengths(key: &[u8], nonce: &[u8]) -> Result<()> {
    if key.len() != AES_KEY_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: AES_KEY_LEN,
            got: key.len(),
        });
    }
    if nonce.len() != IV_LEN {
        return Err(CryptoError::EncryptionFailed(format!(
            "invalid nonce length: expected {IV_LEN}, got {}",
            nonce.len()
        )));
    }
    Ok(())
}
