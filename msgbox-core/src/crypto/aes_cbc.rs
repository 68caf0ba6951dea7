use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::{CryptoError, Result};
use crate::constants::{AES_KEY_LEN, IV_LEN};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt with AES-256-CBC and PKCS#7 padding.
pub fn aes256_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if key.len() != AES_KEY_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: AES_KEY_LEN,
            got: key.len(),
        });
    }
    let encryptor = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| CryptoError::EncryptionFailed(format!("invalid IV: {e}")))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt AES-256-CBC. Any key, IV or padding problem is `DecryptionFailed`.
pub fn aes256_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let decryptor =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| CryptoError::DecryptionFailed)?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes256_cbc_roundtrip() {
        let key = [0x11u8; 32];
        let iv = [0x22u8; 16];
        let ciphertext = aes256_cbc_encrypt(&key, &iv, b"hello world").unwrap();
        assert_eq!(ciphertext.len(), 16);
        assert_eq!(aes256_cbc_decrypt(&key, &iv, &ciphertext).unwrap(), b"hello world");
    }

    #[test]
    fn test_aes256_cbc_block_aligned_input_gets_full_padding_block() {
        let ciphertext = aes256_cbc_encrypt(&[0x11; 32], &[0x22; 16], &[0u8; 32]).unwrap();
        assert_eq!(ciphertext.len(), 48);
    }

    #[test]
    fn test_aes256_cbc_bad_ciphertext_length() {
        let result = aes256_cbc_decrypt(&[0x11; 32], &[0x22; 16], &[0u8; 15]);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }
}
