//! Crypto engine: hybrid RSA and ECIES encryption, signing, and key pairs.

pub mod aes_gcm;
pub mod aes_cbc;
pub mod rsa_hybrid;
pub mod ecies;
pub mod signing;
pub mod keypair;
pub mod envelope;

pub use envelope::{decrypt_message, encrypt_message, EncryptionEnvelope, EncryptionType};
pub use keypair::{KeyPair, PublicEncryptionKey};
pub use signing::{sign, verify};

use thiserror::Error;

/// Crypto failures. Decryption collapses every underlying cause into
/// `DecryptionFailed` so callers cannot tell padding, tag and key errors apart.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),
    #[error("unsupported encryption format: {0}")]
    UnsupportedEncryptionFormat(String),
    #[error("unsupported key family: {0}")]
    UnsupportedKeyFamily(String),
    #[error("malformed key container")]
    MalformedKeyContainer,
    #[error("malformed signature")]
    MalformedSignature,
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("Invalid public key format")]
    InvalidPublicKey,
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("key encoding failed: {0}")]
    KeyEncoding(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
