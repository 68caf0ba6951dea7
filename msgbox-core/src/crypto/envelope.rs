use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ecies::{decrypt_ecies, encrypt_ecies_to};
use super::keypair::{KeyPair, PublicEncryptionKey};
use super::rsa_hybrid::{decrypt_hybrid_rsa, encrypt_hybrid_rsa};
use super::{CryptoError, Result};
use crate::traits::random::SecureRandom;

/// Encryption scheme tag carried by published keys and envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionType {
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "ECIES")]
    Ecies,
}

impl EncryptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionType::Rsa => "RSA",
            EncryptionType::Ecies => "ECIES",
        }
    }
}

impl fmt::Display for EncryptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RSA" => Ok(EncryptionType::Rsa),
            "ECIES" => Ok(EncryptionType::Ecies),
            _ => Err(CryptoError::UnsupportedEncryptionFormat(s.to_string())),
        }
    }
}

/// Binary fields are base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsaEnvelope {
    pub encrypted_key: String,
    pub iv: String,
    pub encrypted_data: String,
}

/// Binary fields are base64; the ephemeral key is SEC1-compressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EciesEnvelope {
    pub ephemeral_public_key: String,
    pub iv: String,
    pub encrypted_data: String,
    pub auth_tag: String,
    pub curve: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EncryptionEnvelope {
    #[serde(rename = "RSA")]
    Rsa(RsaEnvelope),
    #[serde(rename = "ECIES")]
    Ecies(EciesEnvelope),
}

impl EncryptionEnvelope {
    pub fn encryption_type(&self) -> EncryptionType {
        match self {
            EncryptionEnvelope::Rsa(_) => EncryptionType::Rsa,
            EncryptionEnvelope::Ecies(_) => EncryptionType::Ecies,
        }
    }

    /// Parse from JSON, reporting an unknown `type` as an unsupported format
    /// rather than a generic deserialization error.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| CryptoError::UnsupportedEncryptionFormat("missing type".into()))?;
        kind.parse::<EncryptionType>()?;
        serde_json::from_value(value.clone())
            .map_err(|e| CryptoError::UnsupportedEncryptionFormat(format!("{kind}: {e}")))
    }
}

/// Encrypt for a published key, dispatching on the key's scheme.
pub fn encrypt_message(
    message: &[u8],
    recipient: &PublicEncryptionKey,
    rng: &dyn SecureRandom,
) -> Result<EncryptionEnvelope> {
    match recipient {
        PublicEncryptionKey::Rsa(public) => {
            encrypt_hybrid_rsa(message, public, rng).map(EncryptionEnvelope::Rsa)
        }
        PublicEncryptionKey::Ecies(public) => {
            encrypt_ecies_to(message, public, rng).map(EncryptionEnvelope::Ecies)
        }
    }
}

/// Decrypt an envelope, dispatching on the envelope's `type` tag.
pub fn decrypt_message(envelope: &EncryptionEnvelope, key_pair: &KeyPair) -> Result<Vec<u8>> {
    match (envelope, key_pair) {
        (EncryptionEnvelope::Rsa(env), KeyPair::Rsa(private)) => decrypt_hybrid_rsa(env, private),
        (EncryptionEnvelope::Ecies(env), KeyPair::Ecies(secret)) => decrypt_ecies(env, secret),
        (env, key) => Err(CryptoError::UnsupportedEncryptionFormat(format!(
            "{} envelope cannot be opened with a {} key",
            env.encryption_type(),
            key.encryption_type()
        ))),
    }
}
