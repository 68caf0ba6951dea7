//! Key container codec: wraps raw key bytes in the PKCS#8 / SPKI DER
//! structures generic key APIs expect, and strips them back off.
//!
//! Only the two fixed shapes this protocol uses are supported, so the DER is
//! assembled from constant prefixes rather than a general ASN.1 encoder.

pub mod der;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ED25519_PUBLIC_KEY_LEN, PRIVATE_KEY_LEN, SECP256K1_COMPRESSED_LEN, SECP256K1_UNCOMPRESSED_LEN,
};
use crate::crypto::CryptoError;

pub use der::{build_private_container, build_public_container, extract_raw_public_key};

/// Signing key families an account can hold on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyFamily {
    #[serde(rename = "ED25519")]
    Ed25519,
    #[serde(rename = "ECDSA_SECP256K1")]
    EcdsaSecp256k1,
}

impl KeyFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyFamily::Ed25519 => "ED25519",
            KeyFamily::EcdsaSecp256k1 => "ECDSA_SECP256K1",
        }
    }

    /// Whether keys of this family can take part in Diffie-Hellman.
    pub fn supports_ecdh(&self) -> bool {
        matches!(self, KeyFamily::EcdsaSecp256k1)
    }

    /// Check a raw public key length for this family.
    pub fn is_raw_public_len(&self, len: usize) -> bool {
        match self {
            KeyFamily::Ed25519 => len == ED25519_PUBLIC_KEY_LEN,
            KeyFamily::EcdsaSecp256k1 => {
                len == SECP256K1_COMPRESSED_LEN || len == SECP256K1_UNCOMPRESSED_LEN
            }
        }
    }

    pub fn check_private_len(&self, raw: &[u8]) -> Result<(), CryptoError> {
        if raw.len() != PRIVATE_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: PRIVATE_KEY_LEN,
                got: raw.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyFamily {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ED25519" => Ok(KeyFamily::Ed25519),
            "ECDSA_SECP256K1" | "SECP256K1" | "ECDSA" => Ok(KeyFamily::EcdsaSecp256k1),
            _ => Err(CryptoError::UnsupportedKeyFamily(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names_roundtrip() {
        for family in [KeyFamily::Ed25519, KeyFamily::EcdsaSecp256k1] {
            assert_eq!(family.as_str().parse::<KeyFamily>().unwrap(), family);
            let json = serde_json::to_string(&family).unwrap();
            assert_eq!(json, format!("\"{}\"", family.as_str()));
        }
        assert_eq!("secp256k1".parse::<KeyFamily>().unwrap(), KeyFamily::EcdsaSecp256k1);
        assert!("rsa".parse::<KeyFamily>().is_err());
    }

    #[test]
    fn test_only_secp256k1_does_ecdh() {
        assert!(!KeyFamily::Ed25519.supports_ecdh());
        assert!(KeyFamily::EcdsaSecp256k1.supports_ecdh());
    }
}
