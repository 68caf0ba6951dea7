use k256::ecdsa::signature::{Signer, Verifier};
use k256::pkcs8::{DecodePrivateKey, DecodePublicKey};

use super::{CryptoError, Result};
use crate::keys::{
    build_private_container, build_public_container, extract_raw_public_key, KeyFamily,
};

/// Sign `message` with a raw 32-byte private key, returning hex.
///
/// The raw key is first wrapped in its PKCS#8 container. Ed25519 signs the
/// message bytes directly; secp256k1 ECDSA signs their SHA-256 digest and
/// emits the fixed 64-byte `r || s` form.
pub fn sign(message: &[u8], private_key: &[u8], family: KeyFamily) -> Result<String> {
    let der = build_private_container(private_key, family, None)?;
    let signature = match family {
        KeyFamily::Ed25519 => {
            let key = ed25519_dalek::SigningKey::from_pkcs8_der(&der)
                .map_err(|_| CryptoError::MalformedKeyContainer)?;
            key.sign(message).to_bytes().to_vec()
        }
        KeyFamily::EcdsaSecp256k1 => {
            let key = k256::ecdsa::SigningKey::from_pkcs8_der(&der)
                .map_err(|_| CryptoError::MalformedKeyContainer)?;
            let signature: k256::ecdsa::Signature = key.sign(message);
            signature.to_bytes().to_vec()
        }
    };
    Ok(hex::encode(signature))
}

/// Verify a hex signature against a public key, given raw or SPKI-wrapped.
///
/// Returns `Ok(false)` for a well-formed signature that does not match.
/// Structurally invalid keys or signatures are errors. ECDSA signatures are
/// accepted in either `r || s` or DER form, with high-S values normalized.
pub fn verify(
    message: &[u8],
    signature_hex: &str,
    public_key: &[u8],
    family: KeyFamily,
) -> Result<bool> {
    let signature = hex::decode(signature_hex).map_err(|_| CryptoError::MalformedSignature)?;
    let raw = extract_raw_public_key(public_key, family)?;
    let der = build_public_container(&raw, family)?;

    match family {
        KeyFamily::Ed25519 => {
            let key = ed25519_dalek::VerifyingKey::from_public_key_der(&der)
                .map_err(|_| CryptoError::MalformedKeyContainer)?;
            let signature = ed25519_dalek::Signature::from_slice(&signature)
                .map_err(|_| CryptoError::MalformedSignature)?;
            Ok(key.verify(message, &signature).is_ok())
        }
        KeyFamily::EcdsaSecp256k1 => {
            let key = k256::ecdsa::VerifyingKey::from_public_key_der(&der)
                .map_err(|_| CryptoError::MalformedKeyContainer)?;
            let signature = k256::ecdsa::Signature::from_slice(&signature)
                .or_else(|_| k256::ecdsa::Signature::from_der(&signature))
                .map_err(|_| CryptoError::MalformedSignature)?;
            let signature = signature.normalize_s().unwrap_or(signature);
            Ok(key.verify(message, &signature).is_ok())
        }
    }
}

/// Derive the raw public key for a raw private signing key.
///
/// Ed25519 yields 32 bytes; secp256k1 yields the 33-byte compressed point.
pub fn public_key_for(private_key: &[u8], family: KeyFamily) -> Result<Vec<u8>> {
    family.check_private_len(private_key)?;
    match family {
        KeyFamily::Ed25519 => {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(private_key);
            let key = ed25519_dalek::SigningKey::from_bytes(&bytes);
            Ok(key.verifying_key().to_bytes().to_vec())
        }
        KeyFamily::EcdsaSecp256k1 => {
            let key = k256::ecdsa::SigningKey::from_slice(private_key)
                .map_err(|_| CryptoError::MalformedKeyContainer)?;
            Ok(key.verifying_key().to_encoded_point(true).as_bytes().to_vec())
        }
    }
}

/// Compare two raw public keys of one family, treating compressed and
/// uncompressed secp256k1 encodings of the same point as equal.
pub fn same_public_key(a: &[u8], b: &[u8], family: KeyFamily) -> bool {
    if a == b {
        return true;
    }
    match family {
        KeyFamily::Ed25519 => false,
        KeyFamily::EcdsaSecp256k1 => {
            match (k256::PublicKey::from_sec1_bytes(a), k256::PublicKey::from_sec1_bytes(b)) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
        }
    }
}
