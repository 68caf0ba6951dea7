use super::KeyFamily;
use crate::constants::{
    ED25519_PUBLIC_KEY_LEN, SECP256K1_COMPRESSED_LEN, SECP256K1_UNCOMPRESSED_LEN,
};
use crate::crypto::CryptoError;

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_EC_PUBLIC_KEY: u8 = 0xa1;

/// AlgorithmIdentifier { id-Ed25519 }.
const ED25519_ALGORITHM: [u8; 7] = [0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70];

/// AlgorithmIdentifier { id-ecPublicKey, secp256k1 }.
const SECP256K1_ALGORITHM: [u8; 18] = [
    0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05, 0x2b, 0x81,
    0x04, 0x00, 0x0a,
];

/// Total SPKI sizes used by the suffix-slicing fallback.
const ED25519_SPKI_LEN: usize = 44;
const SECP256K1_SPKI_COMPRESSED_LEN: usize = 56;
const SECP256K1_SPKI_UNCOMPRESSED_LEN: usize = 88;

fn algorithm(family: KeyFamily) -> &'static [u8] {
    match family {
        KeyFamily::Ed25519 => &ED25519_ALGORITHM,
        KeyFamily::EcdsaSecp256k1 => &SECP256K1_ALGORITHM,
    }
}

/// Append a DER definite length.
fn push_len(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x100 {
        out.push(0x81);
        out.push(len as u8);
    } else {
        out.push(0x82);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    }
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(tag);
    push_len(&mut out, content.len());
    out.extend_from_slice(content);
    out
}

/// Read a DER length at `pos`, returning (length, bytes consumed).
fn read_len(bytes: &[u8], pos: usize) -> Option<(usize, usize)> {
    let first = *bytes.get(pos)?;
    match first {
        0..=0x7f => Some((first as usize, 1)),
        0x81 => Some((*bytes.get(pos + 1)? as usize, 2)),
        0x82 => {
            let hi = *bytes.get(pos + 1)? as usize;
            let lo = *bytes.get(pos + 2)? as usize;
            Some(((hi << 8) | lo, 3))
        }
        _ => None,
    }
}

/// Wrap a raw 32-byte private key in a PKCS#8 PrivateKeyInfo.
///
/// For secp256k1 the inner SEC1 ECPrivateKey carries `public` when given.
/// Ed25519 containers are always PKCS#8 v1 and ignore `public`.
pub fn build_private_container(
    raw: &[u8],
    family: KeyFamily,
    public: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    family.check_private_len(raw)?;

    let private_key = match family {
        KeyFamily::Ed25519 => tlv(TAG_OCTET_STRING, raw),
        KeyFamily::EcdsaSecp256k1 => {
            let mut sec1 = vec![TAG_INTEGER, 0x01, 0x01];
            sec1.extend_from_slice(&tlv(TAG_OCTET_STRING, raw));
            if let Some(public) = public {
                if !family.is_raw_public_len(public.len()) {
                    return Err(CryptoError::MalformedKeyContainer);
                }
                sec1.extend_from_slice(&tlv(TAG_EC_PUBLIC_KEY, &bit_string(public)));
            }
            tlv(TAG_SEQUENCE, &sec1)
        }
    };

    let mut body = vec![TAG_INTEGER, 0x01, 0x00];
    body.extend_from_slice(algorithm(family));
    body.extend_from_slice(&tlv(TAG_OCTET_STRING, &private_key));
    Ok(tlv(TAG_SEQUENCE, &body))
}

/// Wrap a raw public key in a SubjectPublicKeyInfo.
pub fn build_public_container(raw: &[u8], family: KeyFamily) -> Result<Vec<u8>, CryptoError> {
    if !family.is_raw_public_len(raw.len()) {
        return Err(CryptoError::MalformedKeyContainer);
    }
    let mut body = algorithm(family).to_vec();
    body.extend_from_slice(&bit_string(raw));
    Ok(tlv(TAG_SEQUENCE, &body))
}

fn bit_string(raw: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(raw.len() + 1);
    content.push(0x00);
    content.extend_from_slice(raw);
    tlv(TAG_BIT_STRING, &content)
}

/// Recover the raw public key from an SPKI container, or pass raw input through.
///
/// Order of attempts: structural parse of the SPKI, then slicing the fixed
/// suffix for a container of the family's known size, then treating the input
/// as already raw.
pub fn extract_raw_public_key(bytes: &[u8], family: KeyFamily) -> Result<Vec<u8>, CryptoError> {
    if looks_like_container(bytes, family) {
        if let Some(raw) = parse_spki(bytes, family) {
            return Ok(raw.to_vec());
        }
        if let Some(suffix) = fallback_suffix_len(bytes.len(), family) {
            return Ok(bytes[bytes.len() - suffix..].to_vec());
        }
        if !family.is_raw_public_len(bytes.len()) {
            return Err(CryptoError::MalformedKeyContainer);
        }
    }
    if family.is_raw_public_len(bytes.len()) {
        return Ok(bytes.to_vec());
    }
    Err(CryptoError::MalformedKeyContainer)
}

fn looks_like_container(bytes: &[u8], family: KeyFamily) -> bool {
    if bytes.first() != Some(&TAG_SEQUENCE) {
        return false;
    }
    // A raw key may begin with 0x30 by chance; only a consistent header wins then.
    if !family.is_raw_public_len(bytes.len()) {
        return true;
    }
    matches!(read_len(bytes, 1), Some((len, used)) if 1 + used + len == bytes.len())
}

fn parse_spki(bytes: &[u8], family: KeyFamily) -> Option<&[u8]> {
    let (outer_len, used) = read_len(bytes, 1)?;
    let mut pos = 1 + used;
    if pos + outer_len != bytes.len() {
        return None;
    }

    let algorithm = algorithm(family);
    if bytes.get(pos..pos + algorithm.len())? != algorithm {
        return None;
    }
    pos += algorithm.len();

    if *bytes.get(pos)? != TAG_BIT_STRING {
        return None;
    }
    let (bits_len, used) = read_len(bytes, pos + 1)?;
    pos += 1 + used;
    if pos + bits_len != bytes.len() || *bytes.get(pos)? != 0x00 {
        return None;
    }
    let raw = &bytes[pos + 1..];
    family.is_raw_public_len(raw.len()).then_some(raw)
}

fn fallback_suffix_len(total: usize, family: KeyFamily) -> Option<usize> {
    match (family, total) {
        (KeyFamily::Ed25519, ED25519_SPKI_LEN) => Some(ED25519_PUBLIC_KEY_LEN),
        (KeyFamily::EcdsaSecp256k1, SECP256K1_SPKI_COMPRESSED_LEN) => Some(SECP256K1_COMPRESSED_LEN),
        (KeyFamily::EcdsaSecp256k1, SECP256K1_SPKI_UNCOMPRESSED_LEN) => {
            Some(SECP256K1_UNCOMPRESSED_LEN)
        }
        _ => None,
    }
}
