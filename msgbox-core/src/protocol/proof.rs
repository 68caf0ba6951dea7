//! Ownership proofs binding a box's published key to the account that owns it.
//!
//! The sender-side checks run in a fixed order: structure, identity,
//! authority, signature. Each failure is a distinct [`SecurityViolation`].

use std::fmt;

use serde_json::Value;

use super::payload::{FirstEntry, OwnershipProof, PublicKeyPayload};
use super::SecurityViolation;
use crate::canonical::{canonicalize, canonicalize_serializable};
use crate::crypto::signing::{public_key_for, same_public_key};
use crate::crypto::{sign, verify, PublicEncryptionKey};
use crate::error::Result;
use crate::keys::{extract_raw_public_key, KeyFamily};
use crate::traits::ledger::LedgerKey;

/// An account's authoritative signing key.
#[derive(Clone)]
pub struct AccountSigner {
    pub account_id: String,
    pub family: KeyFamily,
    private_key: Vec<u8>,
    public_key: Vec<u8>,
}

impl AccountSigner {
    pub fn new(account_id: impl Into<String>, family: KeyFamily, private_key: Vec<u8>) -> Result<Self> {
        let public_key = public_key_for(&private_key, family)?;
        Ok(Self {
            account_id: account_id.into(),
            family,
            private_key,
            public_key,
        })
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn sign(&self, message: &[u8]) -> Result<String> {
        Ok(sign(message, &self.private_key, self.family)?)
    }
}

impl fmt::Debug for AccountSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSigner")
            .field("account_id", &self.account_id)
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

/// Build the signed first entry publishing `public_key` for `signer`'s box.
pub fn build_first_entry(signer: &AccountSigner, public_key: &PublicEncryptionKey) -> Result<FirstEntry> {
    let payload = PublicKeyPayload::new(public_key)?;
    let canonical = canonicalize_serializable(&payload)?;
    let signature = signer.sign(canonical.as_bytes())?;
    Ok(FirstEntry {
        payload,
        proof: OwnershipProof {
            account_id: signer.account_id.clone(),
            signer_public_key: hex::encode(signer.public_key()),
            signer_key_type: signer.family,
            signature,
        },
    })
}

/// A first entry that passed the structural check. The payload is kept as
/// received so the signature is checked over exactly what was published.
#[derive(Debug, Clone)]
pub struct CheckedEntry {
    pub payload_json: Value,
    pub entry: FirstEntry,
}

/// Check 1: payload and proof present, every proof field populated.
pub fn check_structure(value: &Value) -> std::result::Result<CheckedEntry, SecurityViolation> {
    let payload = value
        .get("payload")
        .filter(|p| p.is_object())
        .ok_or(SecurityViolation::MissingStructure)?;
    let proof = value
        .get("proof")
        .filter(|p| p.is_object())
        .ok_or(SecurityViolation::MissingStructure)?;

    for field in ["accountId", "signerPublicKey", "signerKeyType", "signature"] {
        let populated = proof
            .get(field)
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.trim().is_empty());
        if !populated {
            return Err(SecurityViolation::MissingStructure);
        }
    }

    let entry: FirstEntry =
        serde_json::from_value(value.clone()).map_err(|_| SecurityViolation::MissingStructure)?;
    Ok(CheckedEntry {
        payload_json: payload.clone(),
        entry,
    })
}

/// Check 2: the proof names the account whose memo pointed at the box.
pub fn check_identity(checked: &CheckedEntry, recipient_account_id: &str) -> std::result::Result<(), SecurityViolation> {
    let found = &checked.entry.proof.account_id;
    if found != recipient_account_id {
        return Err(SecurityViolation::AccountMismatch {
            expected: recipient_account_id.to_string(),
            found: found.clone(),
        });
    }
    Ok(())
}

/// Check 3: the proof's signer key is the account's ledger-native key.
pub fn check_authority(checked: &CheckedEntry, ledger_key: &LedgerKey) -> std::result::Result<(), SecurityViolation> {
    let proof = &checked.entry.proof;
    let mismatch = || SecurityViolation::SignerMismatch(proof.account_id.clone());

    if proof.signer_key_type != ledger_key.family {
        return Err(mismatch());
    }
    let claimed = hex::decode(&proof.signer_public_key).map_err(|_| mismatch())?;
    let authoritative =
        extract_raw_public_key(&ledger_key.public_key, ledger_key.family).map_err(|_| mismatch())?;
    if !same_public_key(&claimed, &authoritative, ledger_key.family) {
        return Err(mismatch());
    }
    Ok(())
}

/// Check 4: the signature covers the canonical form of the payload.
pub fn check_signature(checked: &CheckedEntry) -> std::result::Result<(), SecurityViolation> {
    let proof = &checked.entry.proof;
    let signer_key =
        hex::decode(&proof.signer_public_key).map_err(|_| SecurityViolation::InvalidSignature)?;
    let canonical = canonicalize(&checked.payload_json);
    match verify(canonical.as_bytes(), &proof.signature, &signer_key, proof.signer_key_type) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(SecurityViolation::InvalidSignature),
    }
}
