//! The message-box protocol: box setup, ownership proofs, sending, chunk
//! reassembly, format sniffing, and cursor-based polling.

pub mod payload;
pub mod memo;
pub mod proof;
pub mod chunks;
pub mod sniff;
pub mod client;
pub mod poll;

#[cfg(test)]
pub(crate) mod testing;

pub use chunks::{reassemble_chunks, AssembledEntry};
pub use client::{AutoCreate, BoxReady, CreateDecision, MessageBoxClient};
pub use payload::{EncryptedEnvelope, FirstEntry, OwnershipProof, PublicKeyPayload, WireFormat};
pub use poll::{MessageBody, PollState, ReceivedMessage};
pub use proof::AccountSigner;
pub use sniff::{sniff_format, DecodedPayload, PayloadFormat};

use std::fmt;

use thiserror::Error;

/// A failed check on a recipient's first entry. Always fatal to the send.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityViolation {
    #[error("first entry is missing its payload or ownership proof")]
    MissingStructure,
    #[error("ownership proof names account {found}, expected {expected}")]
    AccountMismatch { expected: String, found: String },
    #[error("proof signer key is not the ledger key of account {0}")]
    SignerMismatch(String),
    #[error("ownership proof signature is invalid")]
    InvalidSignature,
}

/// Why an existing box cannot be used as-is during setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxProblem {
    /// The account memo references no box.
    NotFound,
    /// The referenced box has no usable first entry.
    Malformed(String),
    /// The box publishes a key the local key pair cannot open.
    KeyMismatch,
}

impl fmt::Display for BoxProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxProblem::NotFound => f.write_str("no message box referenced by the account memo"),
            BoxProblem::Malformed(reason) => write!(f, "message box is malformed: {reason}"),
            BoxProblem::KeyMismatch => {
                f.write_str("message box key does not match the local key pair")
            }
        }
    }
}
