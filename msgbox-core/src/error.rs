use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsgBoxError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("Codec error: {0}")]
    Codec(#[from] crate::codec::CodecError),

    #[error("Security violation: {0}")]
    Security(#[from] crate::protocol::SecurityViolation),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("No message box referenced by the memo of account {0}")]
    BoxNotFound(String),

    #[error("Message box setup aborted: {0}")]
    SetupAborted(crate::protocol::BoxProblem),

    #[error("Chunk group {transaction_id} incomplete: {received}/{total} parts")]
    ChunkIncomplete {
        transaction_id: String,
        received: usize,
        total: usize,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Platform error: {0}")]
    Platform(String),
}

impl From<serde_json::Error> for MsgBoxError {
    fn from(err: serde_json::Error) -> Self {
        MsgBoxError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MsgBoxError>;
