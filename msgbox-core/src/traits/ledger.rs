use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MsgBoxError;
use crate::keys::KeyFamily;

/// Sort order for paginated log reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Chunk metadata attached by the ledger when it splits an oversized entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub initial_transaction_id: String,
    /// 1-based chunk index.
    pub number: u32,
    pub total: u32,
}

/// A physical log entry as returned by the read replica. `message` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub sequence_number: u64,
    pub consensus_timestamp: String,
    pub message: String,
    pub chunk_info: Option<ChunkInfo>,
}

/// An account's ledger-native public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerKey {
    pub family: KeyFamily,
    pub public_key: Vec<u8>,
}

/// Write side of the ledger plus account lookups.
#[async_trait(?Send)]
pub trait Ledger {
    /// Create a new log and return its id.
    async fn create_log(&self, memo: &str) -> Result<String, MsgBoxError>;
    /// Append a message to a log, returning the sequence number it was assigned.
    async fn append_entry(&self, log_id: &str, data: &[u8]) -> Result<u64, MsgBoxError>;
    async fn account_memo(&self, account_id: &str) -> Result<String, MsgBoxError>;
    async fn update_account_memo(&self, account_id: &str, memo: &str) -> Result<(), MsgBoxError>;
    async fn account_public_key(&self, account_id: &str) -> Result<LedgerKey, MsgBoxError>;
}

/// Read side of the log, served by a query replica.
#[async_trait(?Send)]
pub trait LogQuery {
    /// Entries with sequence strictly greater than `after_sequence`, at most `limit`.
    async fn fetch_entries(
        &self,
        log_id: &str,
        after_sequence: u64,
        limit: usize,
        order: Order,
    ) -> Result<Vec<RawEntry>, MsgBoxError>;
    async fn fetch_entry(&self, log_id: &str, sequence: u64) -> Result<Option<RawEntry>, MsgBoxError>;
    async fn latest_sequence(&self, log_id: &str) -> Result<Option<u64>, MsgBoxError>;
}
