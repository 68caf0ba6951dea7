use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::constants::CHUNK_SIZE;
use crate::error::MsgBoxError;
use crate::traits::ledger::{ChunkInfo, Ledger, LedgerKey, LogQuery, Order, RawEntry};

struct Account {
    memo: String,
    key: LedgerKey,
}

/// In-memory ledger and query replica for protocol tests. Oversized appends
/// are split into chunks the way a real ledger would.
pub struct MemoryLedger {
    accounts: RefCell<HashMap<String, Account>>,
    logs: RefCell<HashMap<String, Vec<RawEntry>>>,
    next_id: RefCell<u64>,
    chunk_size: usize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_chunk_size(CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            accounts: RefCell::new(HashMap::new()),
            logs: RefCell::new(HashMap::new()),
            next_id: RefCell::new(1000),
            chunk_size,
        }
    }

    fn allocate_id(&self) -> String {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        format!("0.0.{}", *next)
    }

    pub fn add_account(&self, account_id: &str, key: LedgerKey) {
        self.accounts.borrow_mut().insert(
            account_id.to_string(),
            Account {
                memo: String::new(),
                key,
            },
        );
    }

    pub fn set_memo(&self, account_id: &str, memo: &str) {
        if let Some(account) = self.accounts.borrow_mut().get_mut(account_id) {
            account.memo = memo.to_string();
        }
    }

    /// Append a raw entry verbatim, assigning the next sequence number.
    pub fn push_raw(&self, log_id: &str, message: &str, chunk_info: Option<ChunkInfo>) -> u64 {
        let mut logs = self.logs.borrow_mut();
        let entries = logs.entry(log_id.to_string()).or_default();
        let sequence = entries.len() as u64 + 1;
        entries.push(RawEntry {
            sequence_number: sequence,
            consensus_timestamp: format!("{}.000000000", 1_700_000_000 + sequence),
            message: message.to_string(),
            chunk_info,
        });
        sequence
    }

    pub fn entry_count(&self, log_id: &str) -> usize {
        self.logs.borrow().get(log_id).map_or(0, Vec::len)
    }

    pub fn log_count(&self) -> usize {
        self.logs.borrow().len()
    }
}

#[async_trait(?Send)]
impl Ledger for MemoryLedger {
    async fn create_log(&self, _memo: &str) -> Result<String, MsgBoxError> {
        let log_id = self.allocate_id();
        self.logs.borrow_mut().insert(log_id.clone(), Vec::new());
        Ok(log_id)
    }

    async fn append_entry(&self, log_id: &str, data: &[u8]) -> Result<u64, MsgBoxError> {
        if !self.logs.borrow().contains_key(log_id) {
            return Err(MsgBoxError::Ledger(format!("unknown log {log_id}")));
        }
        if data.len() <= self.chunk_size {
            return Ok(self.push_raw(log_id, &BASE64.encode(data), None));
        }

        let transaction_id = format!("{}@{}", self.allocate_id(), self.entry_count(log_id));
        let parts: Vec<&[u8]> = data.chunks(self.chunk_size).collect();
        let total = parts.len() as u32;
        let mut first = None;
        for (i, part) in parts.into_iter().enumerate() {
            let info = ChunkInfo {
                initial_transaction_id: transaction_id.clone(),
                number: i as u32 + 1,
                total,
            };
            let sequence = self.push_raw(log_id, &BASE64.encode(part), Some(info));
            first.get_or_insert(sequence);
        }
        first.ok_or_else(|| MsgBoxError::Ledger("empty chunked append".into()))
    }

    async fn account_memo(&self, account_id: &str) -> Result<String, MsgBoxError> {
        self.accounts
            .borrow()
            .get(account_id)
            .map(|a| a.memo.clone())
            .ok_or_else(|| MsgBoxError::Ledger(format!("unknown account {account_id}")))
    }

    async fn update_account_memo(&self, account_id: &str, memo: &str) -> Result<(), MsgBoxError> {
        let mut accounts = self.accounts.borrow_mut();
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| MsgBoxError::Ledger(format!("unknown account {account_id}")))?;
        account.memo = memo.to_string();
        Ok(())
    }

    async fn account_public_key(&self, account_id: &str) -> Result<LedgerKey, MsgBoxError> {
        self.accounts
            .borrow()
            .get(account_id)
            .map(|a| a.key.clone())
            .ok_or_else(|| MsgBoxError::Ledger(format!("unknown account {account_id}")))
    }
}

#[async_trait(?Send)]
impl LogQuery for MemoryLedger {
    async fn fetch_entries(
        &self,
        log_id: &str,
        after_sequence: u64,
        limit: usize,
        order: Order,
    ) -> Result<Vec<RawEntry>, MsgBoxError> {
        let logs = self.logs.borrow();
        let entries = logs
            .get(log_id)
            .ok_or_else(|| MsgBoxError::Query(format!("unknown log {log_id}")))?;
        let matching = entries.iter().filter(|e| e.sequence_number > after_sequence);
        let page: Vec<RawEntry> = match order {
            Order::Asc => matching.take(limit).cloned().collect(),
            Order::Desc => matching.rev().take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn fetch_entry(&self, log_id: &str, sequence: u64) -> Result<Option<RawEntry>, MsgBoxError> {
        Ok(self
            .logs
            .borrow()
            .get(log_id)
            .and_then(|entries| entries.iter().find(|e| e.sequence_number == sequence).cloned()))
    }

    async fn latest_sequence(&self, log_id: &str) -> Result<Option<u64>, MsgBoxError> {
        Ok(self
            .logs
            .borrow()
            .get(log_id)
            .and_then(|entries| entries.last().map(|e| e.sequence_number)))
    }
}
