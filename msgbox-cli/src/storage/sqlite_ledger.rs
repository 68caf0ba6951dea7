use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::debug;

use msgbox_core::constants::CHUNK_SIZE;
use msgbox_core::error::MsgBoxError;
use msgbox_core::keys::KeyFamily;
use msgbox_core::traits::ledger::{ChunkInfo, Ledger, LedgerKey, LogQuery, Order, RawEntry};
use msgbox_core::traits::random::{OsRandom, SecureRandom};

/// First entity number handed out; ids look like `0.0.1001`.
const FIRST_ENTITY_NUM: i64 = 1000;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entities (
        num  INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS accounts (
        id         TEXT PRIMARY KEY,
        memo       TEXT NOT NULL DEFAULT '',
        key_family TEXT NOT NULL,
        public_key TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS logs (
        id   TEXT PRIMARY KEY,
        memo TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS entries (
        log_id              TEXT NOT NULL,
        sequence            INTEGER NOT NULL,
        consensus_timestamp TEXT NOT NULL,
        message             TEXT NOT NULL,
        initial_tx          TEXT,
        chunk_number        INTEGER,
        chunk_total         INTEGER,
        PRIMARY KEY (log_id, sequence)
    );
";

/// A local single-node ledger and query replica backed by SQLite.
///
/// Appends larger than `CHUNK_SIZE` are split into chunk entries sharing an
/// initial transaction id, the way a public ledger splits oversized messages.
/// Synchronous rusqlite calls are wrapped in `tokio::task::spawn_blocking`.
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
    chunk_size: usize,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, MsgBoxError> {
        let conn = Connection::open(db_path)
            .map_err(|e| MsgBoxError::Ledger(format!("open SQLite DB failed: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| MsgBoxError::Ledger(format!("set WAL mode failed: {e}")))?;
        debug!("Opened ledger DB at {}", db_path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, MsgBoxError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MsgBoxError::Ledger(format!("open SQLite DB failed: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, MsgBoxError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| MsgBoxError::Ledger(format!("create ledger tables failed: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            chunk_size: CHUNK_SIZE,
        })
    }

    /// Override the chunking threshold.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Create an account holding `public_key` and return its id.
    pub async fn register_account(&self, family: KeyFamily, public_key: &[u8]) -> Result<String, MsgBoxError> {
        let public_key = hex::encode(public_key);
        self.run(move |conn| {
            let tx = conn.transaction().map_err(ledger_err("begin"))?;
            let account_id = allocate_entity(&tx, "account")?;
            tx.execute(
                "INSERT INTO accounts (id, key_family, public_key) VALUES (?1, ?2, ?3)",
                params![account_id, family.as_str(), public_key],
            )
            .map_err(ledger_err("insert account"))?;
            tx.commit().map_err(ledger_err("commit"))?;
            debug!("Registered account {account_id}");
            Ok(account_id)
        })
        .await
    }

    async fn run<T, F>(&self, f: F) -> Result<T, MsgBoxError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, MsgBoxError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| MsgBoxError::Ledger(format!("spawn_blocking failed: {e}")))?
    }
}

fn ledger_err(context: &'static str) -> impl Fn(rusqlite::Error) -> MsgBoxError {
    move |e| MsgBoxError::Ledger(format!("sqlite {context} failed: {e}"))
}

fn query_err(context: &'static str) -> impl Fn(rusqlite::Error) -> MsgBoxError {
    move |e| MsgBoxError::Query(format!("sqlite {context} failed: {e}"))
}

fn allocate_entity(conn: &Connection, kind: &str) -> Result<String, MsgBoxError> {
    conn.execute("INSERT INTO entities (kind) VALUES (?1)", params![kind])
        .map_err(ledger_err("allocate id"))?;
    Ok(format!("0.0.{}", FIRST_ENTITY_NUM + conn.last_insert_rowid()))
}

fn consensus_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:09}", now.as_secs(), now.subsec_nanos())
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
    let initial_tx: Option<String> = row.get(3)?;
    let number: Option<u32> = row.get(4)?;
    let total: Option<u32> = row.get(5)?;
    let chunk_info = match (initial_tx, number, total) {
        (Some(initial_transaction_id), Some(number), Some(total)) => Some(ChunkInfo {
            initial_transaction_id,
            number,
            total,
        }),
        _ => None,
    };
    Ok(RawEntry {
        sequence_number: row.get::<_, i64>(0)? as u64,
        consensus_timestamp: row.get(1)?,
        message: row.get(2)?,
        chunk_info,
    })
}

const ENTRY_COLUMNS: &str = "sequence, consensus_timestamp, message, initial_tx, chunk_number, chunk_total";

#[async_trait(?Send)]
impl Ledger for SqliteLedger {
    async fn create_log(&self, memo: &str) -> Result<String, MsgBoxError> {
        let memo = memo.to_string();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(ledger_err("begin"))?;
            let log_id = allocate_entity(&tx, "log")?;
            tx.execute("INSERT INTO logs (id, memo) VALUES (?1, ?2)", params![log_id, memo])
                .map_err(ledger_err("insert log"))?;
            tx.commit().map_err(ledger_err("commit"))?;
            debug!("Created log {log_id}");
            Ok(log_id)
        })
        .await
    }

    async fn append_entry(&self, log_id: &str, data: &[u8]) -> Result<u64, MsgBoxError> {
        let log_id = log_id.to_string();
        let parts: Vec<Vec<u8>> = if data.len() <= self.chunk_size {
            vec![data.to_vec()]
        } else {
            data.chunks(self.chunk_size).map(<[u8]>::to_vec).collect()
        };
        let initial_tx = if parts.len() > 1 {
            let nonce = OsRandom.random_bytes(8)?;
            Some(format!("{log_id}@{}", hex::encode(nonce)))
        } else {
            None
        };

        self.run(move |conn| {
            let tx = conn.transaction().map_err(ledger_err("begin"))?;
            let known: Option<String> = tx
                .query_row("SELECT id FROM logs WHERE id = ?1", params![log_id], |row| row.get(0))
                .optional()
                .map_err(ledger_err("lookup log"))?;
            if known.is_none() {
                return Err(MsgBoxError::Ledger(format!("unknown log {log_id}")));
            }

            let last: i64 = tx
                .query_row(
                    "SELECT COALESCE(MAX(sequence), 0) FROM entries WHERE log_id = ?1",
                    params![log_id],
                    |row| row.get(0),
                )
                .map_err(ledger_err("read sequence"))?;

            let total = parts.len() as u32;
            let timestamp = consensus_timestamp();
            for (i, part) in parts.iter().enumerate() {
                let (number, chunk_total) = match &initial_tx {
                    Some(_) => (Some(i as u32 + 1), Some(total)),
                    None => (None, None),
                };
                tx.execute(
                    "INSERT INTO entries (log_id, sequence, consensus_timestamp, message, initial_tx, chunk_number, chunk_total)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        log_id,
                        last + 1 + i as i64,
                        timestamp,
                        BASE64.encode(part),
                        initial_tx,
                        number,
                        chunk_total
                    ],
                )
                .map_err(ledger_err("insert entry"))?;
            }
            tx.commit().map_err(ledger_err("commit"))?;

            debug!("Appended {} entries to log {log_id} after sequence {last}", parts.len());
            Ok(last as u64 + 1)
        })
        .await
    }

    async fn account_memo(&self, account_id: &str) -> Result<String, MsgBoxError> {
        let account_id = account_id.to_string();
        self.run(move |conn| {
            conn.query_row("SELECT memo FROM accounts WHERE id = ?1", params![account_id], |row| row.get(0))
                .optional()
                .map_err(ledger_err("read memo"))?
                .ok_or_else(|| MsgBoxError::Ledger(format!("unknown account {account_id}")))
        })
        .await
    }

    async fn update_account_memo(&self, account_id: &str, memo: &str) -> Result<(), MsgBoxError> {
        let account_id = account_id.to_string();
        let memo = memo.to_string();
        self.run(move |conn| {
            let updated = conn
                .execute("UPDATE accounts SET memo = ?1 WHERE id = ?2", params![memo, account_id])
                .map_err(ledger_err("update memo"))?;
            if updated == 0 {
                return Err(MsgBoxError::Ledger(format!("unknown account {account_id}")));
            }
            Ok(())
        })
        .await
    }

    async fn account_public_key(&self, account_id: &str) -> Result<LedgerKey, MsgBoxError> {
        let account_id = account_id.to_string();
        self.run(move |conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT key_family, public_key FROM accounts WHERE id = ?1",
                    params![account_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(ledger_err("read account key"))?;
            let (family, public_key) =
                row.ok_or_else(|| MsgBoxError::Ledger(format!("unknown account {account_id}")))?;

            Ok(LedgerKey {
                family: family.parse::<KeyFamily>()?,
                public_key: hex::decode(&public_key)
                    .map_err(|e| MsgBoxError::InvalidData(format!("stored account key is not hex: {e}")))?,
            })
        })
        .await
    }
}

#[async_trait(?Send)]
impl LogQuery for SqliteLedger {
    async fn fetch_entries(
        &self,
        log_id: &str,
        after_sequence: u64,
        limit: usize,
        order: Order,
    ) -> Result<Vec<RawEntry>, MsgBoxError> {
        let log_id = log_id.to_string();
        let direction = match order {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        };
        self.run(move |conn| {
            let sql = format!(
                "SELECT {ENTRY_COLUMNS} FROM entries WHERE log_id = ?1 AND sequence > ?2 ORDER BY sequence {direction} LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql).map_err(query_err("prepare"))?;
            let entries = stmt
                .query_map(params![log_id, after_sequence as i64, limit as i64], row_to_entry)
                .map_err(query_err("query entries"))?
                .collect::<Result<Vec<RawEntry>, _>>()
                .map_err(query_err("collect entries"))?;
            debug!("Fetched {} entries from log {log_id} after {after_sequence}", entries.len());
            Ok(entries)
        })
        .await
    }

    async fn fetch_entry(&self, log_id: &str, sequence: u64) -> Result<Option<RawEntry>, MsgBoxError> {
        let log_id = log_id.to_string();
        self.run(move |conn| {
            let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE log_id = ?1 AND sequence = ?2");
            conn.query_row(&sql, params![log_id, sequence as i64], row_to_entry)
                .optional()
                .map_err(query_err("query entry"))
        })
        .await
    }

    async fn latest_sequence(&self, log_id: &str) -> Result<Option<u64>, MsgBoxError> {
        let log_id = log_id.to_string();
        self.run(move |conn| {
            let latest: Option<i64> = conn
                .query_row(
                    "SELECT MAX(sequence) FROM entries WHERE log_id = ?1",
                    params![log_id],
                    |row| row.get(0),
                )
                .map_err(query_err("query latest sequence"))?;
            Ok(latest.map(|s| s as u64))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgbox_core::protocol::reassemble_chunks;

    #[tokio::test]
    async fn test_accounts_and_memos() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let id = ledger.register_account(KeyFamily::Ed25519, &[7u8; 32]).await.unwrap();
        assert_eq!(id, "0.0.1001");

        assert_eq!(ledger.account_memo(&id).await.unwrap(), "");
        ledger.update_account_memo(&id, "[MSGBOX:0.0.1002]").await.unwrap();
        assert_eq!(ledger.account_memo(&id).await.unwrap(), "[MSGBOX:0.0.1002]");

        let key = ledger.account_public_key(&id).await.unwrap();
        assert_eq!(key.family, KeyFamily::Ed25519);
        assert_eq!(key.public_key, vec![7u8; 32]);

        assert!(ledger.account_memo("0.0.9999").await.is_err());
        assert!(ledger.update_account_memo("0.0.9999", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_append_and_query() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let log = ledger.create_log("msgbox:v1").await.unwrap();
        assert_eq!(ledger.latest_sequence(&log).await.unwrap(), None);

        for i in 0..5u8 {
            let seq = ledger.append_entry(&log, &[i]).await.unwrap();
            assert_eq!(seq, i as u64 + 1);
        }
        assert_eq!(ledger.latest_sequence(&log).await.unwrap(), Some(5));

        let page = ledger.fetch_entries(&log, 2, 2, Order::Asc).await.unwrap();
        let sequences: Vec<u64> = page.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequences, vec![3, 4]);

        let desc = ledger.fetch_entries(&log, 0, 2, Order::Desc).await.unwrap();
        assert_eq!(desc[0].sequence_number, 5);

        let entry = ledger.fetch_entry(&log, 4).await.unwrap().unwrap();
        assert_eq!(BASE64.decode(entry.message).unwrap(), vec![3u8]);
        assert!(ledger.fetch_entry(&log, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_to_unknown_log() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        assert!(ledger.append_entry("0.0.4242", b"hi").await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_append_is_chunked() {
        let ledger = SqliteLedger::open_in_memory().unwrap().with_chunk_size(10);
        let log = ledger.create_log("msgbox:v1").await.unwrap();
        ledger.append_entry(&log, b"first").await.unwrap();

        let payload: Vec<u8> = (0..25u8).collect();
        let seq = ledger.append_entry(&log, &payload).await.unwrap();
        assert_eq!(seq, 2);
        assert_eq!(ledger.latest_sequence(&log).await.unwrap(), Some(4));

        let raw = ledger.fetch_entries(&log, 0, 100, Order::Asc).await.unwrap();
        let info = raw[1].chunk_info.clone().unwrap();
        assert_eq!((info.number, info.total), (1, 3));

        let assembled = reassemble_chunks(raw);
        assert_eq!(assembled.len(), 2);
        assert_eq!(assembled[1].sequence_number, 2);
        assert_eq!(assembled[1].last_sequence_number, 4);
        assert_eq!(assembled[1].payload().unwrap(), payload);
    }

    #[tokio::test]
    async fn test_reopen_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let log = {
            let ledger = SqliteLedger::open(&path).unwrap();
            let log = ledger.create_log("msgbox:v1").await.unwrap();
            ledger.append_entry(&log, b"persisted").await.unwrap();
            log
        };
        let ledger = SqliteLedger::open(&path).unwrap();
        assert_eq!(ledger.latest_sequence(&log).await.unwrap(), Some(1));
        let next = ledger.create_log("msgbox:v1").await.unwrap();
        assert_ne!(next, log);
    }
}
