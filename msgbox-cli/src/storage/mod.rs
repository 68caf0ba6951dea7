//! Native storage: the SQLite-backed local ledger and per-account key files.

pub mod key_files;
pub mod sqlite_ledger;

pub use key_files::{KeyFileError, KeyFiles};
pub use sqlite_ledger::SqliteLedger;
