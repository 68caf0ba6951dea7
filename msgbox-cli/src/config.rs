use std::env;
use std::path::PathBuf;

use msgbox_core::crypto::EncryptionType;

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the ledger database and key files.
    pub data_dir: PathBuf,
    /// Seconds between polls in `listen`.
    pub poll_interval_secs: u64,
    /// Create a replacement box without asking.
    pub auto_create: bool,
    /// Scheme used when `setup` is not given `--encryption`.
    pub encryption: EncryptionType,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `MSGBOX_DATA_DIR` (optional, default `.msgbox`)
    /// - `MSGBOX_POLL_INTERVAL_SECS` (optional, default 3)
    /// - `MSGBOX_AUTO_CREATE` (optional, default false)
    /// - `MSGBOX_ENCRYPTION` (optional, `rsa` or `ecies`, default `rsa`)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("MSGBOX_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".msgbox"));

        let poll_interval_secs = lookup("MSGBOX_POLL_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(3);

        let auto_create = lookup("MSGBOX_AUTO_CREATE")
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let encryption = lookup("MSGBOX_ENCRYPTION")
            .and_then(|s| s.parse::<EncryptionType>().ok())
            .unwrap_or(EncryptionType::Rsa);

        Self {
            data_dir,
            poll_interval_secs,
            auto_create,
            encryption,
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.db")
    }
}
