//! CLI command implementations (account, setup, send, listen, history).

pub mod account;
pub mod setup;
pub mod send;
pub mod listen;
pub mod history;

use sha2::{Digest, Sha256};

use msgbox_core::crypto::{EncryptionType, KeyPair};
use msgbox_core::protocol::{
    AutoCreate, BoxReady, MessageBody, MessageBoxClient, ReceivedMessage,
};

use crate::config::Config;
use crate::storage::{KeyFiles, SqliteLedger};

pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Open the local ledger, creating the data directory on first use.
pub fn open_ledger(config: &Config) -> CommandResult<SqliteLedger> {
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| format!("failed to create {}: {e}", config.data_dir.display()))?;
    Ok(SqliteLedger::open(&config.ledger_path())?)
}

/// Short SHA-256 fingerprint for display.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..8])
}

/// Resolve an account's existing box without ever creating one.
///
/// A stored RSA key selects RSA; otherwise the ECIES key is derived from the
/// signing key.
pub async fn open_box(
    client: &MessageBoxClient<'_>,
    keys: &KeyFiles,
    account_id: &str,
) -> CommandResult<BoxReady> {
    let signer = keys.load_signer(account_id).await?;
    let stored = keys.load_box_key(account_id).await?;
    let encryption = match stored {
        Some(KeyPair::Rsa(_)) => EncryptionType::Rsa,
        _ => EncryptionType::Ecies,
    };
    client
        .setup(&signer, encryption, stored, &AutoCreate(false))
        .await
        .map_err(|e| format!("{e} (run `msgbox setup --account {account_id}` first)").into())
}

pub fn format_message(message: &ReceivedMessage) -> String {
    let sequence = if message.last_sequence_number > message.sequence_number {
        format!("#{}-{}", message.sequence_number, message.last_sequence_number)
    } else {
        format!("#{}", message.sequence_number)
    };
    let body = match &message.body {
        MessageBody::Decrypted { text, format } => format!("[{format}] {text}"),
        MessageBody::Structured(json) => format!("[data] {json}"),
        MessageBody::PlainText(text) => format!("[plain] {text}"),
        MessageBody::Undecryptable { reason } => format!("[undecryptable] {reason}"),
    };
    format!("{sequence} @ {}  {body}", message.consensus_timestamp)
}
