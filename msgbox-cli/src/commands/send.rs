use msgbox_core::protocol::{MessageBoxClient, WireFormat};
use msgbox_core::traits::random::OsRandom;

use crate::commands::{open_ledger, CommandResult};
use crate::config::Config;

/// Encrypt a message to an account's box and publish it.
pub async fn run_send(config: &Config, to: &str, message: &str, format: WireFormat) -> CommandResult {
    let sequence = send_message(config, to, message, format).await?;
    println!("Sent to {to} (sequence {sequence}, {format})");
    Ok(())
}

pub async fn send_message(config: &Config, to: &str, message: &str, format: WireFormat) -> CommandResult<u64> {
    let ledger = open_ledger(config)?;
    let client = MessageBoxClient::new(&ledger, &ledger, &OsRandom);
    Ok(client.send(to, message, format).await?)
}
