use msgbox_core::protocol::{MessageBoxClient, ReceivedMessage};
use msgbox_core::traits::random::OsRandom;

use crate::commands::{format_message, open_box, open_ledger, CommandResult};
use crate::config::Config;
use crate::storage::KeyFiles;

/// Print the messages in a sequence range of the account's box.
pub async fn run_history(config: &Config, account_id: &str, start: u64, end: Option<u64>) -> CommandResult {
    let messages = load_history(config, account_id, start, end).await?;
    if messages.is_empty() {
        println!("No messages in range.");
    }
    for message in &messages {
        println!("{}", format_message(message));
    }
    Ok(())
}

pub async fn load_history(
    config: &Config,
    account_id: &str,
    start: u64,
    end: Option<u64>,
) -> CommandResult<Vec<ReceivedMessage>> {
    let ledger = open_ledger(config)?;
    let keys = KeyFiles::new(&config.data_dir);
    let client = MessageBoxClient::new(&ledger, &ledger, &OsRandom);
    let ready = open_box(&client, &keys, account_id).await?;
    Ok(client
        .range_query(&ready.box_id, start, end, &ready.key_pair)
        .await?)
}
