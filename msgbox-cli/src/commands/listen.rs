use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use msgbox_core::protocol::{MessageBoxClient, PollState};
use msgbox_core::traits::random::OsRandom;

use crate::commands::{format_message, open_box, open_ledger, CommandResult};
use crate::config::Config;
use crate::storage::KeyFiles;

/// Poll the account's box until Ctrl-C, printing new messages.
///
/// Ticks run one at a time; a failed poll is logged and retried on the next
/// tick.
pub async fn run_listen(config: &Config, account_id: &str, interval_secs: Option<u64>) -> CommandResult {
    let ledger = open_ledger(config)?;
    let keys = KeyFiles::new(&config.data_dir);
    let client = MessageBoxClient::new(&ledger, &ledger, &OsRandom);
    let ready = open_box(&client, &keys, account_id).await?;

    let period = Duration::from_secs(interval_secs.unwrap_or(config.poll_interval_secs).max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut state = PollState::new(&ready.box_id, ready.key_pair);

    println!("Listening on {} every {}s (Ctrl-C to stop)", ready.box_id, period.as_secs());
    let stop = tokio::signal::ctrl_c();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => {
                info!(box_id = %state.box_id(), cursor = state.cursor(), "Stopping listener");
                break;
            }
            _ = ticker.tick() => {
                match client.poll(&mut state).await {
                    Ok(messages) => {
                        for message in &messages {
                            println!("{}", format_message(message));
                        }
                    }
                    Err(e) => warn!(error = %e, box_id = %state.box_id(), "Poll failed"),
                }
            }
        }
    }
    Ok(())
}
