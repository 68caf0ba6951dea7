use std::io::Write;

use tracing::info;

use msgbox_core::crypto::{CryptoError, EncryptionType};
use msgbox_core::error::MsgBoxError;
use msgbox_core::protocol::{AutoCreate, BoxProblem, BoxReady, CreateDecision, MessageBoxClient};
use msgbox_core::traits::random::OsRandom;

use crate::commands::{fingerprint, open_ledger, CommandResult};
use crate::config::Config;
use crate::storage::KeyFiles;

/// Make sure the account has a usable message box.
pub async fn run_setup(
    config: &Config,
    account_id: &str,
    encryption: Option<EncryptionType>,
    skip_confirm: bool,
) -> CommandResult {
    let encryption = encryption.unwrap_or(config.encryption);
    let ready = setup_box(config, account_id, encryption, skip_confirm || config.auto_create).await?;

    let published = ready.key_pair.public_key().to_published()?;
    if ready.created {
        println!("Message box created: {}", ready.box_id);
    } else {
        println!("Message box already set up: {}", ready.box_id);
    }
    println!("Encryption: {}", ready.key_pair.encryption_type());
    println!("Key fingerprint: {}", fingerprint(published.as_bytes()));
    Ok(())
}

pub async fn setup_box(
    config: &Config,
    account_id: &str,
    encryption: EncryptionType,
    auto_create: bool,
) -> CommandResult<BoxReady> {
    let ledger = open_ledger(config)?;
    let keys = KeyFiles::new(&config.data_dir);
    let signer = keys.load_signer(account_id).await?;
    let stored = keys.load_box_key(account_id).await?;

    let client = MessageBoxClient::new(&ledger, &ledger, &OsRandom);
    let decision: &dyn CreateDecision = if auto_create {
        &AutoCreate(true)
    } else {
        &prompt_create
    };

    let ready = match client.setup(&signer, encryption, stored, decision).await {
        Ok(ready) => ready,
        Err(MsgBoxError::Crypto(CryptoError::UnsupportedCurve(family))) => {
            return Err(format!(
                "{family} account keys cannot derive an ECIES box key; re-run with --encryption rsa"
            )
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    if ready.created && keys.save_box_key(account_id, &ready.key_pair).await? {
        info!(account = %account_id, "Stored RSA box key");
    }
    Ok(ready)
}

fn prompt_create(problem: &BoxProblem) -> bool {
    eprint!("{problem}. Create a new message box? [y/N] ");
    if std::io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("y")
}
