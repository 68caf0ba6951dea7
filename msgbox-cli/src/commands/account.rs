use tracing::info;

use msgbox_core::crypto::signing::public_key_for;
use msgbox_core::keys::KeyFamily;
use msgbox_core::traits::random::{OsRandom, SecureRandom};

use crate::commands::{fingerprint, open_ledger, CommandResult};
use crate::config::Config;
use crate::storage::KeyFiles;

const KEYGEN_ATTEMPTS: usize = 8;

/// Create a ledger account with a fresh signing key and store the key.
pub async fn run_account_new(config: &Config, family: KeyFamily) -> CommandResult {
    let account_id = create_account(config, family).await?;
    println!("Account created: {account_id}");
    println!("Key family: {family}");
    Ok(())
}

pub async fn create_account(config: &Config, family: KeyFamily) -> CommandResult<String> {
    let (private_key, public_key) = generate_signing_key(family)?;

    let ledger = open_ledger(config)?;
    let account_id = ledger.register_account(family, &public_key).await?;
    KeyFiles::new(&config.data_dir)
        .save_signing_key(&account_id, family, &private_key)
        .await?;

    info!(
        account = %account_id,
        family = %family,
        fingerprint = %fingerprint(&public_key),
        "Account registered"
    );
    Ok(account_id)
}

/// Random 32-byte key. secp256k1 rejects a scalar outside the curve order,
/// so generation is retried.
fn generate_signing_key(family: KeyFamily) -> CommandResult<(Vec<u8>, Vec<u8>)> {
    for _ in 0..KEYGEN_ATTEMPTS {
        let private_key = OsRandom.random_bytes(32)?;
        if let Ok(public_key) = public_key_for(&private_key, family) {
            return Ok((private_key, public_key));
        }
    }
    Err("failed to generate a valid signing key".into())
}
