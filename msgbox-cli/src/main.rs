mod commands;
mod config;
mod storage;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use msgbox_core::crypto::EncryptionType;
use msgbox_core::keys::KeyFamily;
use msgbox_core::protocol::WireFormat;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "msgbox", about = "End-to-end encrypted message boxes on a ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage ledger accounts
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Create or verify the message box for an account
    Setup {
        /// Account that owns the box
        #[arg(long)]
        account: String,

        /// Box encryption scheme (rsa or ecies). Defaults to MSGBOX_ENCRYPTION.
        #[arg(long)]
        encryption: Option<EncryptionType>,

        /// Create a new box without asking when the existing one is unusable
        #[arg(long, short)]
        yes: bool,
    },

    /// Encrypt and send a message to an account's box
    Send {
        /// Recipient account id
        #[arg(long)]
        to: String,

        /// Message text
        #[arg(long)]
        message: String,

        /// Wire encoding (json or cbor)
        #[arg(long, default_value = "json")]
        format: WireFormat,
    },

    /// Poll an account's box and print new messages until Ctrl-C
    Listen {
        #[arg(long)]
        account: String,

        /// Seconds between polls. Defaults to MSGBOX_POLL_INTERVAL_SECS.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Print messages in a sequence range of an account's box
    History {
        #[arg(long)]
        account: String,

        /// First sequence number (inclusive)
        #[arg(long, default_value_t = 1)]
        start: u64,

        /// Last sequence number (inclusive). Open-ended if omitted.
        #[arg(long)]
        end: Option<u64>,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create an account with a fresh signing key
    New {
        /// Signing key family (ed25519 or secp256k1)
        #[arg(long, default_value = "secp256k1")]
        family: KeyFamily,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing (controlled by RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load .env file if present (non-fatal if missing).
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("no .env file loaded: {e}");
    }

    let config = Config::from_env();
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        poll_interval_secs = config.poll_interval_secs,
        "configuration loaded"
    );

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Account {
            command: AccountCommands::New { family },
        } => commands::account::run_account_new(&config, family).await,
        Commands::Setup {
            account,
            encryption,
            yes,
        } => commands::setup::run_setup(&config, &account, encryption, yes).await,
        Commands::Send {
            to,
            message,
            format,
        } => commands::send::run_send(&config, &to, &message, format).await,
        Commands::Listen { account, interval } => {
            commands::listen::run_listen(&config, &account, interval).await
        }
        Commands::History {
            account,
            start,
            end,
        } => commands::history::run_history(&config, &account, start, end).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
