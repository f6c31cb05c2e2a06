pub mod keys;
pub mod wallet;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "creso")]
#[command(about = "Creso smart wallet factory CLI", long_about = None)]
pub struct Cli {
    /// Path to the TOML config (created with defaults if missing)
    #[arg(long, global = true, default_value = "creso.toml")]
    pub config: String,

    /// Directory holding signing key files
    #[arg(long, global = true, default_value = "keys")]
    pub keys_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Signing key management
    Keys {
        #[command(subcommand)]
        cmd: keys::KeysCommands,
    },
    /// Compute the address an account will have, without creating it
    Address {
        /// Owner identity (hex) or key name
        #[arg(long)]
        owner: String,
        #[arg(long)]
        salt: String,
    },
    /// Create the account for (owner, salt) if it does not exist yet
    Create {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        salt: String,
    },
    /// Send value into an account (simulated incoming transfer)
    Fund {
        #[arg(long)]
        account: String,
        #[arg(long)]
        amount: u64,
    },
    /// Owner-signed transfer out of an account
    Execute {
        #[arg(long)]
        key: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
        /// Hex call data
        #[arg(long)]
        data: Option<String>,
    },
    /// Guardian set management
    Guardian {
        #[command(subcommand)]
        cmd: wallet::GuardianCommands,
    },
    /// Social recovery
    Recovery {
        #[command(subcommand)]
        cmd: wallet::RecoveryCommands,
    },
    /// Show an account's owner, guardians, recovery state and balance
    Show {
        #[arg(long)]
        account: String,
    },
    /// List recorded events
    Events {
        #[arg(long)]
        account: Option<String>,
    },
}
