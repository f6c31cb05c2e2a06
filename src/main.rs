use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use creso_wallet::cli::keys::handle_keys_command;
use creso_wallet::cli::wallet::handle_wallet_command;
use creso_wallet::cli::{Cli, Commands};
use creso_wallet::clock::SystemClock;
use creso_wallet::config::WalletConfig;
use creso_wallet::crypto::Ed25519Verifier;
use creso_wallet::error::WalletError;
use creso_wallet::factory::Factory;
use creso_wallet::storage::Storage;

fn run(cli: Cli) -> Result<(), WalletError> {
    let command = match cli.command {
        Commands::Keys { cmd } => return handle_keys_command(cmd, &cli.keys_dir),
        command => command,
    };

    let config = WalletConfig::load_or_default(&cli.config)?;
    let storage = Storage::open(&config.factory.db_path)?;
    let mut factory = Factory::from_config(&config, SystemClock, Ed25519Verifier)?.with_storage(storage)?;

    let result = handle_wallet_command(command, &mut factory, &cli.keys_dir);
    factory.persist()?;
    result
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise fall back to the level in the config file, if readable.
    let level = std::fs::read_to_string(&cli.config)
        .ok()
        .and_then(|s| toml::from_str::<WalletConfig>(&s).ok())
        .map(|c| c.logging.log_level)
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
