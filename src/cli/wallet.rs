use clap::Subcommand;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

use super::keys::{load_key, resolve_identity};
use super::Commands;
use crate::account::balance::Ledger;
use crate::account::types::{Address, RecoveryState, Salt};
use crate::account::{signing_payload, Caller, Operation};
use crate::error::WalletError;
use crate::factory::Factory;

#[derive(Subcommand, Debug, Clone)]
pub enum GuardianCommands {
    Add {
        #[arg(long)]
        key: String,
        #[arg(long)]
        account: String,
        /// Guardian identity (hex) or key name
        #[arg(long)]
        guardian: String,
    },
    Remove {
        #[arg(long)]
        key: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        guardian: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecoveryCommands {
    /// Propose a new owner (guardian only)
    Start {
        #[arg(long)]
        key: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        new_owner: String,
    },
    /// Approve the pending recovery once the time lock has elapsed (guardian only)
    Confirm {
        #[arg(long)]
        key: String,
        #[arg(long)]
        account: String,
    },
    /// Abort the pending recovery (owner only)
    Cancel {
        #[arg(long)]
        key: String,
        #[arg(long)]
        account: String,
    },
}

fn parse_address(value: &str) -> Result<Address, WalletError> {
    value.parse().map_err(WalletError::Config)
}

/// Sign `operation` with the named key against the account's current nonce and submit it.
fn submit_signed<L: Ledger + Clone + Serialize + DeserializeOwned>(
    factory: &mut Factory<L>,
    keys_dir: &Path,
    key: &str,
    account: &str,
    operation: Operation,
) -> Result<(), WalletError> {
    let address = parse_address(account)?;
    let keypair = load_key(keys_dir, key)?;
    let nonce = factory
        .account(&address)
        .ok_or(WalletError::AccountNotFound(address))?
        .nonce();

    let caller = Caller::Signed {
        signer: keypair.identity(),
        signature: keypair.sign(&signing_payload(&address, nonce, &operation)),
    };
    let events = factory.submit(&address, &caller, operation)?;
    if events.is_empty() {
        println!("OK");
    }
    for event in events {
        println!("{}", event);
    }
    Ok(())
}

/// Run every command except `keys`, which needs no factory.
pub fn handle_wallet_command<L: Ledger + Clone + Serialize + DeserializeOwned>(
    cmd: Commands,
    factory: &mut Factory<L>,
    keys_dir: &Path,
) -> Result<(), WalletError> {
    match cmd {
        Commands::Keys { .. } => Ok(()),
        Commands::Address { owner, salt } => {
            let owner = resolve_identity(keys_dir, &owner)?;
            let address = factory.get_address(&owner, &Salt::from_label(&salt));
            println!("{}", address);
            Ok(())
        }
        Commands::Create { owner, salt } => {
            let owner = resolve_identity(keys_dir, &owner)?;
            let account = factory.create_account(owner, Salt::from_label(&salt))?;
            println!("Account: {}", account.address);
            println!("Owner:   {}", account.owner());
            Ok(())
        }
        Commands::Fund { account, amount } => {
            let address = parse_address(&account)?;
            factory.deposit(&address, amount)?;
            println!("Balance of {}: {}", address, factory.balance_of(&address));
            Ok(())
        }
        Commands::Execute {
            key,
            account,
            to,
            amount,
            data,
        } => {
            let target = parse_address(&to)
                .or_else(|_| resolve_identity(keys_dir, &to).map(|id| id.to_address()))?;
            let data = match data {
                Some(hex_data) => hex::decode(hex_data.trim_start_matches("0x"))
                    .map_err(|e| WalletError::Config(format!("--data: {}", e)))?,
                None => Vec::new(),
            };
            submit_signed(
                factory,
                keys_dir,
                &key,
                &account,
                Operation::Execute {
                    target,
                    value: amount,
                    data,
                },
            )
        }
        Commands::Guardian { cmd } => match cmd {
            GuardianCommands::Add {
                key,
                account,
                guardian,
            } => {
                let guardian = resolve_identity(keys_dir, &guardian)?;
                submit_signed(factory, keys_dir, &key, &account, Operation::AddGuardian(guardian))
            }
            GuardianCommands::Remove {
                key,
                account,
                guardian,
            } => {
                let guardian = resolve_identity(keys_dir, &guardian)?;
                submit_signed(factory, keys_dir, &key, &account, Operation::RemoveGuardian(guardian))
            }
        },
        Commands::Recovery { cmd } => match cmd {
            RecoveryCommands::Start {
                key,
                account,
                new_owner,
            } => {
                let proposed_owner = resolve_identity(keys_dir, &new_owner)?;
                submit_signed(
                    factory,
                    keys_dir,
                    &key,
                    &account,
                    Operation::StartRecovery { proposed_owner },
                )
            }
            RecoveryCommands::Confirm { key, account } => {
                submit_signed(factory, keys_dir, &key, &account, Operation::ConfirmRecovery)
            }
            RecoveryCommands::Cancel { key, account } => {
                submit_signed(factory, keys_dir, &key, &account, Operation::CancelRecovery)
            }
        },
        Commands::Show { account } => {
            let address = parse_address(&account)?;
            let acc = factory
                .account(&address)
                .ok_or(WalletError::AccountNotFound(address))?;
            println!("Account:   {}", acc.address);
            println!("Owner:     {}", acc.owner());
            println!("Balance:   {}", factory.balance_of(&address));
            println!("Nonce:     {}", acc.nonce());
            println!("Guardians: {}", acc.guardians().len());
            for g in acc.guardians() {
                println!("  - {}", g);
            }
            match acc.recovery() {
                RecoveryState::Idle => println!("Recovery:  idle"),
                RecoveryState::Pending(p) => {
                    println!("Recovery:  pending");
                    println!("  proposed owner: {}", p.proposed_owner);
                    println!("  initiator:      {}", p.initiator);
                    println!("  ready at:       {}", p.ready_at(&acc.policy));
                    println!("  approvals:      {}/{}", p.approvals.len(), acc.effective_quorum());
                }
            }
            Ok(())
        }
        Commands::Events { account } => {
            let filter = account.as_deref().map(parse_address).transpose()?;
            for record in factory.events().records() {
                if filter.is_some_and(|a| a != record.account) {
                    continue;
                }
                println!("#{} {} {}", record.seq, record.account, record.event);
            }
            Ok(())
        }
    }
}
