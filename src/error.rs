use thiserror::Error;

use crate::account::types::{Address, Identity};
use crate::account::balance::LedgerError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Unauthorized: caller lacks the required role")]
    Unauthorized,
    #[error("Already a guardian: {0}")]
    AlreadyGuardian(Identity),
    #[error("Not a guardian: {0}")]
    NotAGuardian(Identity),
    #[error("Owner cannot be its own guardian: {0}")]
    OwnerCannotBeGuardian(Identity),
    #[error("Recovery already active")]
    RecoveryAlreadyActive,
    #[error("No active recovery")]
    NoActiveRecovery,
    #[error("Time lock not elapsed: recovery can be confirmed at {ready_at}, now {now}")]
    TimeLockNotElapsed { ready_at: u64, now: u64 },
    #[error("Recovery expired at {expired_at}")]
    RecoveryExpired { expired_at: u64 },
    #[error("Guardian {0} already approved this recovery")]
    AlreadyApproved(Identity),
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },
    #[error("Account not found: {0}")]
    AccountNotFound(Address),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl WalletError {
    /// Rejections caused by the caller's role rather than account state.
    pub fn is_authorization(&self) -> bool {
        matches!(self, WalletError::Unauthorized)
    }
}
