//! Account System Module
//!
//! Custody accounts with:
//! - Deterministic, pre-computable addresses
//! - Owner-authorized execution against the ledger
//! - Guardian-governed, time-locked ownership recovery

pub mod types;
pub mod address;
pub mod balance;
pub mod auth;
pub mod execute;
pub mod recovery;

pub use types::{Account, Address, Identity, PendingRecovery, RecoveryPolicy, RecoveryState, Salt};
pub use address::AddressDeriver;
pub use balance::{InMemoryLedger, Ledger, LedgerError};
pub use auth::{signing_payload, Caller, Operation};
