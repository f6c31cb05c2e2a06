pub mod account; // accounts, addressing, recovery
pub mod cli;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod events;
pub mod factory;
pub mod storage;

pub use account::{Account, Address, AddressDeriver, Caller, Identity, Operation, Salt};
pub use error::WalletError;
pub use events::WalletEvent;
pub use factory::Factory;
