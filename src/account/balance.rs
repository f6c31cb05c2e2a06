//! Ledger collaborator: balances, code presence and value transfers.
//!
//! Settlement itself lives outside this crate. Accounts only see the narrow
//! [`Ledger`] trait; [`InMemoryLedger`] is the bundled fake used by tests and the CLI.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::types::Address;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },
    #[error("balance overflow")]
    Overflow,
    #[error("call to {0} rejected")]
    CallRejected(Address),
}

/// A call delivered to a target alongside a transfer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CallRecord {
    pub from: Address,
    pub to: Address,
    pub value: u64,
    pub data: Vec<u8>,
}

pub trait Ledger {
    fn balance_of(&self, address: &Address) -> u64;

    fn code_exists_at(&self, address: &Address) -> bool;

    /// Mark an address as holding account code.
    fn install_code(&mut self, address: &Address);

    /// Incoming value from outside the account system.
    fn credit(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`, delivering `data` as the call payload.
    /// Must be all-or-nothing.
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        data: &[u8],
    ) -> Result<(), LedgerError>;
}

/// Balance store for all addresses
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<Address, u64>,
    code: HashSet<Address>,
    calls: Vec<CallRecord>,
    #[serde(default)]
    rejecting: HashSet<Address>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls delivered so far, oldest first.
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Make every future call into `target` fail, as a reverting contract would.
    pub fn reject_calls_to(&mut self, target: Address) {
        self.rejecting.insert(target);
    }

    fn debit(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let current = self.balance_of(address);
        if current < amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: current,
            });
        }
        let new_balance = current - amount;
        if new_balance == 0 {
            self.balances.remove(address);
        } else {
            self.balances.insert(*address, new_balance);
        }
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn code_exists_at(&self, address: &Address) -> bool {
        self.code.contains(address)
    }

    fn install_code(&mut self, address: &Address) {
        self.code.insert(*address);
    }

    fn credit(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let current = self.balance_of(address);
        let new_balance = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.balances.insert(*address, new_balance);
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        data: &[u8],
    ) -> Result<(), LedgerError> {
        if self.rejecting.contains(to) {
            return Err(LedgerError::CallRejected(*to));
        }
        // Check the credit side first so a failure leaves both balances untouched.
        if from != to {
            self.balance_of(to)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        self.calls.push(CallRecord {
            from: *from,
            to: *to,
            value: amount,
            data: data.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    #[test]
    fn test_balance_operations() {
        let mut ledger = InMemoryLedger::new();

        ledger.credit(&addr(1), 1000).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 1000);

        ledger.transfer(&addr(1), &addr(2), 300, &[]).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 700);
        assert_eq!(ledger.balance_of(&addr(2)), 300);

        let err = ledger.transfer(&addr(1), &addr(2), 1000, &[]).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                requested: 1000,
                available: 700
            }
        );
        assert_eq!(ledger.balance_of(&addr(1)) + ledger.balance_of(&addr(2)), 1000);
    }

    #[test]
    fn test_transfer_records_call_data() {
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&addr(1), 10).unwrap();
        ledger.transfer(&addr(1), &addr(2), 0, b"ping").unwrap();

        assert_eq!(ledger.calls().len(), 1);
        assert_eq!(ledger.calls()[0].data, b"ping".to_vec());
        assert_eq!(ledger.balance_of(&addr(1)), 10);
    }

    #[test]
    fn test_rejected_call_moves_nothing() {
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&addr(1), 10).unwrap();
        ledger.reject_calls_to(addr(2));

        assert_eq!(
            ledger.transfer(&addr(1), &addr(2), 5, &[]),
            Err(LedgerError::CallRejected(addr(2)))
        );
        assert_eq!(ledger.balance_of(&addr(1)), 10);
        assert!(ledger.calls().is_empty());
    }

    #[test]
    fn test_credit_overflow() {
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&addr(1), u64::MAX).unwrap();
        assert_eq!(ledger.credit(&addr(1), 1), Err(LedgerError::Overflow));
        assert_eq!(ledger.balance_of(&addr(1)), u64::MAX);
    }

    #[test]
    fn test_code_presence() {
        let mut ledger = InMemoryLedger::new();
        assert!(!ledger.code_exists_at(&addr(3)));
        ledger.install_code(&addr(3));
        assert!(ledger.code_exists_at(&addr(3)));
    }
}
