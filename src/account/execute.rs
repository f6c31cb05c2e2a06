//! Owner-authorized execution against the ledger

use super::balance::Ledger;
use super::types::{Account, Address, Identity};
use crate::error::WalletError;

impl Account {
    /// Current balance as reported by the ledger.
    pub fn balance(&self, ledger: &dyn Ledger) -> u64 {
        ledger.balance_of(&self.address)
    }

    /// Send `value` to `target`, delivering `data` as the call payload.
    pub fn execute(
        &self,
        caller: &Identity,
        target: Address,
        value: u64,
        data: &[u8],
        ledger: &mut dyn Ledger,
    ) -> Result<(), WalletError> {
        if *caller != self.owner {
            return Err(WalletError::Unauthorized);
        }
        let available = ledger.balance_of(&self.address);
        if value > available {
            return Err(WalletError::InsufficientBalance {
                requested: value,
                available,
            });
        }

        ledger.transfer(&self.address, &target, value, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::balance::{InMemoryLedger, LedgerError};
    use crate::account::types::{RecoveryPolicy, Salt};

    const OWNER: Identity = Identity([1; 32]);

    fn funded(amount: u64) -> (Account, InMemoryLedger) {
        let account = Account::new(Address([9; 20]), OWNER, Salt::from_label("0"), RecoveryPolicy::default(), 0);
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&account.address, amount).unwrap();
        (account, ledger)
    }

    #[test]
    fn test_execute_moves_exact_value() {
        let (account, mut ledger) = funded(1_000);
        let target = Address([2; 20]);

        account.execute(&OWNER, target, 500, &[], &mut ledger).unwrap();
        assert_eq!(account.balance(&ledger), 500);
        assert_eq!(ledger.balance_of(&target), 500);
    }

    #[test]
    fn test_execute_rejects_non_owner() {
        let (account, mut ledger) = funded(1_000);
        let result = account.execute(&Identity([2; 32]), Address([2; 20]), 1, &[], &mut ledger);
        assert_eq!(result, Err(WalletError::Unauthorized));
        assert_eq!(account.balance(&ledger), 1_000);
    }

    #[test]
    fn test_execute_rejects_overdraw() {
        let (account, mut ledger) = funded(10);
        let result = account.execute(&OWNER, Address([2; 20]), 11, &[], &mut ledger);
        assert_eq!(
            result,
            Err(WalletError::InsufficientBalance {
                requested: 11,
                available: 10
            })
        );
        assert!(ledger.calls().is_empty());
    }

    #[test]
    fn test_reverting_target_surfaces_ledger_error() {
        let (account, mut ledger) = funded(10);
        let target = Address([3; 20]);
        ledger.reject_calls_to(target);

        let result = account.execute(&OWNER, target, 5, b"call", &mut ledger);
        assert_eq!(result, Err(WalletError::Ledger(LedgerError::CallRejected(target))));
        assert_eq!(account.balance(&ledger), 10);
    }
}
