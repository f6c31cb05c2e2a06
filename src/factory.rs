//! Account factory: deterministic addressing, idempotent creation and the
//! single dispatch point for operations on live accounts.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::account::auth::{authenticate, Caller, Operation};
use crate::account::balance::{InMemoryLedger, Ledger};
use crate::account::types::{Account, Address, Identity, RecoveryPolicy, Salt};
use crate::account::AddressDeriver;
use crate::clock::Clock;
use crate::config::WalletConfig;
use crate::crypto::SignatureVerifier;
use crate::error::WalletError;
use crate::events::{EventLog, WalletEvent};
use crate::storage::Storage;

pub struct Factory<L: Ledger = InMemoryLedger> {
    deriver: AddressDeriver,
    policy: RecoveryPolicy,
    accounts: HashMap<Address, Account>,
    ledger: L,
    events: EventLog,
    clock: Box<dyn Clock>,
    verifier: Box<dyn SignatureVerifier + Send + Sync>,
    storage: Option<Storage>,
}

impl Factory<InMemoryLedger> {
    /// Factory over a fresh in-memory ledger, configured from `config`.
    pub fn from_config(
        config: &WalletConfig,
        clock: impl Clock + 'static,
        verifier: impl SignatureVerifier + Send + Sync + 'static,
    ) -> Result<Self, WalletError> {
        config.validate()?;
        Ok(Self::new(
            AddressDeriver::new(config.domain()?),
            config.recovery_policy(),
            InMemoryLedger::new(),
            clock,
            verifier,
        ))
    }
}

impl<L: Ledger + Clone + Serialize + DeserializeOwned> Factory<L> {
    pub fn new(
        deriver: AddressDeriver,
        policy: RecoveryPolicy,
        ledger: L,
        clock: impl Clock + 'static,
        verifier: impl SignatureVerifier + Send + Sync + 'static,
    ) -> Self {
        Self {
            deriver,
            policy,
            accounts: HashMap::new(),
            ledger,
            events: EventLog::new(),
            clock: Box::new(clock),
            verifier: Box::new(verifier),
            storage: None,
        }
    }

    // --- Addressing & creation ---

    pub fn get_address(&self, owner: &Identity, salt: &Salt) -> Address {
        self.deriver.derive(owner, salt)
    }

    /// Create the account for (owner, salt), or return the one already there untouched.
    pub fn create_account(&mut self, owner: Identity, salt: Salt) -> Result<&Account, WalletError> {
        let address = self.deriver.derive(&owner, &salt);

        if self.accounts.contains_key(&address) {
            debug!("Account {} already exists; returning it unchanged", address);
        } else {
            let account = Account::new(address, owner, salt, self.policy, self.clock.now());
            let mut ledger = self.ledger.clone();
            ledger.install_code(&address);
            self.commit(account, Some(ledger), vec![WalletEvent::AccountCreated { owner }])?;
            info!("Created account {} for owner {}", address, owner);
        }

        self.accounts
            .get(&address)
            .ok_or(WalletError::AccountNotFound(address))
    }

    // --- Reads ---

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> + '_ {
        self.accounts.values()
    }

    /// True once the account's code is present on the ledger.
    pub fn is_deployed(&self, address: &Address) -> bool {
        self.ledger.code_exists_at(address)
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.ledger.balance_of(address)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access. Changes made here reach storage with the next commit or
    /// [`Factory::persist`].
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Incoming value; counterfactual addresses can be funded before creation.
    pub fn deposit(&mut self, address: &Address, amount: u64) -> Result<(), WalletError> {
        let mut ledger = self.ledger.clone();
        ledger.credit(address, amount)?;
        if let Some(storage) = &self.storage {
            storage.save_ledger(&ledger)?;
            storage.flush()?;
        }
        self.ledger = ledger;
        info!("Deposited {} to {}", amount, address);
        Ok(())
    }

    // --- Operations ---

    /// Authenticate `caller`, apply `operation` to staged copies of the account and ledger
    /// and commit them only if it succeeds.
    pub fn submit(
        &mut self,
        address: &Address,
        caller: &Caller,
        operation: Operation,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        let current = self
            .accounts
            .get(address)
            .ok_or(WalletError::AccountNotFound(*address))?;

        let principal = authenticate(current, caller, &operation, self.verifier.as_ref())
            .inspect_err(|_| {
                warn!(
                    "Rejected {} on {}: signature from {} did not verify",
                    operation.name(),
                    address,
                    caller.claimed()
                )
            })?;

        let now = self.clock.now();
        let mut staged = current.clone();
        let mut staged_ledger = None;
        let result = match &operation {
            Operation::Execute {
                target,
                value,
                data,
            } => {
                let mut ledger = self.ledger.clone();
                let result = staged
                    .execute(&principal, *target, *value, data, &mut ledger)
                    .map(|()| Vec::new());
                staged_ledger = Some(ledger);
                result
            }
            Operation::AddGuardian(guardian) => staged.add_guardian(&principal, *guardian),
            Operation::RemoveGuardian(guardian) => staged.remove_guardian(&principal, *guardian),
            Operation::StartRecovery { proposed_owner } => {
                staged.start_recovery(&principal, *proposed_owner, now)
            }
            Operation::ConfirmRecovery => staged.confirm_recovery(&principal, now),
            Operation::CancelRecovery => staged.cancel_recovery(&principal),
        };

        let events = match result {
            Ok(events) => events,
            Err(e) => {
                if e.is_authorization() {
                    warn!("Rejected {} on {} by {}: {}", operation.name(), address, principal, e);
                } else {
                    debug!("{} on {} by {} failed: {}", operation.name(), address, principal, e);
                }
                return Err(e);
            }
        };

        if caller.is_signed() {
            staged.nonce += 1;
        }
        self.commit(staged, staged_ledger, events.clone())?;

        for event in &events {
            info!("{} on {}: {}", operation.name(), address, event);
        }
        Ok(events)
    }

    pub fn execute(
        &mut self,
        address: &Address,
        caller: &Caller,
        target: Address,
        value: u64,
        data: Vec<u8>,
    ) -> Result<(), WalletError> {
        self.submit(address, caller, Operation::Execute { target, value, data })
            .map(|_| ())
    }

    pub fn add_guardian(
        &mut self,
        address: &Address,
        caller: &Caller,
        guardian: Identity,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.submit(address, caller, Operation::AddGuardian(guardian))
    }

    pub fn remove_guardian(
        &mut self,
        address: &Address,
        caller: &Caller,
        guardian: Identity,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.submit(address, caller, Operation::RemoveGuardian(guardian))
    }

    pub fn start_recovery(
        &mut self,
        address: &Address,
        caller: &Caller,
        proposed_owner: Identity,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.submit(address, caller, Operation::StartRecovery { proposed_owner })
    }

    pub fn confirm_recovery(
        &mut self,
        address: &Address,
        caller: &Caller,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.submit(address, caller, Operation::ConfirmRecovery)
    }

    pub fn cancel_recovery(
        &mut self,
        address: &Address,
        caller: &Caller,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.submit(address, caller, Operation::CancelRecovery)
    }

    /// Write the staged state to storage first; memory changes only once that succeeds.
    fn commit(
        &mut self,
        account: Account,
        ledger: Option<L>,
        events: Vec<WalletEvent>,
    ) -> Result<(), WalletError> {
        let address = account.address;
        let records = self.events.pending(address, events);
        if let Some(storage) = &self.storage {
            storage.commit(&account, ledger.as_ref().unwrap_or(&self.ledger), &records)?;
        }
        self.accounts.insert(address, account);
        if let Some(ledger) = ledger {
            self.ledger = ledger;
        }
        self.events.extend(records);
        Ok(())
    }

    /// Attach persistent storage, loading any accounts, ledger state and events it holds.
    pub fn with_storage(mut self, storage: Storage) -> Result<Self, WalletError> {
        for account in storage.load_accounts()? {
            self.accounts.insert(account.address, account);
        }
        if let Some(ledger) = storage.load_ledger()? {
            self.ledger = ledger;
        }
        self.events = storage.load_events()?;
        info!("Loaded {} accounts from storage", self.accounts.len());
        self.storage = Some(storage);
        Ok(self)
    }

    /// Write everything, including the ledger snapshot, and flush.
    pub fn persist(&self) -> Result<(), WalletError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        for account in self.accounts.values() {
            storage.save_account(account)?;
        }
        storage.save_ledger(&self.ledger)?;
        storage.save_events(self.events.records())?;
        storage.flush()
    }
}
