use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

use crate::account::types::Account;
use crate::error::WalletError;
use crate::events::{EventLog, EventRecord};

const ACCOUNT_PREFIX: &str = "account:";
const LEDGER_KEY: &str = "ledger";
const EVENT_PREFIX: &str = "event:";

fn account_key(account: &Account) -> String {
    format!("{}{}", ACCOUNT_PREFIX, account.address)
}

// Zero-padded so a prefix scan returns records in sequence order.
fn event_key(record: &EventRecord) -> String {
    format!("{}{:020}", EVENT_PREFIX, record.seq)
}

fn storage_err(e: impl std::fmt::Display) -> WalletError {
    WalletError::Storage(e.to_string())
}

/// Sled-backed persistence for account records, the ledger snapshot and the event log.
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let db = sled::open(path).map_err(storage_err)?;
        Ok(Storage { db })
    }

    // Generic Helper: Put
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), WalletError> {
        let serialized = bincode::serialize(value).map_err(storage_err)?;
        self.db.insert(key.as_bytes(), serialized).map_err(storage_err)?;
        Ok(())
    }

    // Generic Helper: Get
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, WalletError> {
        match self.db.get(key.as_bytes()).map_err(storage_err)? {
            Some(data) => Ok(Some(bincode::deserialize(&data).map_err(storage_err)?)),
            None => Ok(None),
        }
    }

    // --- Specific Accessors ---

    pub fn save_account(&self, account: &Account) -> Result<(), WalletError> {
        self.put(&account_key(account), account)
    }

    pub fn load_accounts(&self) -> Result<Vec<Account>, WalletError> {
        self.db
            .scan_prefix(ACCOUNT_PREFIX.as_bytes())
            .map(|entry| {
                let (_, data) = entry.map_err(storage_err)?;
                bincode::deserialize(&data).map_err(storage_err)
            })
            .collect()
    }

    pub fn save_ledger<L: Serialize>(&self, ledger: &L) -> Result<(), WalletError> {
        self.put(LEDGER_KEY, ledger)
    }

    pub fn load_ledger<L: DeserializeOwned>(&self) -> Result<Option<L>, WalletError> {
        self.get(LEDGER_KEY)
    }

    pub fn save_events(&self, events: &[EventRecord]) -> Result<(), WalletError> {
        for record in events {
            self.put(&event_key(record), record)?;
        }
        Ok(())
    }

    pub fn load_events(&self) -> Result<EventLog, WalletError> {
        let records = self
            .db
            .scan_prefix(EVENT_PREFIX.as_bytes())
            .map(|entry| {
                let (_, data) = entry.map_err(storage_err)?;
                bincode::deserialize(&data).map_err(storage_err)
            })
            .collect::<Result<Vec<EventRecord>, WalletError>>()?;
        Ok(EventLog::from_records(records))
    }

    /// Write one committed change atomically: the account record, the ledger snapshot
    /// and the events it emitted. Nothing is written if any part fails.
    pub fn commit<L: Serialize>(
        &self,
        account: &Account,
        ledger: &L,
        events: &[EventRecord],
    ) -> Result<(), WalletError> {
        let mut writes = Vec::with_capacity(events.len() + 2);
        writes.push((account_key(account), bincode::serialize(account).map_err(storage_err)?));
        writes.push((LEDGER_KEY.to_string(), bincode::serialize(ledger).map_err(storage_err)?));
        for record in events {
            writes.push((event_key(record), bincode::serialize(record).map_err(storage_err)?));
        }

        let result: Result<(), sled::transaction::TransactionError> = self.db.transaction(|tx_db| {
            for (key, value) in &writes {
                tx_db.insert(key.as_bytes(), value.as_slice())?;
            }
            Ok(())
        });
        result.map_err(|e| WalletError::Storage(format!("commit aborted: {:?}", e)))?;
        self.flush()
    }

    pub fn flush(&self) -> Result<(), WalletError> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }
}
