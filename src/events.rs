//! Observable account events, recorded in the order their transitions committed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::types::{Address, Identity};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    AccountCreated { owner: Identity },
    GuardianAdded(Identity),
    GuardianRemoved(Identity),
    RecoveryStarted(Identity),
    /// A guardian confirmed but the quorum is not yet met.
    RecoveryApproved(Identity),
    OwnerChanged { old: Identity, new: Identity },
    RecoveryCancelled(Identity),
}

impl fmt::Display for WalletEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletEvent::AccountCreated { owner } => write!(f, "AccountCreated({})", owner),
            WalletEvent::GuardianAdded(id) => write!(f, "GuardianAdded({})", id),
            WalletEvent::GuardianRemoved(id) => write!(f, "GuardianRemoved({})", id),
            WalletEvent::RecoveryStarted(id) => write!(f, "RecoveryStarted({})", id),
            WalletEvent::RecoveryApproved(id) => write!(f, "RecoveryApproved({})", id),
            WalletEvent::OwnerChanged { old, new } => write!(f, "OwnerChanged({}, {})", old, new),
            WalletEvent::RecoveryCancelled(id) => write!(f, "RecoveryCancelled({})", id),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub seq: u64,
    pub account: Address,
    pub event: WalletEvent,
}

/// Append-only event log shared by every account of a factory.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<EventRecord>) -> Self {
        Self { records }
    }

    /// Records `events` would get if appended now, without appending them.
    pub fn pending(&self, account: Address, events: Vec<WalletEvent>) -> Vec<EventRecord> {
        let next = self.records.len() as u64;
        events
            .into_iter()
            .enumerate()
            .map(|(i, event)| EventRecord {
                seq: next + i as u64,
                account,
                event,
            })
            .collect()
    }

    /// Append records produced by [`EventLog::pending`] against this log.
    pub fn extend(&mut self, records: Vec<EventRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn for_account(&self, account: &Address) -> impl Iterator<Item = &EventRecord> + '_ {
        let account = *account;
        self.records.iter().filter(move |r| r.account == account)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
