//! Account type definitions

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crate::encoding::CanonicalSerialize;

/// A principal (owner or guardian), identified by its ed25519 verifying key.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(pub [u8; 32]);

/// Caller-chosen value that, together with the owner, fixes an account address.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Salt(pub [u8; 32]);

/// 20-byte account address.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Identity {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The ledger-side address of a principal, used when funds are sent to a
    /// person rather than to a derived account.
    pub fn to_address(&self) -> Address {
        let digest = Sha256::digest(self.0);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        Address(out)
    }
}

impl Salt {
    /// Hash a human label into a salt (`Salt::from_label("0")`).
    pub fn from_label(label: &str) -> Self {
        Salt(Sha256::digest(label.as_bytes()).into())
    }
}

fn parse_hex<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let trimmed = s.trim().trim_start_matches("0x");
    let bytes = hex::decode(trimmed).map_err(|e| format!("invalid hex '{}': {}", s, e))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("expected {} bytes, got {}", N, b.len()))
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Identity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex::<32>(s).map(Identity)
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex::<20>(s).map(Address)
    }
}

impl CanonicalSerialize for Identity {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.0.canonical_serialize(writer)
    }
}

impl CanonicalSerialize for Salt {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.0.canonical_serialize(writer)
    }
}

impl CanonicalSerialize for Address {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.0.canonical_serialize(writer)
    }
}

/// Per-account recovery policy, captured at creation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Minimum delay between start and confirmation, in seconds.
    pub time_lock_secs: u64,
    /// Distinct guardian approvals needed to rotate the owner.
    pub quorum: u32,
    /// Window after the time lock during which a pending recovery may still be confirmed.
    pub expiry_secs: Option<u64>,
}

pub const DEFAULT_TIME_LOCK_SECS: u64 = 24 * 60 * 60;

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            time_lock_secs: DEFAULT_TIME_LOCK_SECS,
            quorum: 1,
            expiry_secs: None,
        }
    }
}

/// A recovery in flight.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingRecovery {
    pub proposed_owner: Identity,
    pub initiator: Identity,
    pub started_at: u64,
    /// Guardians that have confirmed so far.
    pub approvals: BTreeSet<Identity>,
}

impl PendingRecovery {
    pub fn ready_at(&self, policy: &RecoveryPolicy) -> u64 {
        self.started_at.saturating_add(policy.time_lock_secs)
    }

    /// `None` when the policy has no expiry.
    pub fn expires_at(&self, policy: &RecoveryPolicy) -> Option<u64> {
        policy
            .expiry_secs
            .map(|window| self.ready_at(policy).saturating_add(window))
    }

    pub fn is_expired(&self, policy: &RecoveryPolicy, now: u64) -> bool {
        self.expires_at(policy).is_some_and(|at| now > at)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub enum RecoveryState {
    #[default]
    Idle,
    Pending(PendingRecovery),
}

/// Main account structure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Account {
    // Identity
    pub address: Address,
    pub salt: Salt,
    pub(crate) owner: Identity,

    // Social recovery
    pub(crate) guardians: BTreeSet<Identity>,
    pub(crate) recovery: RecoveryState,
    pub policy: RecoveryPolicy,

    // State
    pub(crate) nonce: u64,
    pub created_at: u64,
}

impl Account {
    pub(crate) fn new(
        address: Address,
        owner: Identity,
        salt: Salt,
        policy: RecoveryPolicy,
        created_at: u64,
    ) -> Self {
        Self {
            address,
            salt,
            owner,
            guardians: BTreeSet::new(),
            recovery: RecoveryState::Idle,
            policy,
            nonce: 0,
            created_at,
        }
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn guardians(&self) -> &BTreeSet<Identity> {
        &self.guardians
    }

    pub fn is_guardian(&self, identity: &Identity) -> bool {
        self.guardians.contains(identity)
    }

    pub fn recovery(&self) -> &RecoveryState {
        &self.recovery
    }

    pub fn recovery_active(&self) -> bool {
        matches!(self.recovery, RecoveryState::Pending(_))
    }

    pub fn pending_recovery(&self) -> Option<&PendingRecovery> {
        match &self.recovery {
            RecoveryState::Pending(pending) => Some(pending),
            RecoveryState::Idle => None,
        }
    }

    pub fn proposed_owner(&self) -> Option<Identity> {
        self.pending_recovery().map(|p| p.proposed_owner)
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}
