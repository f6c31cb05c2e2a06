//! Guardian management and the time-locked recovery state machine.
//!
//! ```text
//!   Idle --start_recovery--> Pending --confirm_recovery (quorum met)--> Idle (owner rotated)
//!                               |  \--confirm_recovery (below quorum)--> Pending
//!                               \--cancel_recovery--> Idle
//! ```
//!
//! Every transition checks all of its preconditions before touching state, so a
//! returned error always means the account is exactly as it was.

use std::collections::BTreeSet;

use super::types::{Account, Identity, PendingRecovery, RecoveryState};
use crate::error::WalletError;
use crate::events::WalletEvent;

impl Account {
    fn require_owner(&self, caller: &Identity) -> Result<(), WalletError> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(WalletError::Unauthorized)
        }
    }

    fn require_guardian(&self, caller: &Identity) -> Result<(), WalletError> {
        if self.guardians.contains(caller) {
            Ok(())
        } else {
            Err(WalletError::Unauthorized)
        }
    }

    /// Approvals needed right now. Never more than the guardians available to give them.
    pub fn effective_quorum(&self) -> usize {
        let guardians = self.guardians.len().max(1);
        (self.policy.quorum.max(1) as usize).min(guardians)
    }

    pub fn add_guardian(
        &mut self,
        caller: &Identity,
        guardian: Identity,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.require_owner(caller)?;
        if guardian == self.owner {
            return Err(WalletError::OwnerCannotBeGuardian(guardian));
        }
        if self.guardians.contains(&guardian) {
            return Err(WalletError::AlreadyGuardian(guardian));
        }

        self.guardians.insert(guardian);
        Ok(vec![WalletEvent::GuardianAdded(guardian)])
    }

    pub fn remove_guardian(
        &mut self,
        caller: &Identity,
        guardian: Identity,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.require_owner(caller)?;
        if !self.guardians.remove(&guardian) {
            return Err(WalletError::NotAGuardian(guardian));
        }
        Ok(vec![WalletEvent::GuardianRemoved(guardian)])
    }

    /// An expired pending recovery does not block a new one; it is replaced.
    pub fn start_recovery(
        &mut self,
        caller: &Identity,
        proposed_owner: Identity,
        now: u64,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.require_guardian(caller)?;
        if let RecoveryState::Pending(pending) = &self.recovery {
            if !pending.is_expired(&self.policy, now) {
                return Err(WalletError::RecoveryAlreadyActive);
            }
        }

        self.recovery = RecoveryState::Pending(PendingRecovery {
            proposed_owner,
            initiator: *caller,
            started_at: now,
            approvals: BTreeSet::new(),
        });
        Ok(vec![WalletEvent::RecoveryStarted(proposed_owner)])
    }

    pub fn confirm_recovery(
        &mut self,
        caller: &Identity,
        now: u64,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.require_guardian(caller)?;
        let RecoveryState::Pending(pending) = &self.recovery else {
            return Err(WalletError::NoActiveRecovery);
        };

        let ready_at = pending.ready_at(&self.policy);
        if now < ready_at {
            return Err(WalletError::TimeLockNotElapsed { ready_at, now });
        }
        if let Some(expired_at) = pending.expires_at(&self.policy) {
            if now > expired_at {
                return Err(WalletError::RecoveryExpired { expired_at });
            }
        }

        // Approvals from guardians removed since they confirmed no longer count.
        let mut approvals: BTreeSet<Identity> = pending
            .approvals
            .intersection(&self.guardians)
            .copied()
            .collect();
        let quorum = self.effective_quorum();
        // Removals can shrink the quorum to what is already approved; any guardian may
        // then finish the recovery, including one who approved before.
        if approvals.len() < quorum && !approvals.insert(*caller) {
            return Err(WalletError::AlreadyApproved(*caller));
        }

        if approvals.len() < quorum {
            if let RecoveryState::Pending(pending) = &mut self.recovery {
                pending.approvals = approvals;
            }
            return Ok(vec![WalletEvent::RecoveryApproved(*caller)]);
        }

        let old = self.owner;
        let new = pending.proposed_owner;
        let mut events = Vec::with_capacity(2);
        if self.guardians.remove(&new) {
            events.push(WalletEvent::GuardianRemoved(new));
        }
        self.owner = new;
        self.recovery = RecoveryState::Idle;
        events.push(WalletEvent::OwnerChanged { old, new });
        Ok(events)
    }

    /// Only the owner at the time of cancellation may cancel.
    pub fn cancel_recovery(&mut self, caller: &Identity) -> Result<Vec<WalletEvent>, WalletError> {
        self.require_owner(caller)?;
        if !self.recovery_active() {
            return Err(WalletError::NoActiveRecovery);
        }

        self.recovery = RecoveryState::Idle;
        Ok(vec![WalletEvent::RecoveryCancelled(*caller)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::types::{Address, RecoveryPolicy, Salt, DEFAULT_TIME_LOCK_SECS};

    const OWNER: Identity = Identity([1; 32]);
    const G1: Identity = Identity([2; 32]);
    const G2: Identity = Identity([3; 32]);
    const G3: Identity = Identity([4; 32]);
    const NEW: Identity = Identity([5; 32]);
    const OUTSIDER: Identity = Identity([6; 32]);
    const T0: u64 = 1_700_000_000;

    fn account(policy: RecoveryPolicy) -> Account {
        Account::new(Address([0; 20]), OWNER, Salt::from_label("0"), policy, T0)
    }

    fn with_guardians(policy: RecoveryPolicy, guardians: &[Identity]) -> Account {
        let mut acc = account(policy);
        for g in guardians {
            acc.add_guardian(&OWNER, *g).unwrap();
        }
        acc
    }

    #[test]
    fn test_add_and_remove_guardian() {
        let mut acc = account(RecoveryPolicy::default());
        assert_eq!(acc.add_guardian(&OWNER, G1).unwrap(), vec![WalletEvent::GuardianAdded(G1)]);
        assert!(acc.is_guardian(&G1));

        assert_eq!(acc.add_guardian(&OWNER, G1), Err(WalletError::AlreadyGuardian(G1)));
        assert_eq!(acc.add_guardian(&G1, G2), Err(WalletError::Unauthorized));
        assert_eq!(acc.add_guardian(&OWNER, OWNER), Err(WalletError::OwnerCannotBeGuardian(OWNER)));

        assert_eq!(acc.remove_guardian(&OWNER, G1).unwrap(), vec![WalletEvent::GuardianRemoved(G1)]);
        assert!(!acc.is_guardian(&G1));
    }

    #[test]
    fn test_remove_unknown_guardian() {
        let mut acc = account(RecoveryPolicy::default());
        let before = acc.clone();
        assert_eq!(acc.remove_guardian(&OWNER, OUTSIDER), Err(WalletError::NotAGuardian(OUTSIDER)));
        assert_eq!(acc, before);
    }

    #[test]
    fn test_non_guardian_cannot_start() {
        let mut acc = with_guardians(RecoveryPolicy::default(), &[G1]);
        let before = acc.clone();
        assert_eq!(acc.start_recovery(&OUTSIDER, NEW, T0), Err(WalletError::Unauthorized));
        assert_eq!(acc.start_recovery(&OWNER, NEW, T0), Err(WalletError::Unauthorized));
        assert_eq!(acc, before);
    }

    #[test]
    fn test_single_flight() {
        let mut acc = with_guardians(RecoveryPolicy::default(), &[G1, G2]);
        acc.start_recovery(&G1, NEW, T0).unwrap();
        let before = acc.clone();
        assert_eq!(acc.start_recovery(&G2, OUTSIDER, T0 + 1), Err(WalletError::RecoveryAlreadyActive));
        assert_eq!(acc, before);
        assert_eq!(acc.proposed_owner(), Some(NEW));
    }

    #[test]
    fn test_time_lock_boundary() {
        let mut acc = with_guardians(RecoveryPolicy::default(), &[G1]);
        acc.start_recovery(&G1, NEW, T0).unwrap();

        let early = T0 + DEFAULT_TIME_LOCK_SECS - 1;
        assert_eq!(
            acc.confirm_recovery(&G1, early),
            Err(WalletError::TimeLockNotElapsed {
                ready_at: T0 + DEFAULT_TIME_LOCK_SECS,
                now: early
            })
        );
        assert!(acc.recovery_active());

        let events = acc.confirm_recovery(&G1, T0 + DEFAULT_TIME_LOCK_SECS + 1).unwrap();
        assert_eq!(events, vec![WalletEvent::OwnerChanged { old: OWNER, new: NEW }]);
        assert_eq!(acc.owner(), NEW);
        assert_eq!(acc.recovery(), &RecoveryState::Idle);
    }

    #[test]
    fn test_confirm_requires_guardian_and_pending() {
        let mut acc = with_guardians(RecoveryPolicy::default(), &[G1]);
        assert_eq!(acc.confirm_recovery(&G1, T0), Err(WalletError::NoActiveRecovery));
        acc.start_recovery(&G1, NEW, T0).unwrap();
        assert_eq!(
            acc.confirm_recovery(&OUTSIDER, T0 + DEFAULT_TIME_LOCK_SECS),
            Err(WalletError::Unauthorized)
        );
    }

    #[test]
    fn test_cancel_is_owner_only() {
        let mut acc = with_guardians(RecoveryPolicy::default(), &[G1]);
        assert_eq!(acc.cancel_recovery(&OWNER), Err(WalletError::NoActiveRecovery));

        acc.start_recovery(&G1, NEW, T0).unwrap();
        assert_eq!(acc.cancel_recovery(&G1), Err(WalletError::Unauthorized));
        assert_eq!(acc.cancel_recovery(&OUTSIDER), Err(WalletError::Unauthorized));
        assert!(acc.recovery_active());

        assert_eq!(acc.cancel_recovery(&OWNER).unwrap(), vec![WalletEvent::RecoveryCancelled(OWNER)]);
        assert!(!acc.recovery_active());
        assert_eq!(
            acc.confirm_recovery(&G1, T0 + DEFAULT_TIME_LOCK_SECS + 1),
            Err(WalletError::NoActiveRecovery)
        );
    }

    #[test]
    fn test_quorum_collects_distinct_approvals() {
        let policy = RecoveryPolicy {
            quorum: 2,
            ..RecoveryPolicy::default()
        };
        let mut acc = with_guardians(policy, &[G1, G2, G3]);
        acc.start_recovery(&G1, NEW, T0).unwrap();
        let ready = T0 + DEFAULT_TIME_LOCK_SECS;

        assert_eq!(acc.confirm_recovery(&G1, ready).unwrap(), vec![WalletEvent::RecoveryApproved(G1)]);
        assert_eq!(acc.confirm_recovery(&G1, ready), Err(WalletError::AlreadyApproved(G1)));
        assert_eq!(acc.owner(), OWNER);

        let events = acc.confirm_recovery(&G2, ready).unwrap();
        assert_eq!(events, vec![WalletEvent::OwnerChanged { old: OWNER, new: NEW }]);
        assert_eq!(acc.owner(), NEW);
    }

    #[test]
    fn test_removed_guardian_approval_is_dropped() {
        let policy = RecoveryPolicy {
            quorum: 2,
            ..RecoveryPolicy::default()
        };
        let mut acc = with_guardians(policy, &[G1, G2, G3]);
        acc.start_recovery(&G1, NEW, T0).unwrap();
        let ready = T0 + DEFAULT_TIME_LOCK_SECS;
        acc.confirm_recovery(&G1, ready).unwrap();

        acc.remove_guardian(&OWNER, G1).unwrap();
        // G1's approval no longer counts; G2 alone is one of two.
        assert_eq!(acc.confirm_recovery(&G2, ready).unwrap(), vec![WalletEvent::RecoveryApproved(G2)]);
        assert_eq!(acc.confirm_recovery(&G3, ready).unwrap().len(), 1);
        assert_eq!(acc.owner(), NEW);
    }

    #[test]
    fn test_earlier_approval_completes_after_quorum_shrinks() {
        let policy = RecoveryPolicy {
            quorum: 2,
            ..RecoveryPolicy::default()
        };
        let mut acc = with_guardians(policy, &[G1, G2]);
        acc.start_recovery(&G1, NEW, T0).unwrap();
        let ready = T0 + DEFAULT_TIME_LOCK_SECS;
        assert_eq!(acc.confirm_recovery(&G1, ready).unwrap(), vec![WalletEvent::RecoveryApproved(G1)]);

        acc.remove_guardian(&OWNER, G2).unwrap();
        assert_eq!(acc.effective_quorum(), 1);

        let events = acc.confirm_recovery(&G1, ready).unwrap();
        assert_eq!(events, vec![WalletEvent::OwnerChanged { old: OWNER, new: NEW }]);
        assert_eq!(acc.owner(), NEW);
        assert!(!acc.recovery_active());
    }

    #[test]
    fn test_quorum_clamped_to_guardian_count() {
        let policy = RecoveryPolicy {
            quorum: 5,
            ..RecoveryPolicy::default()
        };
        let mut acc = with_guardians(policy, &[G1]);
        assert_eq!(acc.effective_quorum(), 1);
        acc.start_recovery(&G1, NEW, T0).unwrap();
        acc.confirm_recovery(&G1, T0 + DEFAULT_TIME_LOCK_SECS).unwrap();
        assert_eq!(acc.owner(), NEW);
    }

    #[test]
    fn test_expired_recovery() {
        let policy = RecoveryPolicy {
            time_lock_secs: 100,
            quorum: 1,
            expiry_secs: Some(10),
        };
        let mut acc = with_guardians(policy, &[G1, G2]);
        acc.start_recovery(&G1, NEW, T0).unwrap();

        let before = acc.clone();
        assert_eq!(
            acc.confirm_recovery(&G1, T0 + 111),
            Err(WalletError::RecoveryExpired { expired_at: T0 + 110 })
        );
        assert_eq!(acc, before);

        // Still blocks a new start until it actually expires.
        assert_eq!(acc.start_recovery(&G2, OUTSIDER, T0 + 110), Err(WalletError::RecoveryAlreadyActive));
        acc.start_recovery(&G2, OUTSIDER, T0 + 111).unwrap();
        let pending = acc.pending_recovery().unwrap();
        assert_eq!(pending.initiator, G2);
        assert_eq!(pending.proposed_owner, OUTSIDER);
        assert_eq!(pending.started_at, T0 + 111);
    }

    #[test]
    fn test_guardian_promoted_to_owner_leaves_guardian_set() {
        let mut acc = with_guardians(RecoveryPolicy::default(), &[G1, G2]);
        acc.start_recovery(&G1, G2, T0).unwrap();
        let events = acc.confirm_recovery(&G1, T0 + DEFAULT_TIME_LOCK_SECS).unwrap();

        assert_eq!(
            events,
            vec![
                WalletEvent::GuardianRemoved(G2),
                WalletEvent::OwnerChanged { old: OWNER, new: G2 },
            ]
        );
        assert_eq!(acc.owner(), G2);
        assert!(!acc.is_guardian(&G2));
        assert!(acc.is_guardian(&G1));
    }

    #[test]
    fn test_new_owner_takes_over_owner_rights() {
        let mut acc = with_guardians(RecoveryPolicy::default(), &[G1]);
        acc.start_recovery(&G1, NEW, T0).unwrap();
        acc.confirm_recovery(&G1, T0 + DEFAULT_TIME_LOCK_SECS).unwrap();

        assert_eq!(acc.add_guardian(&OWNER, G2), Err(WalletError::Unauthorized));
        acc.add_guardian(&NEW, G2).unwrap();
    }
}
