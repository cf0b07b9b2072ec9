//! Two-class claim ledger.
//!
//! User owners claim and release explicitly. Internal infrastructure holds
//! anonymous keepalive claims that never trigger pooling on their own.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::UsageError;

/// Identity of a path owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    /// The null owner; rejected by `claim` and `release`
    pub const NONE: OwnerId = OwnerId(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Process-unique non-null owner
    pub fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClaimLedger {
    users: Vec<OwnerId>,
    keepalive: u32,
    user_released: bool,
}

impl ClaimLedger {
    pub fn claim(&mut self, owner: OwnerId) -> Result<(), UsageError> {
        if owner.is_none() {
            return Err(UsageError::NullOwner);
        }
        if self.users.contains(&owner) {
            return Err(UsageError::AlreadyClaimed(owner.get()));
        }
        self.users.push(owner);
        Ok(())
    }

    /// Returns true if the path is now free to pool
    pub fn release(&mut self, owner: OwnerId) -> Result<bool, UsageError> {
        if owner.is_none() {
            return Err(UsageError::NullOwner);
        }
        let Some(at) = self.users.iter().position(|o| *o == owner) else {
            return Err(UsageError::NotClaimed(owner.get()));
        };
        self.users.swap_remove(at);
        self.user_released = true;
        Ok(self.is_free())
    }

    pub fn retain_keepalive(&mut self) {
        self.keepalive += 1;
    }

    /// Returns true if the path is now free to pool
    pub fn release_keepalive(&mut self) -> bool {
        self.keepalive = self.keepalive.saturating_sub(1);
        self.is_free()
    }

    /// No claims of either class left and at least one user release seen
    pub fn is_free(&self) -> bool {
        self.users.is_empty() && self.keepalive == 0 && self.user_released
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn keepalive_count(&self) -> u32 {
        self.keepalive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_release_frees() {
        let mut ledger = ClaimLedger::default();
        let owner = OwnerId::new(7);
        ledger.claim(owner).unwrap();
        assert!(!ledger.is_free());
        assert!(ledger.release(owner).unwrap());
    }

    #[test]
    fn test_double_claim_rejected() {
        let mut ledger = ClaimLedger::default();
        let owner = OwnerId::new(7);
        ledger.claim(owner).unwrap();
        assert_eq!(ledger.claim(owner), Err(UsageError::AlreadyClaimed(7)));
        assert_eq!(ledger.user_count(), 1);
    }

    #[test]
    fn test_release_without_claim_rejected() {
        let mut ledger = ClaimLedger::default();
        assert_eq!(
            ledger.release(OwnerId::new(3)),
            Err(UsageError::NotClaimed(3))
        );
    }

    #[test]
    fn test_null_owner_rejected() {
        let mut ledger = ClaimLedger::default();
        assert_eq!(ledger.claim(OwnerId::NONE), Err(UsageError::NullOwner));
        assert_eq!(ledger.release(OwnerId::NONE), Err(UsageError::NullOwner));
    }

    #[test]
    fn test_keepalive_alone_never_frees() {
        let mut ledger = ClaimLedger::default();
        ledger.retain_keepalive();
        assert!(!ledger.release_keepalive());
        assert_eq!(ledger.keepalive_count(), 0);
    }

    #[test]
    fn test_keepalive_delays_pooling() {
        let mut ledger = ClaimLedger::default();
        let owner = OwnerId::new(1);
        ledger.retain_keepalive();
        ledger.claim(owner).unwrap();
        assert!(!ledger.release(owner).unwrap());
        assert!(ledger.release_keepalive());
    }

    #[test]
    fn test_unique_owners_differ() {
        let a = OwnerId::unique();
        let b = OwnerId::unique();
        assert_ne!(a, b);
        assert!(!a.is_none());
    }
}
