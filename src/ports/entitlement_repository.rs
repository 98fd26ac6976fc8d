//! Entitlement repository port.
//!
//! Every mutation of an existing entitlement goes through
//! [`EntitlementRepository::modify`], which applies a closure under a
//! per-payer exclusive lock and persists the result in the same atomic unit.
//! Concurrent notifications for one payer are therefore serialized and a
//! read-compute-write race cannot lose a paid period.

use async_trait::async_trait;

use crate::domain::billing::Entitlement;
use crate::domain::foundation::{AccountId, DomainError};

/// Mutation applied to a locked entitlement.
pub type EntitlementUpdate = Box<dyn FnOnce(&mut Entitlement) + Send>;

/// Entitlement state before and after an atomic update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementChange {
    pub before: Entitlement,
    pub after: Entitlement,
}

impl EntitlementChange {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// Repository port for entitlement persistence.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Finds the entitlement of a payer.
    ///
    /// Returns `None` if the payer has never been observed.
    async fn find_by_payer(&self, payer_id: &AccountId) -> Result<Option<Entitlement>, DomainError>;

    /// Inserts a new entitlement unless one already exists for the payer.
    ///
    /// Returns `true` if the row was created.
    async fn insert_if_absent(&self, entitlement: &Entitlement) -> Result<bool, DomainError>;

    /// Applies `update` to the payer's entitlement under an exclusive lock.
    ///
    /// Returns `None` without calling `update` if the payer has no entitlement.
    async fn modify(
        &self,
        payer_id: &AccountId,
        update: EntitlementUpdate,
    ) -> Result<Option<EntitlementChange>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    #[test]
    fn entitlement_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn EntitlementRepository) {}
    }

    #[test]
    fn change_detects_difference() {
        let before = Entitlement::new(AccountId::new("p").unwrap(), Timestamp::EPOCH);
        let mut after = before.clone();
        assert!(!EntitlementChange { before: before.clone(), after: after.clone() }.changed());

        after.mark_past_due(Timestamp::EPOCH.add_days(1));
        assert!(EntitlementChange { before, after }.changed());
    }
}
