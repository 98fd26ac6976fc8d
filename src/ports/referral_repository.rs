use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError, Timestamp};

/// Port for the single referral side effect of a payment.
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Sets `first_paid_at` on the referred account's attribution if it is unset.
    ///
    /// Returns `true` if a row was updated. Accounts without an attribution,
    /// or already marked, return `false`.
    async fn mark_first_paid(
        &self,
        referred_id: &AccountId,
        paid_at: Timestamp,
    ) -> Result<bool, DomainError>;
}
