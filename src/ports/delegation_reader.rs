//! Read-only access to beneficiary → payer links.
//!
//! Links are created and replaced elsewhere; the billing engine only resolves them.

use async_trait::async_trait;

use crate::domain::billing::DelegationLink;
use crate::domain::foundation::{AccountId, DomainError};

#[async_trait]
pub trait DelegationReader: Send + Sync {
    /// Returns the beneficiary's link to its payer, if any.
    async fn find_link(&self, beneficiary_id: &AccountId)
        -> Result<Option<DelegationLink>, DomainError>;
}
