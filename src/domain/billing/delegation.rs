use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Timestamp};

/// Beneficiary to payer link. A beneficiary has at most one payer; a payer
/// may cover many beneficiaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationLink {
    pub beneficiary_id: AccountId,
    pub payer_id: AccountId,
    pub linked_at: Timestamp,
}

impl DelegationLink {
    pub fn new(beneficiary_id: AccountId, payer_id: AccountId, linked_at: Timestamp) -> Self {
        Self {
            beneficiary_id,
            payer_id,
            linked_at,
        }
    }

    /// A link pointing at its own beneficiary grants nothing.
    pub fn is_self_link(&self) -> bool {
        self.beneficiary_id == self.payer_id
    }
}
