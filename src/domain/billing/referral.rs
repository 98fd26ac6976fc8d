use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Timestamp};

/// Records which account referred another, and when the referred account first paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralAttribution {
    pub referred_id: AccountId,
    pub referrer_id: AccountId,
    pub attributed_at: Timestamp,
    pub first_paid_at: Option<Timestamp>,
}

impl ReferralAttribution {
    pub fn new(referred_id: AccountId, referrer_id: AccountId, attributed_at: Timestamp) -> Self {
        Self {
            referred_id,
            referrer_id,
            attributed_at,
            first_paid_at: None,
        }
    }

    /// Sets `first_paid_at` once. Later payments leave it untouched.
    pub fn mark_first_paid(&mut self, at: Timestamp) -> bool {
        if self.first_paid_at.is_some() {
            return false;
        }
        self.first_paid_at = Some(at);
        true
    }
}
