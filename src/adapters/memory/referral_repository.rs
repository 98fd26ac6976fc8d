use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::ReferralAttribution;
use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::ports::ReferralRepository;

#[derive(Debug, Default, Clone)]
pub struct InMemoryReferralRepository {
    attributions: Arc<RwLock<HashMap<AccountId, ReferralAttribution>>>,
}

impl InMemoryReferralRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attribute(&self, attribution: ReferralAttribution) {
        self.attributions
            .write()
            .await
            .insert(attribution.referred_id.clone(), attribution);
    }

    pub async fn get(&self, referred_id: &AccountId) -> Option<ReferralAttribution> {
        self.attributions.read().await.get(referred_id).cloned()
    }
}

#[async_trait]
impl ReferralRepository for InMemoryReferralRepository {
    async fn mark_first_paid(
        &self,
        referred_id: &AccountId,
        paid_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut attributions = self.attributions.write().await;
        Ok(attributions
            .get_mut(referred_id)
            .is_some_and(|a| a.mark_first_paid(paid_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn marks_only_attributed_accounts_once() {
        let repo = InMemoryReferralRepository::new();
        let referred = AccountId::new("new-user").unwrap();
        let t = Timestamp::from_unix_secs(1_780_000_000);
        repo.attribute(ReferralAttribution::new(
            referred.clone(),
            AccountId::new("old-user").unwrap(),
            t,
        ))
        .await;

        assert!(repo.mark_first_paid(&referred, t.add_days(1)).await.unwrap());
        assert!(!repo.mark_first_paid(&referred, t.add_days(2)).await.unwrap());
        assert!(!repo
            .mark_first_paid(&AccountId::new("stranger").unwrap(), t)
            .await
            .unwrap());

        assert_eq!(repo.get(&referred).await.unwrap().first_paid_at, Some(t.add_days(1)));
    }
}
