use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::DelegationLink;
use crate::domain::foundation::{AccountId, DomainError};
use crate::ports::DelegationReader;

/// In-memory delegation links. Tests link and unlink directly.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDelegationReader {
    links: Arc<RwLock<HashMap<AccountId, DelegationLink>>>,
}

impl InMemoryDelegationReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the beneficiary's link.
    pub async fn link(&self, link: DelegationLink) {
        self.links
            .write()
            .await
            .insert(link.beneficiary_id.clone(), link);
    }

    pub async fn unlink(&self, beneficiary_id: &AccountId) {
        self.links.write().await.remove(beneficiary_id);
    }
}

#[async_trait]
impl DelegationReader for InMemoryDelegationReader {
    async fn find_link(
        &self,
        beneficiary_id: &AccountId,
    ) -> Result<Option<DelegationLink>, DomainError> {
        Ok(self.links.read().await.get(beneficiary_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn link_replaces_previous_payer() {
        let reader = InMemoryDelegationReader::new();
        let kid = AccountId::new("kid").unwrap();
        let mum = AccountId::new("mum").unwrap();
        let dad = AccountId::new("dad").unwrap();

        reader
            .link(DelegationLink::new(kid.clone(), mum, Timestamp::EPOCH))
            .await;
        reader
            .link(DelegationLink::new(kid.clone(), dad.clone(), Timestamp::EPOCH))
            .await;

        let link = reader.find_link(&kid).await.unwrap().unwrap();
        assert_eq!(link.payer_id, dad);

        reader.unlink(&kid).await;
        assert!(reader.find_link(&kid).await.unwrap().is_none());
    }
}
