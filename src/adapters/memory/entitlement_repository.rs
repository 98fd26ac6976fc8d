//! In-memory entitlement store for tests and local development.
//!
//! A single async mutex guards the whole map, so `modify` is serialized for
//! every payer, not only per payer. Not suitable for multi-node deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::billing::Entitlement;
use crate::domain::foundation::{AccountId, DomainError};
use crate::ports::{EntitlementChange, EntitlementRepository, EntitlementUpdate};

#[derive(Debug, Default, Clone)]
pub struct InMemoryEntitlementRepository {
    rows: Arc<Mutex<HashMap<AccountId, Entitlement>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryEntitlementRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a row directly.
    pub async fn put(&self, entitlement: Entitlement) {
        self.rows
            .lock()
            .await
            .insert(entitlement.payer_id.clone(), entitlement);
    }

    /// Makes every operation fail with a database error while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("entitlement store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryEntitlementRepository {
    async fn find_by_payer(&self, payer_id: &AccountId) -> Result<Option<Entitlement>, DomainError> {
        self.check_available()?;
        Ok(self.rows.lock().await.get(payer_id).cloned())
    }

    async fn insert_if_absent(&self, entitlement: &Entitlement) -> Result<bool, DomainError> {
        self.check_available()?;
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&entitlement.payer_id) {
            return Ok(false);
        }
        rows.insert(entitlement.payer_id.clone(), entitlement.clone());
        Ok(true)
    }

    async fn modify(
        &self,
        payer_id: &AccountId,
        update: EntitlementUpdate,
    ) -> Result<Option<EntitlementChange>, DomainError> {
        self.check_available()?;
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.get_mut(payer_id) else {
            return Ok(None);
        };

        let before = row.clone();
        update(row);
        Ok(Some(EntitlementChange {
            before,
            after: row.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PaymentDetails;
    use crate::domain::foundation::Timestamp;

    fn payer() -> AccountId {
        AccountId::new("payer-1").unwrap()
    }

    #[tokio::test]
    async fn insert_if_absent_only_inserts_once() {
        let repo = InMemoryEntitlementRepository::new();
        let first = Entitlement::with_trial(payer(), Timestamp::EPOCH, 14);
        let second = Entitlement::new(payer(), Timestamp::EPOCH.add_days(1));

        assert!(repo.insert_if_absent(&first).await.unwrap());
        assert!(!repo.insert_if_absent(&second).await.unwrap());

        let stored = repo.find_by_payer(&payer()).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn modify_returns_none_for_unknown_payer() {
        let repo = InMemoryEntitlementRepository::new();
        let result = repo
            .modify(&payer(), Box::new(|e| e.mark_past_due(Timestamp::EPOCH)))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn modify_persists_update() {
        let repo = InMemoryEntitlementRepository::new();
        repo.put(Entitlement::new(payer(), Timestamp::EPOCH)).await;
        let now = Timestamp::from_unix_secs(1_790_000_000);

        let change = repo
            .modify(
                &payer(),
                Box::new(move |e| {
                    e.record_payment(&PaymentDetails::default(), now);
                }),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(change.before.paid_until.is_none());
        assert_eq!(change.after.paid_until, Some(now.add_months(1)));
        let stored = repo.find_by_payer(&payer()).await.unwrap().unwrap();
        assert_eq!(stored, change.after);
    }

    #[tokio::test]
    async fn concurrent_payments_are_serialized() {
        let repo = InMemoryEntitlementRepository::new();
        repo.put(Entitlement::new(payer(), Timestamp::EPOCH)).await;
        let now = Timestamp::from_unix_secs(1_790_000_000);

        let mut tasks = Vec::new();
        for _ in 0..5 {
            let repo = repo.clone();
            tasks.push(tokio::spawn(async move {
                repo.modify(
                    &payer(),
                    Box::new(move |e| {
                        e.record_payment(&PaymentDetails::default(), now);
                    }),
                )
                .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = repo.find_by_payer(&payer()).await.unwrap().unwrap();
        let expected = (0..5).fold(now, |until, _| until.add_months(1));
        assert_eq!(stored.paid_until, Some(expected));
    }

    #[tokio::test]
    async fn unavailable_store_fails_with_database_error() {
        let repo = InMemoryEntitlementRepository::new();
        repo.set_unavailable(true);

        let err = repo.find_by_payer(&payer()).await.unwrap_err();

        assert!(err.is_infrastructure());
    }
}
