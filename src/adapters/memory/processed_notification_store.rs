//! In-process notification seen-set.
//!
//! Entries expire lazily: an expired key is treated as absent and is swept
//! on the next claim.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{ClaimOutcome, ProcessedNotificationStore};

#[derive(Debug, Clone, Copy)]
struct Entry {
    processed: bool,
    expires: Instant,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryProcessedNotificationStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryProcessedNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// True while the key holds a lease or a processed marker.
    pub async fn is_claimed(&self, key: &str) -> bool {
        self.live_entry(key).await.is_some()
    }

    pub async fn is_processed(&self, key: &str) -> bool {
        self.live_entry(key).await.is_some_and(|e| e.processed)
    }

    async fn live_entry(&self, key: &str) -> Option<Entry> {
        self.entries
            .lock()
            .await
            .get(key)
            .copied()
            .filter(|e| e.expires > Instant::now())
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::new(ErrorCode::CacheError, "seen-set unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessedNotificationStore for InMemoryProcessedNotificationStore {
    async fn try_claim(&self, key: &str, lease: Duration) -> Result<ClaimOutcome, DomainError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.expires > now);

        match entries.get(key) {
            Some(e) if e.processed => Ok(ClaimOutcome::Processed),
            Some(_) => Ok(ClaimOutcome::InFlight),
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        processed: false,
                        expires: now + lease,
                    },
                );
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    async fn mark_processed(&self, key: &str, retention: Duration) -> Result<(), DomainError> {
        self.check_available()?;
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                processed: true,
                expires: Instant::now() + retention,
            },
        );
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<(), DomainError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|e| !e.processed) {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn second_claim_sees_lease_in_flight() {
        let store = InMemoryProcessedNotificationStore::new();

        assert_eq!(store.try_claim("pay:tx-1", MINUTE).await.unwrap(), ClaimOutcome::Claimed);
        assert_eq!(store.try_claim("pay:tx-1", MINUTE).await.unwrap(), ClaimOutcome::InFlight);
        assert_eq!(store.try_claim("pay:tx-2", MINUTE).await.unwrap(), ClaimOutcome::Claimed);
    }

    #[tokio::test]
    async fn processed_key_is_reported_as_processed() {
        let store = InMemoryProcessedNotificationStore::new();
        store.try_claim("pay:tx-1", MINUTE).await.unwrap();

        store.mark_processed("pay:tx-1", HOUR).await.unwrap();

        assert!(store.is_processed("pay:tx-1").await);
        assert_eq!(store.try_claim("pay:tx-1", MINUTE).await.unwrap(), ClaimOutcome::Processed);
    }

    #[tokio::test]
    async fn released_key_can_be_claimed_again() {
        let store = InMemoryProcessedNotificationStore::new();
        store.try_claim("fail:inv-1", MINUTE).await.unwrap();

        store.release("fail:inv-1").await.unwrap();

        assert!(!store.is_claimed("fail:inv-1").await);
        assert_eq!(store.try_claim("fail:inv-1", MINUTE).await.unwrap(), ClaimOutcome::Claimed);
    }

    #[tokio::test]
    async fn release_keeps_processed_marker() {
        let store = InMemoryProcessedNotificationStore::new();
        store.mark_processed("pay:tx-1", HOUR).await.unwrap();

        store.release("pay:tx-1").await.unwrap();

        assert!(store.is_processed("pay:tx-1").await);
    }

    #[tokio::test]
    async fn expired_lease_is_forgotten() {
        let store = InMemoryProcessedNotificationStore::new();
        store.try_claim("pay:tx-1", Duration::from_millis(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.try_claim("pay:tx-1", MINUTE).await.unwrap(), ClaimOutcome::Claimed);
    }

    #[tokio::test]
    async fn unavailable_store_returns_cache_error() {
        let store = InMemoryProcessedNotificationStore::new();
        store.set_unavailable(true);

        let err = store.try_claim("pay:tx-1", MINUTE).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::CacheError);
    }
}
