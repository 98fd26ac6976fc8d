//! ProcessedNotificationStore port - bounded-retention seen-set for gateway notifications.
//!
//! The gateway may redeliver the same notification. Handlers are already safe
//! under redelivery, but a duplicate charge notification arriving long after
//! the first could still extend `paid_until` a second time. Marking a key once
//! its state change has committed closes that gap for the retention window.
//!
//! A key moves through two states:
//! - in flight: claimed with a short lease while the notification is applied.
//!   If the worker dies the lease runs out and a redelivery is applied.
//! - processed: written after the state change commits, kept for the
//!   retention window.
//!
//! ```ignore
//! match store.try_claim(&key, lease).await? {
//!     ClaimOutcome::Processed => return Ok(Outcome::Duplicate),
//!     ClaimOutcome::InFlight => return Err(retry_later),
//!     ClaimOutcome::Claimed => {}
//! }
//! apply().await?;
//! store.mark_processed(&key, retention).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Result of claiming a notification key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller holds the lease and should apply the notification.
    Claimed,
    /// Another worker holds an unexpired lease.
    InFlight,
    /// The notification was already applied.
    Processed,
}

#[async_trait]
pub trait ProcessedNotificationStore: Send + Sync {
    /// Atomically claims `key` with an in-flight lease lasting `lease`.
    async fn try_claim(&self, key: &str, lease: Duration) -> Result<ClaimOutcome, DomainError>;

    /// Records `key` as applied for `retention`, replacing any lease.
    async fn mark_processed(&self, key: &str, retention: Duration) -> Result<(), DomainError>;

    /// Drops a lease so a redelivery is processed again.
    async fn release(&self, key: &str) -> Result<(), DomainError>;
}
