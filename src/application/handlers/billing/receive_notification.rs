//! ReceiveNotificationHandler - entry point for every gateway callback.
//!
//! Pipeline: verify the signature over the untouched body, parse the typed
//! notification, lease its key in the seen-set, then dispatch to the handler
//! for its kind. The key is marked processed as soon as the state change
//! commits. A lease held by a request that never finishes (timeout, dropped
//! connection) runs out on its own, so the redelivery is applied.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{
    GatewayNotification, NotificationKind, SignatureHeaders, SignatureVerifier, WebhookError,
};
use crate::ports::{ClaimOutcome, ProcessedNotificationStore};

use super::{
    HandlePaymentFailedHandler, HandlePaymentSucceededHandler, HandleRecurringStatusChangedHandler,
};

/// A raw gateway callback.
#[derive(Debug, Clone)]
pub struct ReceiveNotificationCommand {
    pub kind: NotificationKind,
    /// Body bytes exactly as received.
    pub body: Vec<u8>,
    pub headers: SignatureHeaders,
}

/// Outcome of a notification that needs no retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveNotificationResult {
    /// Applied to the payer's entitlement.
    Processed(NotificationKind),
    /// Already processed within the retention window.
    Duplicate { key: String },
}

struct SeenSet {
    store: Arc<dyn ProcessedNotificationStore>,
    retention: Duration,
    lease: Duration,
}

impl SeenSet {
    async fn mark_processed(&self, key: &str) {
        if let Err(e) = self.store.mark_processed(key, self.retention).await {
            tracing::error!(key = %key, error = %e, "failed to mark notification processed");
        }
    }

    async fn release(&self, key: &str) {
        if let Err(e) = self.store.release(key).await {
            tracing::error!(key = %key, error = %e, "failed to release notification lease");
        }
    }
}

pub struct ReceiveNotificationHandler {
    verifier: Arc<SignatureVerifier>,
    seen: Option<SeenSet>,
    payment_succeeded: HandlePaymentSucceededHandler,
    recurring_status_changed: HandleRecurringStatusChangedHandler,
    payment_failed: HandlePaymentFailedHandler,
}

impl ReceiveNotificationHandler {
    pub fn new(
        verifier: Arc<SignatureVerifier>,
        payment_succeeded: HandlePaymentSucceededHandler,
        recurring_status_changed: HandleRecurringStatusChangedHandler,
        payment_failed: HandlePaymentFailedHandler,
    ) -> Self {
        Self {
            verifier,
            seen: None,
            payment_succeeded,
            recurring_status_changed,
            payment_failed,
        }
    }

    /// Enables de-duplication by correlation id.
    ///
    /// `lease` bounds how long an unfinished attempt blocks redeliveries;
    /// `retention` is how long a processed key is remembered.
    pub fn with_seen_set(
        mut self,
        store: Arc<dyn ProcessedNotificationStore>,
        retention: Duration,
        lease: Duration,
    ) -> Self {
        self.seen = Some(SeenSet {
            store,
            retention,
            lease,
        });
        self
    }

    pub async fn handle(
        &self,
        cmd: ReceiveNotificationCommand,
    ) -> Result<ReceiveNotificationResult, WebhookError> {
        // 1. Authenticate
        if cmd.headers.is_empty() {
            tracing::warn!(kind = %cmd.kind, "notification without signature header");
            return Err(WebhookError::InvalidSignature);
        }
        match self.verifier.find_match(&cmd.body, &cmd.headers) {
            Some(matched) => tracing::debug!(
                kind = %cmd.kind,
                header = matched.header,
                candidate = ?matched.candidate,
                "notification signature verified"
            ),
            None => {
                tracing::warn!(
                    kind = %cmd.kind,
                    body_len = cmd.body.len(),
                    "notification signature mismatch"
                );
                return Err(WebhookError::InvalidSignature);
            }
        }

        // 2. Parse
        let notification = GatewayNotification::parse(cmd.kind, &cmd.body).map_err(|e| {
            tracing::warn!(kind = %cmd.kind, error = %e, "authentic notification could not be parsed");
            e
        })?;

        // 3. Lease
        let claim = match (&self.seen, notification.dedup_key()) {
            (Some(seen), Some(key)) => match seen.store.try_claim(&key, seen.lease).await? {
                ClaimOutcome::Claimed => Some((seen, key)),
                ClaimOutcome::Processed => {
                    tracing::info!(
                        kind = %cmd.kind,
                        payer_id = %notification.payer_id(),
                        key = %key,
                        "duplicate notification skipped"
                    );
                    return Ok(ReceiveNotificationResult::Duplicate { key });
                }
                ClaimOutcome::InFlight => {
                    tracing::info!(
                        kind = %cmd.kind,
                        payer_id = %notification.payer_id(),
                        key = %key,
                        "notification already in flight, asking for retry"
                    );
                    return Err(WebhookError::InFlight(key));
                }
            },
            _ => None,
        };

        // 4. Apply
        let lease = claim.as_ref().map(|(seen, key)| (*seen, key.as_str()));
        let result = self.dispatch(notification, lease).await;

        if let (Err(e), Some((seen, key))) = (&result, lease) {
            if e.is_retryable() {
                seen.release(key).await;
            } else {
                seen.mark_processed(key).await;
            }
        }

        result.map(|_| ReceiveNotificationResult::Processed(cmd.kind))
    }

    async fn dispatch(
        &self,
        notification: GatewayNotification,
        lease: Option<(&SeenSet, &str)>,
    ) -> Result<(), WebhookError> {
        let payer_id = notification.payer_id().clone();
        let kind = notification.kind();

        let result = match notification {
            GatewayNotification::PaymentSucceeded(n) => {
                match self.payment_succeeded.apply(&n).await {
                    Ok(applied) => {
                        // Committed: mark before the gateway round-trips of
                        // complete(), which may outlive the request.
                        Self::committed(lease).await;
                        self.payment_succeeded.complete(n, applied).await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            GatewayNotification::RecurringStatusChanged(n) => {
                let result = self.recurring_status_changed.handle(n).await.map(|_| ());
                if result.is_ok() {
                    Self::committed(lease).await;
                }
                result
            }
            GatewayNotification::PaymentFailed(n) => {
                let result = self.payment_failed.handle(n).await.map(|_| ());
                if result.is_ok() {
                    Self::committed(lease).await;
                }
                result
            }
        };

        match &result {
            Err(WebhookError::UnknownPayer(_)) => {
                tracing::info!(kind = %kind, payer_id = %payer_id, "notification for unknown payer dropped");
            }
            Err(e) if e.is_retryable() => {
                tracing::error!(kind = %kind, payer_id = %payer_id, error = %e, "notification failed, gateway will retry");
            }
            _ => {}
        }
        result
    }

    async fn committed(lease: Option<(&SeenSet, &str)>) {
        if let Some((seen, key)) = lease {
            seen.mark_processed(key).await;
        }
    }
}
