//! HandlePaymentFailedHandler - marks a payer past due after a failed charge.

use std::sync::Arc;

use crate::domain::billing::{PaymentFailed, WebhookError};
use crate::domain::foundation::{AccountId, Timestamp};
use crate::ports::{Clock, EntitlementRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlePaymentFailedResult {
    pub payer_id: AccountId,
    /// Access still runs until this instant, if a paid window exists.
    pub paid_until: Option<Timestamp>,
}

pub struct HandlePaymentFailedHandler {
    entitlements: Arc<dyn EntitlementRepository>,
    clock: Arc<dyn Clock>,
}

impl HandlePaymentFailedHandler {
    pub fn new(entitlements: Arc<dyn EntitlementRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entitlements,
            clock,
        }
    }

    pub async fn handle(&self, cmd: PaymentFailed) -> Result<HandlePaymentFailedResult, WebhookError> {
        let now = self.clock.now();
        let change = self
            .entitlements
            .modify(
                &cmd.payer_id,
                Box::new(move |entitlement| entitlement.mark_past_due(now)),
            )
            .await?
            .ok_or_else(|| WebhookError::UnknownPayer(cmd.payer_id.clone()))?;

        tracing::warn!(
            payer_id = %cmd.payer_id,
            transaction_id = ?cmd.correlation.transaction_id,
            reason = ?cmd.reason,
            reason_code = ?cmd.reason_code,
            "charge failed, payer marked past due"
        );

        Ok(HandlePaymentFailedResult {
            payer_id: cmd.payer_id,
            paid_until: change.after.paid_until,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEntitlementRepository;
    use crate::domain::billing::{BillingStatus, Correlation, Entitlement};
    use crate::ports::FixedClock;

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_780_000_000)
    }

    fn failed(payer: &str) -> PaymentFailed {
        PaymentFailed {
            payer_id: AccountId::new(payer).unwrap(),
            reason: Some("InsufficientFunds".to_string()),
            reason_code: Some("5051".to_string()),
            correlation: Correlation::default(),
        }
    }

    #[tokio::test]
    async fn failure_marks_past_due_and_keeps_window() {
        let repo = InMemoryEntitlementRepository::new();
        let mut e = Entitlement::new(AccountId::new("p1").unwrap(), t0());
        e.billing_status = BillingStatus::Active;
        e.paid_until = Some(t0().add_hours(1));
        repo.put(e).await;
        let handler = HandlePaymentFailedHandler::new(Arc::new(repo.clone()), Arc::new(FixedClock::new(t0())));

        let result = handler.handle(failed("p1")).await.unwrap();

        assert_eq!(result.paid_until, Some(t0().add_hours(1)));
        let stored = repo.find_by_payer(&AccountId::new("p1").unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.billing_status, BillingStatus::PastDue);
    }

    #[tokio::test]
    async fn unknown_payer_is_dropped() {
        let handler = HandlePaymentFailedHandler::new(
            Arc::new(InMemoryEntitlementRepository::new()),
            Arc::new(FixedClock::new(t0())),
        );

        let err = handler.handle(failed("ghost")).await.unwrap_err();

        assert!(matches!(err, WebhookError::UnknownPayer(_)));
    }
}
