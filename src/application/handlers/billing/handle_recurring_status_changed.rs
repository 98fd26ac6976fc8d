//! HandleRecurringStatusChangedHandler - records the gateway's view of a recurring subscription.

use std::sync::Arc;

use crate::domain::billing::{BillingStatus, RecurringStatusChanged, WebhookError};
use crate::domain::foundation::AccountId;
use crate::ports::{Clock, EntitlementRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleRecurringStatusChangedResult {
    pub payer_id: AccountId,
    pub billing_status: BillingStatus,
    pub changed: bool,
}

/// Maps the reported status and stores it with the subscription id.
///
/// A terminal status clears the id on file instead of storing it. Reports
/// about a subscription other than the live one are ignored.
///
/// Never extends or shortens `paid_until`; only a successful charge moves it.
pub struct HandleRecurringStatusChangedHandler {
    entitlements: Arc<dyn EntitlementRepository>,
    clock: Arc<dyn Clock>,
}

impl HandleRecurringStatusChangedHandler {
    pub fn new(entitlements: Arc<dyn EntitlementRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entitlements,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: RecurringStatusChanged,
    ) -> Result<HandleRecurringStatusChangedResult, WebhookError> {
        let Some(status) = cmd.status.to_billing_status() else {
            tracing::warn!(
                payer_id = %cmd.payer_id,
                gateway_status = %cmd.status,
                "unknown gateway subscription status, entitlement left unchanged"
            );
            return Err(WebhookError::Ignored(format!(
                "unknown gateway status '{}'",
                cmd.status
            )));
        };

        let now = self.clock.now();
        let subscription_id = cmd.gateway_subscription_id.clone();
        let change = self
            .entitlements
            .modify(
                &cmd.payer_id,
                Box::new(move |entitlement| {
                    entitlement.apply_gateway_status(status, subscription_id.as_deref(), now);
                }),
            )
            .await?
            .ok_or_else(|| WebhookError::UnknownPayer(cmd.payer_id.clone()))?;

        if !change
            .before
            .concerns_subscription(cmd.gateway_subscription_id.as_deref())
        {
            tracing::info!(
                payer_id = %cmd.payer_id,
                subscription_id = ?cmd.gateway_subscription_id,
                on_file = ?change.before.gateway_subscription_id,
                gateway_status = %cmd.status,
                "status for a superseded subscription ignored"
            );
            return Err(WebhookError::Ignored(format!(
                "subscription {:?} is not the one on file",
                cmd.gateway_subscription_id
            )));
        }

        tracing::info!(
            payer_id = %cmd.payer_id,
            subscription_id = ?cmd.gateway_subscription_id,
            from = %change.before.billing_status,
            to = %status,
            "subscription status recorded"
        );

        Ok(HandleRecurringStatusChangedResult {
            payer_id: cmd.payer_id,
            billing_status: status,
            changed: change.before.billing_status != change.after.billing_status,
        })
    }
}
