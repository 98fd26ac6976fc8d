//! CancelSubscriptionHandler - Command handler for stopping auto-renewal.
//!
//! Cancelling stops future charges at the gateway and clears the stored
//! subscription and card token. The paid window is kept, so the payer
//! retains access until it lapses.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Principal};
use crate::domain::foundation::AccountId;
use crate::ports::{Clock, EntitlementRepository, PaymentGateway};

/// Command to cancel a payer's recurring subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub payer_id: AccountId,
    /// Who asked; must be the payer or an administrator.
    pub requested_by: Principal,
}

impl CancelSubscriptionCommand {
    /// The caller cancels their own subscription.
    pub fn own(principal: Principal) -> Self {
        Self {
            payer_id: principal.account_id.clone(),
            requested_by: principal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSubscriptionResult {
    /// False when there was nothing to cancel.
    pub cancelled: bool,
    pub subscription_id: Option<String>,
}

impl CancelSubscriptionResult {
    fn nothing_to_cancel() -> Self {
        Self {
            cancelled: false,
            subscription_id: None,
        }
    }
}

pub struct CancelSubscriptionHandler {
    entitlements: Arc<dyn EntitlementRepository>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        entitlements: Arc<dyn EntitlementRepository>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entitlements,
            gateway,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        let on_behalf = cmd.requested_by.account_id != cmd.payer_id;
        if on_behalf && !cmd.requested_by.is_admin {
            return Err(BillingError::Forbidden);
        }

        // 1. Find the subscription on file
        let entitlement = match self.entitlements.find_by_payer(&cmd.payer_id).await? {
            Some(entitlement) => entitlement,
            None if on_behalf => return Err(BillingError::not_found(cmd.payer_id)),
            None => return Ok(CancelSubscriptionResult::nothing_to_cancel()),
        };
        let Some(subscription_id) = entitlement.gateway_subscription_id else {
            tracing::debug!(payer_id = %cmd.payer_id, "no subscription on file, cancel is a no-op");
            return Ok(CancelSubscriptionResult::nothing_to_cancel());
        };

        // 2. Stop charges at the gateway
        self.gateway
            .cancel_subscription(&subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    payer_id = %cmd.payer_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "gateway cancel failed"
                );
                BillingError::gateway(e.to_string())
            })?;

        // 3. Clear local state, unless a different subscription arrived meanwhile
        let now = self.clock.now();
        let cancelled_id = subscription_id.clone();
        let change = self
            .entitlements
            .modify(
                &cmd.payer_id,
                Box::new(move |entitlement| {
                    if entitlement.gateway_subscription_id.as_deref() == Some(cancelled_id.as_str()) {
                        entitlement.cancel(now);
                    }
                }),
            )
            .await?;

        if change.as_ref().is_some_and(|c| !c.changed()) {
            tracing::warn!(
                payer_id = %cmd.payer_id,
                subscription_id = %subscription_id,
                "subscription on file changed during cancel, local state kept"
            );
        }

        tracing::info!(
            payer_id = %cmd.payer_id,
            subscription_id = %subscription_id,
            by_admin = on_behalf,
            "subscription cancelled"
        );

        Ok(CancelSubscriptionResult {
            cancelled: true,
            subscription_id: Some(subscription_id),
        })
    }
}
