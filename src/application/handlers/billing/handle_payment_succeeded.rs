//! HandlePaymentSucceededHandler - applies a successful charge to the payer's entitlement.
//!
//! The paid period is extended in one atomic update ([`HandlePaymentSucceededHandler::apply`]).
//! Everything after that commit (recurring subscription registration, storing
//! its id, referral marking) is best effort: failures are logged and never
//! surface as a retryable error, since a redelivery would extend the paid
//! period again.

use std::sync::Arc;

use crate::config::BillingConfig;
use crate::domain::billing::{PaymentApplied, PaymentSucceeded, WebhookError};
use crate::domain::foundation::{AccountId, Timestamp};
use crate::ports::{
    BillingInterval, Clock, CreateRecurringSubscription, EntitlementRepository, PaymentGateway,
    ReferralRepository,
};

/// Price and wording of the recurring subscription registered after a first payment.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPlan {
    pub amount: f64,
    pub currency: String,
    pub description: String,
}

impl SubscriptionPlan {
    pub fn from_config(config: &BillingConfig) -> Self {
        Self {
            amount: config.monthly_price,
            currency: config.currency_code(),
            description: config.description.clone(),
        }
    }
}

/// Result of applying a successful payment.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlePaymentSucceededResult {
    pub payer_id: AccountId,
    pub previous_paid_until: Option<Timestamp>,
    pub paid_until: Timestamp,
    /// The charge belongs to an existing recurring subscription.
    pub recurring: bool,
    /// Subscription registered at the gateway by this call, if any.
    pub subscription_created: Option<String>,
}

pub struct HandlePaymentSucceededHandler {
    entitlements: Arc<dyn EntitlementRepository>,
    referrals: Arc<dyn ReferralRepository>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    plan: SubscriptionPlan,
}

impl HandlePaymentSucceededHandler {
    pub fn new(
        entitlements: Arc<dyn EntitlementRepository>,
        referrals: Arc<dyn ReferralRepository>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        plan: SubscriptionPlan,
    ) -> Self {
        Self {
            entitlements,
            referrals,
            gateway,
            clock,
            plan,
        }
    }

    pub async fn handle(
        &self,
        cmd: PaymentSucceeded,
    ) -> Result<HandlePaymentSucceededResult, WebhookError> {
        let applied = self.apply(&cmd).await?;
        Ok(self.complete(cmd, applied).await)
    }

    /// Extends the paid window in one atomic update.
    ///
    /// Once this returns `Ok` the payment is committed; a redelivery would
    /// extend the window again.
    pub async fn apply(&self, cmd: &PaymentSucceeded) -> Result<PaymentApplied, WebhookError> {
        let now = self.clock.now();
        let details = cmd.details();

        let update_details = details.clone();
        let change = self
            .entitlements
            .modify(
                &cmd.payer_id,
                Box::new(move |entitlement| {
                    entitlement.record_payment(&update_details, now);
                }),
            )
            .await?
            .ok_or_else(|| WebhookError::UnknownPayer(cmd.payer_id.clone()))?;

        // record_payment is deterministic, so replaying it on the locked
        // snapshot reproduces what was committed.
        let applied = change.before.clone().record_payment(&details, now);

        tracing::info!(
            payer_id = %cmd.payer_id,
            invoice_id = ?cmd.correlation.invoice_id,
            transaction_id = ?cmd.correlation.transaction_id,
            paid_until = %applied.paid_until.as_datetime(),
            recurring = applied.recurring,
            "payment applied"
        );
        Ok(applied)
    }

    /// Side effects after the commit. Failures are logged, never returned.
    pub async fn complete(
        &self,
        cmd: PaymentSucceeded,
        applied: PaymentApplied,
    ) -> HandlePaymentSucceededResult {
        // First payment with a card token: register auto-renewal
        let subscription_created = match applied.subscription_token.clone() {
            Some(token) => self.register_recurring(&cmd, token, applied.paid_until).await,
            None => {
                if !applied.recurring {
                    tracing::info!(payer_id = %cmd.payer_id, "one-off payment, no auto-renewal");
                }
                None
            }
        };

        self.mark_referral(&cmd.payer_id, self.clock.now()).await;

        HandlePaymentSucceededResult {
            payer_id: cmd.payer_id,
            previous_paid_until: applied.previous_paid_until,
            paid_until: applied.paid_until,
            recurring: applied.recurring,
            subscription_created,
        }
    }

    async fn register_recurring(
        &self,
        cmd: &PaymentSucceeded,
        card_token: String,
        start_date: Timestamp,
    ) -> Option<String> {
        let request = CreateRecurringSubscription {
            card_token,
            payer_id: cmd.payer_id.clone(),
            description: self.plan.description.clone(),
            amount: self.plan.amount,
            currency: self.plan.currency.clone(),
            start_date,
            interval: BillingInterval::Month,
            period: 1,
        };

        let subscription = match self.gateway.create_recurring_subscription(request).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!(
                    payer_id = %cmd.payer_id,
                    transaction_id = ?cmd.correlation.transaction_id,
                    error = %e,
                    "recurring subscription not created, payer left without auto-renewal"
                );
                return None;
            }
        };

        let subscription_id = subscription.id.clone();
        let attach_id = subscription.id;
        let now = self.clock.now();
        match self
            .entitlements
            .modify(
                &cmd.payer_id,
                Box::new(move |entitlement| {
                    entitlement.attach_subscription(&attach_id, now);
                }),
            )
            .await
        {
            Ok(Some(change))
                if change.after.gateway_subscription_id.as_deref() == Some(subscription_id.as_str()) =>
            {
                tracing::info!(
                    payer_id = %cmd.payer_id,
                    subscription_id = %subscription_id,
                    "recurring subscription registered"
                );
            }
            Ok(Some(change)) => {
                tracing::warn!(
                    payer_id = %cmd.payer_id,
                    subscription_id = %subscription_id,
                    on_file = ?change.after.gateway_subscription_id,
                    "another subscription already on file, cancelling the new one"
                );
                self.cancel_unstored(&cmd.payer_id, &subscription_id).await;
                return None;
            }
            Ok(None) => {
                tracing::warn!(
                    payer_id = %cmd.payer_id,
                    subscription_id = %subscription_id,
                    "payer disappeared before subscription could be stored"
                );
                self.cancel_unstored(&cmd.payer_id, &subscription_id).await;
                return None;
            }
            Err(e) => {
                tracing::error!(
                    payer_id = %cmd.payer_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "failed to store recurring subscription"
                );
            }
        }

        Some(subscription_id)
    }

    /// Stops a subscription that lost the race to be stored, so it never charges.
    async fn cancel_unstored(&self, payer_id: &AccountId, subscription_id: &str) {
        if let Err(e) = self.gateway.cancel_subscription(subscription_id).await {
            tracing::error!(
                payer_id = %payer_id,
                subscription_id = %subscription_id,
                error = %e,
                "failed to cancel unstored subscription, payer may be charged twice"
            );
        }
    }

    async fn mark_referral(&self, payer_id: &AccountId, now: Timestamp) {
        match self.referrals.mark_first_paid(payer_id, now).await {
            Ok(true) => tracing::info!(payer_id = %payer_id, "referral first payment recorded"),
            Ok(false) => {}
            Err(e) => tracing::warn!(
                payer_id = %payer_id,
                error = %e,
                "failed to record referral first payment"
            ),
        }
    }
}
