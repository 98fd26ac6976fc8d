//! Entitlement aggregate.
//!
//! One entitlement exists per payer. It records the trial window, the paid
//! window and the gateway linkage. Rows are created lazily and never
//! deleted; only their fields change.
//!
//! # Invariants
//!
//! - `trial_ends_at` is set at most once and never moves.
//! - `paid_until` only moves forward, and only through [`Entitlement::record_payment`].

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Timestamp};

use super::BillingStatus;

/// Calendar months granted by one successful payment.
pub const BILLING_PERIOD_MONTHS: u32 = 1;

/// Durable billing state of a payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Payer who owns this entitlement.
    pub payer_id: AccountId,

    /// End of the one-time free trial, once granted.
    pub trial_ends_at: Option<Timestamp>,

    /// End of currently purchased access.
    pub paid_until: Option<Timestamp>,

    /// Last gateway-reported subscription health.
    pub billing_status: BillingStatus,

    /// Handle of the recurring subscription at the gateway.
    pub gateway_subscription_id: Option<String>,

    /// Masked card descriptor for display.
    pub card_fingerprint: Option<String>,

    /// One-time card token captured from the first payment.
    #[serde(skip_serializing)]
    pub card_token: Option<String>,

    /// Last time any billing field changed.
    pub billing_updated_at: Timestamp,
}

/// Card and subscription details carried by a successful payment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentDetails {
    pub card_token: Option<String>,
    pub gateway_subscription_id: Option<String>,
    pub card_fingerprint: Option<String>,
}

/// What a recorded payment did to the entitlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentApplied {
    /// Paid window end before the payment.
    pub previous_paid_until: Option<Timestamp>,

    /// Paid window end after the payment.
    pub paid_until: Timestamp,

    /// A gateway subscription was already on file or arrived with the payment.
    pub recurring: bool,

    /// Card token to register a recurring subscription with, for first payments.
    pub subscription_token: Option<String>,
}

impl Entitlement {
    /// Creates an empty entitlement: no trial, no paid window, status `none`.
    pub fn new(payer_id: AccountId, now: Timestamp) -> Self {
        Self {
            payer_id,
            trial_ends_at: None,
            paid_until: None,
            billing_status: BillingStatus::None,
            gateway_subscription_id: None,
            card_fingerprint: None,
            card_token: None,
            billing_updated_at: now,
        }
    }

    /// Creates an entitlement whose trial starts now.
    pub fn with_trial(payer_id: AccountId, now: Timestamp, trial_days: u32) -> Self {
        let mut entitlement = Self::new(payer_id, now);
        entitlement.grant_trial(now, trial_days);
        entitlement
    }

    /// True while nothing has ever been granted or paid.
    ///
    /// This is the guard for the one-time trial grant; it becomes false
    /// forever once any window or status is recorded.
    pub fn is_pristine(&self) -> bool {
        self.trial_ends_at.is_none()
            && self.paid_until.is_none()
            && self.billing_status == BillingStatus::None
    }

    /// Grants the trial window if the entitlement is still pristine.
    ///
    /// Returns whether a trial was granted.
    pub fn grant_trial(&mut self, now: Timestamp, trial_days: u32) -> bool {
        if !self.is_pristine() {
            return false;
        }
        self.trial_ends_at = Some(now.add_days(i64::from(trial_days)));
        self.billing_updated_at = now;
        true
    }

    /// Start of the next paid period: the latest of now, the paid window and the trial.
    ///
    /// Paying mid-trial or mid-period never wastes access already held.
    pub fn next_period_start(&self, now: Timestamp) -> Timestamp {
        now.latest_of(&[self.paid_until, self.trial_ends_at])
    }

    /// Applies a successful payment.
    ///
    /// Extends `paid_until` by one billing period from [`Self::next_period_start`],
    /// stores card and subscription details and marks the status active.
    pub fn record_payment(&mut self, details: &PaymentDetails, now: Timestamp) -> PaymentApplied {
        let previous_paid_until = self.paid_until;
        let paid_until = self.next_period_start(now).add_months(BILLING_PERIOD_MONTHS);
        self.paid_until = Some(paid_until);

        if let Some(subscription_id) = non_empty(&details.gateway_subscription_id) {
            self.gateway_subscription_id = Some(subscription_id);
        }
        if let Some(fingerprint) = non_empty(&details.card_fingerprint) {
            self.card_fingerprint = Some(fingerprint);
        }
        let token = non_empty(&details.card_token);
        if let Some(token) = &token {
            self.card_token = Some(token.clone());
        }

        let recurring = self.gateway_subscription_id.is_some();
        self.billing_status = BillingStatus::Active;
        self.billing_updated_at = now;

        PaymentApplied {
            previous_paid_until,
            paid_until,
            recurring,
            subscription_token: if recurring { None } else { token },
        }
    }

    /// Stores a freshly created gateway subscription.
    ///
    /// Does nothing if another subscription is already on file, so a late
    /// response never overwrites a newer handle.
    pub fn attach_subscription(&mut self, subscription_id: &str, now: Timestamp) -> bool {
        if self.gateway_subscription_id.is_some() {
            return false;
        }
        self.gateway_subscription_id = Some(subscription_id.to_string());
        self.billing_updated_at = now;
        true
    }

    /// False when `subscription_id` names a different subscription than the
    /// live one on file.
    pub fn concerns_subscription(&self, subscription_id: Option<&str>) -> bool {
        match (self.gateway_subscription_id.as_deref(), reported_id(subscription_id)) {
            (Some(current), Some(reported)) => current == reported,
            _ => true,
        }
    }

    /// Records a gateway-reported subscription status. Never touches `paid_until`.
    ///
    /// A report about another subscription than the one on file is ignored
    /// and `false` is returned. A terminal status clears the stored id and
    /// never attaches one, so the next tokenized payment registers a fresh
    /// subscription.
    pub fn apply_gateway_status(
        &mut self,
        status: BillingStatus,
        subscription_id: Option<&str>,
        now: Timestamp,
    ) -> bool {
        if !self.concerns_subscription(subscription_id) {
            return false;
        }
        self.billing_status = status;
        if status.is_terminal() {
            self.gateway_subscription_id = None;
        } else if let Some(id) = reported_id(subscription_id) {
            self.gateway_subscription_id = Some(id.to_string());
        }
        self.billing_updated_at = now;
        true
    }

    /// Marks a failed charge. Never touches `paid_until`.
    pub fn mark_past_due(&mut self, now: Timestamp) {
        self.billing_status = BillingStatus::PastDue;
        self.billing_updated_at = now;
    }

    /// Stops auto-renewal locally. The paid window is kept.
    pub fn cancel(&mut self, now: Timestamp) {
        self.billing_status = BillingStatus::Cancelled;
        self.gateway_subscription_id = None;
        self.card_token = None;
        self.billing_updated_at = now;
    }
}

fn reported_id(subscription_id: Option<&str>) -> Option<&str> {
    subscription_id.map(str::trim).filter(|id| !id.is_empty())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
