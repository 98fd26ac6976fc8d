//! Billing status and its mapping from gateway-reported subscription states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Last known health of a payer's recurring subscription.
///
/// Informational only: access follows the trial and paid windows, so a
/// `PastDue` payer still inside a paid window keeps access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    /// No payment has ever been observed.
    #[default]
    None,

    /// Last payment succeeded or the gateway reports the subscription healthy.
    Active,

    /// A charge failed; the gateway may still retry it.
    PastDue,

    /// Subscription stopped, by the payer or by the gateway.
    Cancelled,
}

impl BillingStatus {
    /// Storage representation, identical to the serde name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::None => "none",
            BillingStatus::Active => "active",
            BillingStatus::PastDue => "past_due",
            BillingStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(BillingStatus::None),
            "active" => Some(BillingStatus::Active),
            "past_due" => Some(BillingStatus::PastDue),
            "cancelled" => Some(BillingStatus::Cancelled),
            _ => None,
        }
    }

    /// The subscription will never charge again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BillingStatus::Cancelled)
    }
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription status string as reported by the gateway on a recurrent notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayStatus(String);

impl GatewayStatus {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps the gateway vocabulary onto [`BillingStatus`].
    ///
    /// Terminal states (cancelled, rejected, expired) all collapse into
    /// `Cancelled`. Returns `None` for statuses the engine does not know, which
    /// callers treat as a no-op.
    pub fn to_billing_status(&self) -> Option<BillingStatus> {
        let normalized: String = self
            .0
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "active" => Some(BillingStatus::Active),
            "pastdue" => Some(BillingStatus::PastDue),
            "cancelled" | "canceled" | "rejected" | "expired" => Some(BillingStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
