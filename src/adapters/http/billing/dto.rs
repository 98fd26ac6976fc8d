//! HTTP DTOs for billing endpoints.
//!
//! Timestamps are rendered as RFC 3339 strings. The stored card token never
//! appears in any response.

use serde::Serialize;

use crate::application::{BillingStatusView, CancelSubscriptionResult};
use crate::domain::billing::{AccessDecision, AccessReason, BillingStatus, WebhookError};
use crate::domain::foundation::Timestamp;

// ════════════════════════════════════════════════════════════════════════════════
// Webhook acknowledgement
// ════════════════════════════════════════════════════════════════════════════════

/// Body returned to the gateway for every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayAck {
    pub code: i32,
}

impl GatewayAck {
    pub fn accepted() -> Self {
        Self {
            code: crate::domain::billing::GATEWAY_CODE_ACCEPTED,
        }
    }

    pub fn for_error(error: &WebhookError) -> Self {
        Self {
            code: error.gateway_code(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessResponse {
    pub ok: bool,
    pub reason: AccessReason,
}

impl From<AccessDecision> for AccessResponse {
    fn from(decision: AccessDecision) -> Self {
        Self {
            ok: decision.ok,
            reason: decision.reason,
        }
    }
}

/// Billing state of the caller.
#[derive(Debug, Clone, Serialize)]
pub struct BillingStatusResponse {
    /// End of the free trial (ISO 8601).
    pub trial_ends_at: Option<String>,
    pub billing_status: BillingStatus,
    /// End of purchased access (ISO 8601).
    pub paid_until: Option<String>,
    pub gateway_subscription_id: Option<String>,
    /// Masked card descriptor.
    pub card_fingerprint: Option<String>,
    pub billing_updated_at: Option<String>,
    pub access: AccessResponse,
}

fn iso(ts: Option<Timestamp>) -> Option<String> {
    ts.map(|t| t.as_datetime().to_rfc3339())
}

impl From<BillingStatusView> for BillingStatusResponse {
    fn from(view: BillingStatusView) -> Self {
        Self {
            trial_ends_at: iso(view.trial_ends_at),
            billing_status: view.billing_status,
            paid_until: iso(view.paid_until),
            gateway_subscription_id: view.gateway_subscription_id,
            card_fingerprint: view.card_fingerprint,
            billing_updated_at: iso(view.billing_updated_at),
            access: view.access.into(),
        }
    }
}

/// Result of a cancel request.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    /// False when there was no subscription to cancel.
    pub cancelled: bool,
}

impl From<CancelSubscriptionResult> for CancelResponse {
    fn from(result: CancelSubscriptionResult) -> Self {
        Self {
            cancelled: result.cancelled,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
