//! Payment gateway port.
//!
//! The synchronous half of the gateway integration: registering a recurring
//! subscription from a one-time card token and cancelling it. Inbound
//! notifications are handled separately.
//!
//! Calls are never retried automatically; a repeated create would register
//! a second subscription.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, DomainError, Timestamp};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers a monthly recurring charge starting at `request.start_date`.
    async fn create_recurring_subscription(
        &self,
        request: CreateRecurringSubscription,
    ) -> Result<GatewaySubscription, GatewayError>;

    /// Cancels a recurring subscription.
    ///
    /// A subscription the gateway no longer knows is treated as cancelled.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError>;
}

/// Billing interval of a recurring subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingInterval {
    Day,
    Week,
    Month,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Day => "Day",
            BillingInterval::Week => "Week",
            BillingInterval::Month => "Month",
        }
    }
}

/// Request to register a recurring subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRecurringSubscription {
    /// One-time card token from a completed payment.
    pub card_token: String,

    /// Payer the gateway will report in notifications.
    pub payer_id: AccountId,

    /// Text shown on the payer's statement.
    pub description: String,

    /// Amount charged per period, in major currency units.
    pub amount: f64,

    /// ISO 4217 code.
    pub currency: String,

    /// First charge date; never earlier than the payer's current paid window end.
    pub start_date: Timestamp,

    pub interval: BillingInterval,

    /// Number of intervals between charges.
    pub period: u32,
}

/// A subscription registered at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySubscription {
    pub id: String,
    pub status: Option<String>,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,

    /// Gateway's own error text, if it sent one.
    pub provider_message: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_message: None,
        }
    }

    pub fn with_provider_message(mut self, message: impl Into<String>) -> Self {
        self.provider_message = Some(message.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout() -> Self {
        Self::new(GatewayErrorCode::Timeout, "gateway request timed out")
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Rejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }

    /// True for transient failures. Callers still decide whether retrying is safe.
    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        use crate::domain::foundation::ErrorCode;

        DomainError::new(ErrorCode::ExternalServiceError, err.to_string())
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorCode {
    /// Connection could not be established or was dropped.
    NetworkError,

    /// No response within the configured timeout.
    Timeout,

    /// Credentials were refused.
    AuthenticationError,

    /// Request reached the gateway and was declined (`Success: false`).
    Rejected,

    /// Response body could not be understood.
    InvalidResponse,
}

impl GatewayErrorCode {
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayErrorCode::NetworkError | GatewayErrorCode::Timeout)
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::Rejected => "rejected",
            GatewayErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn transient_codes() {
        assert!(GatewayError::timeout().is_transient());
        assert!(GatewayError::network("reset").is_transient());
        assert!(!GatewayError::rejected("card expired").is_transient());
        assert!(!GatewayError::authentication("bad key").is_transient());
    }

    #[test]
    fn displays_code_and_message() {
        let err = GatewayError::rejected("Subscription not allowed");
        assert_eq!(err.to_string(), "rejected: Subscription not allowed");
    }

    #[test]
    fn converts_to_external_service_domain_error() {
        let err: DomainError = GatewayError::timeout().into();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }

    #[test]
    fn interval_wire_names() {
        assert_eq!(BillingInterval::Month.as_str(), "Month");
    }
}
