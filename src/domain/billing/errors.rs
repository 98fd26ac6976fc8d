//! Billing-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | EntitlementNotFound | 404 |
//! | Unauthorized | 401 |
//! | Forbidden | 403 |
//! | Gateway | 502 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{AccountId, DomainError, ErrorCode};

/// Errors returned by billing commands and queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// No entitlement exists for this payer.
    EntitlementNotFound(AccountId),

    /// Caller did not identify itself.
    Unauthorized,

    /// Caller lacks the privilege for this operation.
    Forbidden,

    /// The payment gateway rejected or failed a request.
    Gateway { reason: String },

    /// Input failed validation.
    ValidationFailed { field: String, message: String },

    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl BillingError {
    pub fn not_found(payer_id: AccountId) -> Self {
        BillingError::EntitlementNotFound(payer_id)
    }

    pub fn gateway(reason: impl Into<String>) -> Self {
        BillingError::Gateway {
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::EntitlementNotFound(_) => ErrorCode::EntitlementNotFound,
            BillingError::Unauthorized => ErrorCode::Unauthorized,
            BillingError::Forbidden => ErrorCode::Forbidden,
            BillingError::Gateway { .. } => ErrorCode::ExternalServiceError,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::EntitlementNotFound(id) => {
                format!("No billing entitlement found for {}", id)
            }
            BillingError::Unauthorized => "Authentication required".to_string(),
            BillingError::Forbidden => "Administrator privileges required".to_string(),
            BillingError::Gateway { reason } => format!("Payment gateway error: {}", reason),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Infrastructure(_) | BillingError::Gateway { .. }
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::Unauthorized => BillingError::Unauthorized,
            ErrorCode::Forbidden => BillingError::Forbidden,
            ErrorCode::ExternalServiceError => BillingError::Gateway {
                reason: err.message,
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}
