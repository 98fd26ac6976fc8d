//! Error types for inbound gateway notifications.
//!
//! The gateway only distinguishes "accepted" from "retry", so every variant
//! maps to an HTTP status and to the gateway's numeric response code.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode};

/// Response code the gateway treats as "accepted, do not retry".
pub const GATEWAY_CODE_ACCEPTED: i32 = 0;

/// Response code the gateway treats as "rejected".
pub const GATEWAY_CODE_REJECTED: i32 = 13;

/// Errors that occur while receiving a gateway notification.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signature header matched any accepted candidate.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body could not be decoded as form or JSON.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field absent or blank.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Notification references a payer with no entitlement.
    #[error("Unknown payer: {0}")]
    UnknownPayer(AccountId),

    /// Notification was authentic but deliberately not applied.
    #[error("Notification ignored: {0}")]
    Ignored(String),

    /// Entitlement store failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Seen-set store failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Another worker is still applying the same notification.
    #[error("Notification in flight: {0}")]
    InFlight(String),
}

impl WebhookError {
    /// True when processing may succeed on redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::StorageError(_) | WebhookError::InFlight(_)
        )
    }

    /// HTTP status returned to the gateway.
    ///
    /// Authentic notifications that cannot be applied are acknowledged with
    /// 200 so the gateway stops redelivering them.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,

            WebhookError::ParseError(_)
            | WebhookError::MissingField(_)
            | WebhookError::UnknownPayer(_)
            | WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::Database(_)
            | WebhookError::StorageError(_)
            | WebhookError::InFlight(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Numeric code placed in the `{"code": n}` response body.
    pub fn gateway_code(&self) -> i32 {
        if self.status_code().is_success() {
            GATEWAY_CODE_ACCEPTED
        } else {
            GATEWAY_CODE_REJECTED
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::CacheError => WebhookError::StorageError(err.message),
            _ => WebhookError::Database(err.message),
        }
    }
}
