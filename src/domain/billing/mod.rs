//! Billing domain.
//!
//! Entitlements, the access rules derived from them, gateway notifications
//! and their signature verification.

mod access;
mod delegation;
mod entitlement;
mod errors;
mod notification;
mod referral;
mod signature;
mod status;
mod webhook_errors;

pub use access::{resolve, AccessDecision, AccessReason, Principal};
pub use delegation::DelegationLink;
pub use entitlement::{Entitlement, PaymentApplied, PaymentDetails, BILLING_PERIOD_MONTHS};
pub use errors::BillingError;
pub use notification::{
    mask_card, Correlation, GatewayNotification, NotificationFields, NotificationKind,
    PaymentFailed, PaymentSucceeded, RecurringStatusChanged,
};
pub use referral::ReferralAttribution;
pub use signature::{
    canonical_form, BodyForm, Candidate, KeyForm, SignatureHeaders, SignatureMatch,
    SignatureVerifier, CANDIDATES, CONTENT_HMAC_HEADER, X_CONTENT_HMAC_HEADER,
};
pub use status::{BillingStatus, GatewayStatus};
pub use webhook_errors::{WebhookError, GATEWAY_CODE_ACCEPTED, GATEWAY_CODE_REJECTED};
