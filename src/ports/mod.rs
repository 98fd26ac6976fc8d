//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `EntitlementRepository` - Per-payer entitlement with atomic updates
//! - `DelegationReader` - Beneficiary → payer links
//! - `ReferralRepository` - First-payment marking of referral attributions
//! - `ProcessedNotificationStore` - Seen-set for gateway notifications
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Recurring subscription create/cancel
//! - `Clock` - Injectable current time

mod clock;
mod delegation_reader;
mod entitlement_repository;
mod payment_gateway;
mod processed_notification_store;
mod referral_repository;

pub use clock::{Clock, FixedClock, SystemClock};
pub use delegation_reader::DelegationReader;
pub use entitlement_repository::{EntitlementChange, EntitlementRepository, EntitlementUpdate};
pub use payment_gateway::{
    BillingInterval, CreateRecurringSubscription, GatewayError, GatewayErrorCode,
    GatewaySubscription, PaymentGateway,
};
pub use processed_notification_store::{ClaimOutcome, ProcessedNotificationStore};
pub use referral_repository::ReferralRepository;
