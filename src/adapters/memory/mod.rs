//! In-memory adapters for every storage port.
//!
//! Used by the test suites and for running the service without PostgreSQL
//! or Redis. State lives in the process and is lost on restart.

mod delegation_reader;
mod entitlement_repository;
mod processed_notification_store;
mod referral_repository;

pub use delegation_reader::InMemoryDelegationReader;
pub use entitlement_repository::InMemoryEntitlementRepository;
pub use processed_notification_store::InMemoryProcessedNotificationStore;
pub use referral_repository::InMemoryReferralRepository;
