//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Entitlement, delegation and referral storage
//! - `redis` - Shared notification seen-set
//! - `memory` - In-process implementations for tests and local runs
//! - `gateway` - Payment gateway REST client
//! - `http` - Axum endpoints

pub mod gateway;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod redis;
