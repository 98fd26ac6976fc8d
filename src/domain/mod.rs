//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Entitlements, access rules and gateway notifications

pub mod billing;
pub mod foundation;
