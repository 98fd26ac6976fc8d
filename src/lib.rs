//! Billing Reconciler - subscription entitlements driven by payment gateway notifications
//!
//! This crate keeps per-account paid access in step with a hosted payment
//! gateway: it verifies and applies the gateway's webhooks, answers access
//! checks (including trials and delegated access), and cancels recurring
//! subscriptions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
