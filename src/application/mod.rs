//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers change entitlements; query handlers only read them, apart
//! from the one-time trial grant on first observation.

pub mod handlers;

pub use handlers::billing::{
    BillingStatusView, CancelSubscriptionCommand, CancelSubscriptionHandler,
    CancelSubscriptionResult, CheckAccessHandler, CheckAccessQuery, GetBillingStatusHandler,
    GetBillingStatusQuery, HandlePaymentFailedHandler, HandlePaymentSucceededHandler,
    HandleRecurringStatusChangedHandler, ReceiveNotificationCommand, ReceiveNotificationHandler,
    ReceiveNotificationResult, SubscriptionPlan,
};
