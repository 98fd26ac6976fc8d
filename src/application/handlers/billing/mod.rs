//! Billing handlers.
//!
//! ## Commands
//! - Receiving gateway notifications (verify, de-duplicate, dispatch)
//! - Applying successful payments, subscription status changes and failed charges
//! - Cancelling a recurring subscription
//!
//! ## Queries
//! - Access decision for a principal
//! - Billing status of a principal

mod cancel_subscription;
mod check_access;
mod get_billing_status;
mod handle_payment_failed;
mod handle_payment_succeeded;
mod handle_recurring_status_changed;
mod receive_notification;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use handle_payment_failed::{HandlePaymentFailedHandler, HandlePaymentFailedResult};
pub use handle_payment_succeeded::{
    HandlePaymentSucceededHandler, HandlePaymentSucceededResult, SubscriptionPlan,
};
pub use handle_recurring_status_changed::{
    HandleRecurringStatusChangedHandler, HandleRecurringStatusChangedResult,
};
pub use receive_notification::{
    ReceiveNotificationCommand, ReceiveNotificationHandler, ReceiveNotificationResult,
};

// Queries
pub use check_access::{CheckAccessHandler, CheckAccessQuery};
pub use get_billing_status::{BillingStatusView, GetBillingStatusHandler, GetBillingStatusQuery};
