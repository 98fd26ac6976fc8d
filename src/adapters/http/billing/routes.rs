//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    admin_cancel_subscription, cancel_own_subscription, check_access, get_billing_status,
    receive_fail, receive_pay, receive_recurrent, BillingAppState,
};

/// Gateway notification routes.
///
/// No caller identity; every request is verified by its HMAC signature.
///
/// # Routes
/// - `POST /pay` - Charge succeeded
/// - `POST /recurrent` - Recurring subscription status changed
/// - `POST /fail` - Charge failed
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/pay", post(receive_pay))
        .route("/recurrent", post(receive_recurrent))
        .route("/fail", post(receive_fail))
}

/// Routes for the authenticated caller.
///
/// # Routes
/// - `GET /status` - Billing state and access
/// - `GET /access` - Access decision only
/// - `POST /cancel` - Stop auto-renewal
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/status", get(get_billing_status))
        .route("/access", get(check_access))
        .route("/cancel", post(cancel_own_subscription))
}

/// Administrator routes.
pub fn admin_routes() -> Router<BillingAppState> {
    Router::new().route("/:payer_id/cancel", post(admin_cancel_subscription))
}

/// Create the complete billing module router.
///
/// Mounts gateway webhooks at `/webhooks/gateway`, caller routes at `/billing`
/// and administrator routes at `/admin/billing`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/webhooks/gateway", webhook_routes())
        .nest("/billing", billing_routes())
        .nest("/admin/billing", admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_routes_creates_router() {
        let _router: Router<BillingAppState> = webhook_routes();
    }

    #[test]
    fn billing_routes_creates_router() {
        let _router: Router<BillingAppState> = billing_routes();
    }

    #[test]
    fn billing_router_creates_router() {
        let _router: Router<BillingAppState> = billing_router();
    }
}
