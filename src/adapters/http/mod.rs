//! HTTP adapters - REST API implementations.

pub mod billing;

use axum::{routing::get, Router};

pub use billing::billing_router;
pub use billing::BillingAppState;

/// Liveness check.
async fn health() -> &'static str {
    "ok"
}

/// Full application router with state applied.
pub fn app_router(state: BillingAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(billing_router())
        .with_state(state)
}
