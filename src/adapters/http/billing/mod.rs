//! HTTP adapter for billing endpoints.
//!
//! - `POST /webhooks/gateway/{pay,recurrent,fail}` - Gateway notifications
//! - `GET /billing/status` - Caller's billing state
//! - `GET /billing/access` - Caller's access decision
//! - `POST /billing/cancel` - Cancel the caller's subscription
//! - `POST /admin/billing/{payer_id}/cancel` - Cancel on behalf of a payer

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedPrincipal, BillingAppState, USER_ADMIN_HEADER, USER_ID_HEADER};
pub use routes::billing_router;
