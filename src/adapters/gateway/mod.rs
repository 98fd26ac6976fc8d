//! Payment gateway adapters.
//!
//! - `HttpPaymentGateway` - JSON API client with basic auth
//! - `MockPaymentGateway` - call-recording mock for tests

mod http_gateway;
mod mock_gateway;
mod wire;

pub use http_gateway::{GatewayClientConfig, HttpPaymentGateway};
pub use mock_gateway::MockPaymentGateway;
