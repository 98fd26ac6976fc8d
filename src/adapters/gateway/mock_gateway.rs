//! Mock payment gateway for testing.
//!
//! Records every call, returns sequential subscription ids and supports
//! error injection per operation.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::ports::{
    CreateRecurringSubscription, GatewayError, GatewaySubscription, PaymentGateway,
};

/// Mock `PaymentGateway`.
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.fail_next_create(GatewayError::timeout());
/// // ... exercise the handler ...
/// assert_eq!(gateway.created().len(), 1);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    created: Vec<CreateRecurringSubscription>,
    cancelled: Vec<String>,
    next_create_error: Option<GatewayError>,
    next_cancel_error: Option<GatewayError>,
    sequence: u32,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the next create call fail with `error`.
    pub fn fail_next_create(&self, error: GatewayError) {
        self.state().next_create_error = Some(error);
    }

    /// Makes the next cancel call fail with `error`.
    pub fn fail_next_cancel(&self, error: GatewayError) {
        self.state().next_cancel_error = Some(error);
    }

    /// Create requests received, including failed ones.
    pub fn created(&self) -> Vec<CreateRecurringSubscription> {
        self.state().created.clone()
    }

    /// Subscription ids cancel was called with, including failed ones.
    pub fn cancelled(&self) -> Vec<String> {
        self.state().cancelled.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_recurring_subscription(
        &self,
        request: CreateRecurringSubscription,
    ) -> Result<GatewaySubscription, GatewayError> {
        let mut state = self.state();
        state.created.push(request);
        if let Some(error) = state.next_create_error.take() {
            return Err(error);
        }
        state.sequence += 1;
        Ok(GatewaySubscription {
            id: format!("sc_mock_{}", state.sequence),
            status: Some("Active".to_string()),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.cancelled.push(subscription_id.to_string());
        match state.next_cancel_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
