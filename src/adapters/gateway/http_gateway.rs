//! HTTP client for the gateway's subscription API.
//!
//! Requests use HTTP basic auth with the active mode's public id and API
//! secret. Each request is bounded by the configured timeout and is never
//! retried here.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::ports::{
    CreateRecurringSubscription, GatewayError, GatewaySubscription, PaymentGateway,
};

use super::wire::{ApiResponse, CancelSubscriptionBody, CreateSubscriptionBody, SubscriptionModel};

const DEFAULT_BASE_URL: &str = "https://api.cloudpayments.ru";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway API client configuration.
#[derive(Clone)]
pub struct GatewayClientConfig {
    public_id: String,
    api_secret: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl GatewayClientConfig {
    pub fn new(public_id: impl Into<String>, api_secret: SecretString) -> Self {
        Self {
            public_id: public_id.into(),
            api_secret,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `PaymentGateway` over the gateway's JSON API.
pub struct HttpPaymentGateway {
    config: GatewayClientConfig,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayClientConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.public_id, Some(self.config.api_secret.expose_secret()))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GatewayError::authentication(format!(
                "gateway refused credentials ({})",
                status
            )));
        }
        Ok(response)
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::timeout()
    } else {
        GatewayError::network(e.to_string())
    }
}

fn is_not_found_message(message: Option<&str>) -> bool {
    message.is_some_and(|m| m.to_ascii_lowercase().contains("not found"))
}

pub(crate) fn interpret_create(
    response: ApiResponse<SubscriptionModel>,
) -> Result<GatewaySubscription, GatewayError> {
    if !response.success {
        let message = response.message.unwrap_or_else(|| "request declined".to_string());
        return Err(GatewayError::rejected("subscription was not created").with_provider_message(message));
    }
    let model = response
        .model
        .ok_or_else(|| GatewayError::invalid_response("missing subscription model"))?;
    if model.id.trim().is_empty() {
        return Err(GatewayError::invalid_response("empty subscription id"));
    }
    Ok(GatewaySubscription {
        id: model.id,
        status: model.status,
    })
}

pub(crate) fn interpret_cancel(response: ApiResponse<serde_json::Value>) -> Result<(), GatewayError> {
    if response.success || is_not_found_message(response.message.as_deref()) {
        return Ok(());
    }
    let message = response.message.unwrap_or_else(|| "request declined".to_string());
    Err(GatewayError::rejected("subscription was not cancelled").with_provider_message(message))
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_recurring_subscription(
        &self,
        request: CreateRecurringSubscription,
    ) -> Result<GatewaySubscription, GatewayError> {
        let body = CreateSubscriptionBody::from_request(&request);
        let response = self.post("/subscriptions/create", &body).await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                payer_id = %request.payer_id,
                status = %status,
                "gateway rejected subscription create"
            );
            return Err(GatewayError::rejected(format!("gateway returned {}", status))
                .with_provider_message(error_text));
        }

        let parsed: ApiResponse<SubscriptionModel> = response
            .json()
            .await
            .map_err(|e| GatewayError::invalid_response(format!("unparseable response: {}", e)))?;

        interpret_create(parsed)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
        let body = CancelSubscriptionBody { id: subscription_id };
        let response = self.post("/subscriptions/cancel", &body).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::info!(subscription_id, "subscription unknown to gateway, treating as cancelled");
            return Ok(());
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::rejected(format!("gateway returned {}", status))
                .with_provider_message(error_text));
        }

        let parsed: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| GatewayError::invalid_response(format!("unparseable response: {}", e)))?;

        interpret_cancel(parsed)
    }
}
