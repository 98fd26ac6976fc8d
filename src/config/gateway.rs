//! Payment gateway configuration
//!
//! The gateway issues separate credential pairs for live and test traffic.
//! `mode` selects which pair the outbound client uses; the other may be absent.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Live,
    #[default]
    Test,
}

/// Basic-auth credentials for the gateway API
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayCredentials {
    pub public_id: String,
    pub api_secret: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub mode: GatewayMode,

    /// Shared secret for notification signatures
    #[serde(default)]
    pub webhook_secret: Option<SecretString>,

    #[serde(default)]
    pub live: Option<GatewayCredentials>,

    #[serde(default)]
    pub test: Option<GatewayCredentials>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Outbound request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    /// Credentials for the configured mode
    pub fn active_credentials(&self) -> Option<&GatewayCredentials> {
        match self.mode {
            GatewayMode::Live => self.live.as_ref(),
            GatewayMode::Test => self.test.as_ref(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret_present = self
            .webhook_secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().trim().is_empty());
        if !secret_present {
            return Err(ValidationError::MissingRequired("GATEWAY__WEBHOOK_SECRET"));
        }

        let credentials = self.active_credentials().ok_or(match self.mode {
            GatewayMode::Live => ValidationError::MissingRequired("GATEWAY__LIVE"),
            GatewayMode::Test => ValidationError::MissingRequired("GATEWAY__TEST"),
        })?;
        if credentials.public_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__*__PUBLIC_ID"));
        }
        if credentials.api_secret.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__*__API_SECRET"));
        }

        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout("gateway.request_timeout_secs"));
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.cloudpayments.ru".to_string()
}

fn default_request_timeout() -> u64 {
    5
}
