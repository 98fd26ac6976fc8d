//! Billing plan configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Plan terms applied to every payer
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Monthly price in major currency units
    #[serde(default)]
    pub monthly_price: f64,

    /// ISO 4217 currency code
    #[serde(default)]
    pub currency: String,

    /// Length of the one-time trial
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,

    /// Statement text for recurring charges
    #[serde(default = "default_description")]
    pub description: String,
}

impl BillingConfig {
    /// Upper-cased currency code
    pub fn currency_code(&self) -> String {
        self.currency.trim().to_ascii_uppercase()
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.monthly_price.is_finite() || self.monthly_price <= 0.0 {
            return Err(ValidationError::InvalidPrice);
        }
        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.trial_days == 0 {
            return Err(ValidationError::InvalidTrialDays);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            monthly_price: 0.0,
            currency: String::new(),
            trial_days: default_trial_days(),
            description: default_description(),
        }
    }
}

fn default_trial_days() -> u32 {
    14
}

fn default_description() -> String {
    "Monthly subscription".to_string()
}
