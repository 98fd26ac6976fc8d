//! Notification de-duplication configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MAX_RETENTION_HOURS: u64 = 720;
const MAX_LEASE_SECS: u64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Claim notification keys before processing
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How long a processed key is remembered
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// How long an unfinished attempt holds its key before a redelivery may
    /// take over. Should exceed the request timeout.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
}

impl DedupConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retention_hours == 0 || self.retention_hours > MAX_RETENTION_HOURS {
            return Err(ValidationError::InvalidRetention);
        }
        if self.lease_secs == 0 || self.lease_secs > MAX_LEASE_SECS {
            return Err(ValidationError::InvalidLease);
        }
        Ok(())
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            retention_hours: default_retention_hours(),
            lease_secs: default_lease_secs(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_retention_hours() -> u64 {
    72
}

fn default_lease_secs() -> u64 {
    120
}
