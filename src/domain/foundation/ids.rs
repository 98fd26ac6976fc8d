//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Identifier of an account, owned by the external identity system.
///
/// The same identifier type is used for payers and beneficiaries; the role
/// an account plays is determined by the entitlement and delegation tables,
/// not by the id itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new AccountId, returning error if empty or blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("account_id"));
        }
        if trimmed.len() != id.len() {
            return Ok(Self(trimmed.to_string()));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_accepts_non_empty_string() {
        let id = AccountId::new("user-123").unwrap();
        assert_eq!(id.as_str(), "user-123");
    }

    #[test]
    fn account_id_rejects_empty_string() {
        let result = AccountId::new("");
        match result {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "account_id"),
            _ => panic!("Expected EmptyField error"),
        }
    }

    #[test]
    fn account_id_rejects_whitespace() {
        assert!(AccountId::new("   ").is_err());
    }

    #[test]
    fn account_id_trims_surrounding_whitespace() {
        let id = AccountId::new(" payer-1\n").unwrap();
        assert_eq!(id.as_str(), "payer-1");
    }

    #[test]
    fn account_id_displays_correctly() {
        let id = AccountId::new("user-456").unwrap();
        assert_eq!(format!("{}", id), "user-456");
    }

    #[test]
    fn account_id_serializes_as_plain_string() {
        let id = AccountId::new("user-789").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"user-789\"");
    }
}
