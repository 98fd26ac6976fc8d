//! Typed gateway notifications.
//!
//! The gateway posts either `application/x-www-form-urlencoded` or JSON
//! bodies with PascalCase field names. Both are flattened into
//! [`NotificationFields`] before the typed notification is built.

use std::collections::HashMap;
use std::fmt;

use crate::domain::foundation::AccountId;

use super::{GatewayStatus, PaymentDetails, WebhookError};

/// Which gateway callback delivered the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// A charge succeeded.
    Pay,
    /// A recurring subscription changed status.
    Recurrent,
    /// A charge failed.
    Fail,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Pay => "pay",
            NotificationKind::Recurrent => "recurrent",
            NotificationKind::Fail => "fail",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat field map of a notification body. Lookups ignore key case.
#[derive(Debug, Clone, Default)]
pub struct NotificationFields(HashMap<String, String>);

impl NotificationFields {
    /// Decodes a JSON object or a form-encoded body.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let trimmed = body.trim_ascii();
        if trimmed.is_empty() {
            return Err(WebhookError::ParseError("empty body".to_string()));
        }

        if is_json(trimmed) {
            Self::from_json(trimmed)
        } else {
            Ok(Self::from_form(trimmed))
        }
    }

    fn from_json(body: &[u8]) -> Result<Self, WebhookError> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
            .map_err(|e| WebhookError::ParseError(format!("invalid JSON: {}", e)))?;

        let mut fields = HashMap::with_capacity(object.len());
        for (key, value) in object {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => continue,
                nested => nested.to_string(),
            };
            fields.entry(key.to_ascii_lowercase()).or_insert(value);
        }
        Ok(Self(fields))
    }

    fn from_form(body: &[u8]) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in form_urlencoded::parse(body) {
            fields
                .entry(key.to_ascii_lowercase())
                .or_insert_with(|| value.into_owned());
        }
        Self(fields)
    }

    /// Returns the trimmed value of a field, treating blanks as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn get_owned(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    fn require(&self, name: &'static str) -> Result<&str, WebhookError> {
        self.get(name).ok_or(WebhookError::MissingField(name))
    }

    fn payer_id(&self) -> Result<AccountId, WebhookError> {
        let raw = self.require("AccountId")?;
        AccountId::new(raw).map_err(|_| WebhookError::MissingField("AccountId"))
    }

    fn correlation(&self) -> Correlation {
        Correlation {
            invoice_id: self.get_owned("InvoiceId"),
            transaction_id: self.get_owned("TransactionId"),
        }
    }
}

pub(crate) fn is_json(body: &[u8]) -> bool {
    matches!(body.trim_ascii_start().first(), Some(b'{'))
}

/// Gateway identifiers carried for logging and de-duplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlation {
    pub invoice_id: Option<String>,
    pub transaction_id: Option<String>,
}

impl Correlation {
    /// Seen-set key: `"{kind}:{transaction id}"`, falling back to the invoice id.
    pub fn dedup_key(&self, kind: NotificationKind) -> Option<String> {
        self.transaction_id
            .as_deref()
            .or(self.invoice_id.as_deref())
            .map(|id| format!("{}:{}", kind, id))
    }
}

/// A charge succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSucceeded {
    pub payer_id: AccountId,
    pub card_token: Option<String>,
    pub gateway_subscription_id: Option<String>,
    pub card_fingerprint: Option<String>,
    pub correlation: Correlation,
}

impl PaymentSucceeded {
    pub fn details(&self) -> PaymentDetails {
        PaymentDetails {
            card_token: self.card_token.clone(),
            gateway_subscription_id: self.gateway_subscription_id.clone(),
            card_fingerprint: self.card_fingerprint.clone(),
        }
    }
}

/// The gateway changed the status of a recurring subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringStatusChanged {
    pub payer_id: AccountId,
    pub gateway_subscription_id: Option<String>,
    pub status: GatewayStatus,
    pub correlation: Correlation,
}

/// A charge failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFailed {
    pub payer_id: AccountId,
    pub reason: Option<String>,
    pub reason_code: Option<String>,
    pub correlation: Correlation,
}

/// Any notification the engine understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayNotification {
    PaymentSucceeded(PaymentSucceeded),
    RecurringStatusChanged(RecurringStatusChanged),
    PaymentFailed(PaymentFailed),
}

impl GatewayNotification {
    /// Builds a typed notification from an authenticated body.
    pub fn parse(kind: NotificationKind, body: &[u8]) -> Result<Self, WebhookError> {
        let fields = NotificationFields::parse(body)?;
        Self::from_fields(kind, &fields)
    }

    pub fn from_fields(
        kind: NotificationKind,
        fields: &NotificationFields,
    ) -> Result<Self, WebhookError> {
        let payer_id = fields.payer_id()?;
        let correlation = fields.correlation();

        let notification = match kind {
            NotificationKind::Pay => GatewayNotification::PaymentSucceeded(PaymentSucceeded {
                payer_id,
                card_token: fields.get_owned("Token"),
                gateway_subscription_id: fields.get_owned("SubscriptionId"),
                card_fingerprint: mask_card(fields.get("CardFirstSix"), fields.get("CardLastFour")),
                correlation,
            }),
            NotificationKind::Recurrent => {
                let status = GatewayStatus::new(fields.require("Status")?);
                GatewayNotification::RecurringStatusChanged(RecurringStatusChanged {
                    payer_id,
                    gateway_subscription_id: fields
                        .get_owned("Id")
                        .or_else(|| fields.get_owned("SubscriptionId")),
                    status,
                    correlation,
                })
            }
            NotificationKind::Fail => GatewayNotification::PaymentFailed(PaymentFailed {
                payer_id,
                reason: fields.get_owned("Reason"),
                reason_code: fields.get_owned("ReasonCode"),
                correlation,
            }),
        };
        Ok(notification)
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            GatewayNotification::PaymentSucceeded(_) => NotificationKind::Pay,
            GatewayNotification::RecurringStatusChanged(_) => NotificationKind::Recurrent,
            GatewayNotification::PaymentFailed(_) => NotificationKind::Fail,
        }
    }

    pub fn payer_id(&self) -> &AccountId {
        match self {
            GatewayNotification::PaymentSucceeded(n) => &n.payer_id,
            GatewayNotification::RecurringStatusChanged(n) => &n.payer_id,
            GatewayNotification::PaymentFailed(n) => &n.payer_id,
        }
    }

    pub fn correlation(&self) -> &Correlation {
        match self {
            GatewayNotification::PaymentSucceeded(n) => &n.correlation,
            GatewayNotification::RecurringStatusChanged(n) => &n.correlation,
            GatewayNotification::PaymentFailed(n) => &n.correlation,
        }
    }

    pub fn dedup_key(&self) -> Option<String> {
        self.correlation().dedup_key(self.kind())
    }
}

/// Builds the displayable card descriptor.
///
/// `"123456******7890"` with both parts, `"**** 7890"` with only the last four.
pub fn mask_card(first_six: Option<&str>, last_four: Option<&str>) -> Option<String> {
    match (first_six, last_four) {
        (Some(first), Some(last)) => Some(format!("{}******{}", first, last)),
        (None, Some(last)) => Some(format!("**** {}", last)),
        _ => None,
    }
}
