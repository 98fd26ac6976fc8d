//! Gateway API request and response bodies.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::ports::CreateRecurringSubscription;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateSubscriptionBody<'a> {
    pub token: &'a str,
    pub account_id: &'a str,
    pub description: &'a str,
    pub amount: f64,
    pub currency: &'a str,
    pub require_confirmation: bool,
    pub start_date: String,
    pub interval: &'static str,
    pub period: u32,
}

impl<'a> CreateSubscriptionBody<'a> {
    pub fn from_request(request: &'a CreateRecurringSubscription) -> Self {
        Self {
            token: &request.card_token,
            account_id: request.payer_id.as_str(),
            description: &request.description,
            amount: request.amount,
            currency: &request.currency,
            require_confirmation: false,
            start_date: request
                .start_date
                .as_datetime()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            interval: request.interval.as_str(),
            period: request.period,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CancelSubscriptionBody<'a> {
    pub id: &'a str,
}

/// Envelope every gateway API response uses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub model: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SubscriptionModel {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{AccountId, Timestamp};
    use crate::ports::BillingInterval;
    use chrono::{TimeZone, Utc};

    #[test]
    fn create_body_uses_gateway_field_names() {
        let request = CreateRecurringSubscription {
            card_token: "tok1".into(),
            payer_id: AccountId::new("p1").unwrap(),
            description: "Monthly subscription".into(),
            amount: 299.0,
            currency: "RUB".into(),
            start_date: Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()),
            interval: BillingInterval::Month,
            period: 1,
        };

        let json = serde_json::to_value(CreateSubscriptionBody::from_request(&request)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "Token": "tok1",
                "AccountId": "p1",
                "Description": "Monthly subscription",
                "Amount": 299.0,
                "Currency": "RUB",
                "RequireConfirmation": false,
                "StartDate": "2026-04-01T10:00:00Z",
                "Interval": "Month",
                "Period": 1
            })
        );
    }

    #[test]
    fn parses_response_without_model() {
        let parsed: ApiResponse<SubscriptionModel> =
            serde_json::from_str(r#"{"Success":false,"Message":"Subscription not found"}"#).unwrap();
        assert!(!parsed.success);
        assert!(parsed.model.is_none());
    }
}
