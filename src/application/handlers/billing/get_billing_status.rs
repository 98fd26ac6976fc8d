//! GetBillingStatusHandler - Query handler for the caller's billing state.

use std::sync::Arc;

use crate::domain::billing::{AccessDecision, BillingError, BillingStatus, Principal};
use crate::domain::foundation::Timestamp;
use crate::ports::EntitlementRepository;

use super::{CheckAccessHandler, CheckAccessQuery};

#[derive(Debug, Clone)]
pub struct GetBillingStatusQuery {
    pub principal: Principal,
}

/// Billing state of one account plus its effective access.
///
/// The stored card token is never part of this view.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingStatusView {
    pub trial_ends_at: Option<Timestamp>,
    pub billing_status: BillingStatus,
    pub paid_until: Option<Timestamp>,
    pub gateway_subscription_id: Option<String>,
    pub card_fingerprint: Option<String>,
    pub billing_updated_at: Option<Timestamp>,
    pub access: AccessDecision,
}

pub struct GetBillingStatusHandler {
    entitlements: Arc<dyn EntitlementRepository>,
    access: Arc<CheckAccessHandler>,
}

impl GetBillingStatusHandler {
    pub fn new(entitlements: Arc<dyn EntitlementRepository>, access: Arc<CheckAccessHandler>) -> Self {
        Self {
            entitlements,
            access,
        }
    }

    pub async fn handle(&self, query: GetBillingStatusQuery) -> Result<BillingStatusView, BillingError> {
        // Access first: it may grant the trial this view should show.
        let access = self
            .access
            .handle(CheckAccessQuery {
                principal: query.principal.clone(),
            })
            .await?;

        let entitlement = self
            .entitlements
            .find_by_payer(&query.principal.account_id)
            .await?;

        Ok(match entitlement {
            Some(e) => BillingStatusView {
                trial_ends_at: e.trial_ends_at,
                billing_status: e.billing_status,
                paid_until: e.paid_until,
                gateway_subscription_id: e.gateway_subscription_id,
                card_fingerprint: e.card_fingerprint,
                billing_updated_at: Some(e.billing_updated_at),
                access,
            },
            None => BillingStatusView {
                trial_ends_at: None,
                billing_status: BillingStatus::None,
                paid_until: None,
                gateway_subscription_id: None,
                card_fingerprint: None,
                billing_updated_at: None,
                access,
            },
        })
    }
}
