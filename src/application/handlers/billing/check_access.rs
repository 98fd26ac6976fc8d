//! CheckAccessHandler - Query handler for access decisions.
//!
//! Resolution order:
//! 1. Administrators are granted without touching billing state.
//! 2. The principal's own stored entitlement, read only.
//! 3. The linked payer's entitlement, reported as `paid`.
//! 4. Only when both deny, the one-time trial is granted if the account was
//!    never observed. A beneficiary covered by its payer keeps its trial.

use std::sync::Arc;

use crate::domain::billing::{resolve, AccessDecision, BillingError, Entitlement, Principal};
use crate::domain::foundation::{AccountId, Timestamp};
use crate::ports::{Clock, DelegationReader, EntitlementRepository};

#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub principal: Principal,
}

pub struct CheckAccessHandler {
    entitlements: Arc<dyn EntitlementRepository>,
    delegations: Arc<dyn DelegationReader>,
    clock: Arc<dyn Clock>,
    trial_days: u32,
}

impl CheckAccessHandler {
    pub fn new(
        entitlements: Arc<dyn EntitlementRepository>,
        delegations: Arc<dyn DelegationReader>,
        clock: Arc<dyn Clock>,
        trial_days: u32,
    ) -> Self {
        Self {
            entitlements,
            delegations,
            clock,
            trial_days,
        }
    }

    pub async fn handle(&self, query: CheckAccessQuery) -> Result<AccessDecision, BillingError> {
        let principal = query.principal;
        if principal.is_admin {
            return Ok(AccessDecision::ADMIN);
        }

        let now = self.clock.now();
        let own = self.entitlements.find_by_payer(&principal.account_id).await?;
        let direct = resolve(own.as_ref(), false, now);
        if direct.ok {
            return Ok(direct);
        }

        let delegated = self.resolve_through_payer(&principal.account_id, now).await?;
        if delegated.ok {
            return Ok(delegated);
        }

        if own.as_ref().is_some_and(|e| !e.is_pristine()) {
            return Ok(direct);
        }
        let own = self.observe(&principal.account_id, now).await?;
        Ok(resolve(own.as_ref(), false, now))
    }

    async fn resolve_through_payer(
        &self,
        account_id: &AccountId,
        now: Timestamp,
    ) -> Result<AccessDecision, BillingError> {
        let Some(link) = self.delegations.find_link(account_id).await? else {
            return Ok(AccessDecision::DENIED);
        };
        if link.is_self_link() {
            return Ok(AccessDecision::DENIED);
        }

        let payer = self.entitlements.find_by_payer(&link.payer_id).await?;
        let decision = AccessDecision::delegated(resolve(payer.as_ref(), false, now));
        tracing::debug!(
            beneficiary_id = %account_id,
            payer_id = %link.payer_id,
            ok = decision.ok,
            "access resolved through payer"
        );
        Ok(decision)
    }

    /// Loads the account's entitlement, granting the trial if it was never observed.
    ///
    /// The grant is guarded by the pristine check under the row lock, and by
    /// `insert_if_absent` for brand-new accounts, so it happens at most once.
    pub(crate) async fn observe(
        &self,
        account_id: &AccountId,
        now: Timestamp,
    ) -> Result<Option<Entitlement>, BillingError> {
        match self.entitlements.find_by_payer(account_id).await? {
            Some(existing) if !existing.is_pristine() => Ok(Some(existing)),
            Some(_) => {
                let trial_days = self.trial_days;
                let change = self
                    .entitlements
                    .modify(
                        account_id,
                        Box::new(move |entitlement| {
                            entitlement.grant_trial(now, trial_days);
                        }),
                    )
                    .await?;
                if let Some(change) = &change {
                    if change.changed() {
                        tracing::info!(account_id = %account_id, trial_days, "trial granted");
                    }
                }
                Ok(change.map(|c| c.after))
            }
            None => {
                let fresh = Entitlement::with_trial(account_id.clone(), now, self.trial_days);
                if self.entitlements.insert_if_absent(&fresh).await? {
                    tracing::info!(account_id = %account_id, trial_days = self.trial_days, "trial granted");
                    return Ok(Some(fresh));
                }
                // A concurrent request created the row first.
                Ok(self.entitlements.find_by_payer(account_id).await?)
            }
        }
    }
}
