//! Access decision rules.
//!
//! Access follows the trial window, the paid window and the lifetime case.
//! `billing_status` on its own never gates access, so a delayed or failed
//! auto-charge does not cut off a payer still inside a granted period.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Timestamp};

use super::{BillingStatus, Entitlement};

/// Why a principal has, or lacks, access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessReason {
    Admin,
    Trial,
    Paid,
    None,
}

/// Result of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub ok: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    pub const ADMIN: AccessDecision = AccessDecision::granted(AccessReason::Admin);
    pub const TRIAL: AccessDecision = AccessDecision::granted(AccessReason::Trial);
    pub const PAID: AccessDecision = AccessDecision::granted(AccessReason::Paid);
    pub const DENIED: AccessDecision = AccessDecision {
        ok: false,
        reason: AccessReason::None,
    };

    const fn granted(reason: AccessReason) -> Self {
        Self { ok: true, reason }
    }

    /// Decision a beneficiary receives through a payer's decision.
    ///
    /// Delegated access is always reported as `paid` so the payer's own
    /// reason never leaks.
    pub fn delegated(payer: AccessDecision) -> Self {
        if payer.ok {
            Self::PAID
        } else {
            Self::DENIED
        }
    }
}

/// Identity of whoever is asking for access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub is_admin: bool,
}

impl Principal {
    pub fn new(account_id: AccountId, is_admin: bool) -> Self {
        Self {
            account_id,
            is_admin,
        }
    }
}

/// Applies the direct access rules to one account.
///
/// Order matters: admin, then a running trial, then a running paid window,
/// then the lifetime case (active with no paid window).
pub fn resolve(entitlement: Option<&Entitlement>, is_admin: bool, now: Timestamp) -> AccessDecision {
    if is_admin {
        return AccessDecision::ADMIN;
    }

    let Some(e) = entitlement else {
        return AccessDecision::DENIED;
    };

    if e.trial_ends_at.is_some_and(|end| end.is_after(&now)) {
        return AccessDecision::TRIAL;
    }

    match e.paid_until {
        Some(until) if until.is_after(&now) => AccessDecision::PAID,
        None if e.billing_status == BillingStatus::Active => AccessDecision::PAID,
        _ => AccessDecision::DENIED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap())
    }

    fn empty() -> Entitlement {
        Entitlement::new(AccountId::new("p").unwrap(), now())
    }

    // ══════════════════════════════════════════════════════════════
    // Admin
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn admin_has_access_without_entitlement() {
        assert_eq!(resolve(None, true, now()), AccessDecision::ADMIN);
    }

    #[test]
    fn admin_wins_over_expired_windows() {
        let mut e = empty();
        e.trial_ends_at = Some(now().add_days(-10));
        e.paid_until = Some(now().add_days(-1));

        assert_eq!(resolve(Some(&e), true, now()), AccessDecision::ADMIN);
    }

    // ══════════════════════════════════════════════════════════════
    // Trial and paid windows
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn running_trial_grants_trial_regardless_of_status() {
        let mut e = empty();
        e.trial_ends_at = Some(now().add_days(3));
        e.billing_status = BillingStatus::Cancelled;
        e.paid_until = Some(now().add_days(30));

        assert_eq!(resolve(Some(&e), false, now()), AccessDecision::TRIAL);
    }

    #[test]
    fn trial_ending_exactly_now_is_expired() {
        let mut e = empty();
        e.trial_ends_at = Some(now());

        assert_eq!(resolve(Some(&e), false, now()), AccessDecision::DENIED);
    }

    #[test]
    fn past_due_within_paid_window_keeps_access() {
        let mut e = empty();
        e.billing_status = BillingStatus::PastDue;
        e.paid_until = Some(now().add_hours(1));

        assert_eq!(resolve(Some(&e), false, now()), AccessDecision::PAID);
        assert_eq!(
            resolve(Some(&e), false, now().add_hours(2)),
            AccessDecision::DENIED
        );
    }

    #[test]
    fn active_without_paid_window_is_lifetime() {
        let mut e = empty();
        e.billing_status = BillingStatus::Active;

        assert_eq!(resolve(Some(&e), false, now()), AccessDecision::PAID);
    }

    #[test]
    fn active_with_lapsed_window_is_denied() {
        let mut e = empty();
        e.billing_status = BillingStatus::Active;
        e.paid_until = Some(now().add_days(-1));

        assert_eq!(resolve(Some(&e), false, now()), AccessDecision::DENIED);
    }

    #[test]
    fn missing_entitlement_is_denied() {
        assert_eq!(resolve(None, false, now()), AccessDecision::DENIED);
        assert_eq!(resolve(Some(&empty()), false, now()), AccessDecision::DENIED);
    }

    // ══════════════════════════════════════════════════════════════
    // Delegation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn delegated_access_is_reported_as_paid() {
        assert_eq!(AccessDecision::delegated(AccessDecision::TRIAL), AccessDecision::PAID);
        assert_eq!(AccessDecision::delegated(AccessDecision::PAID), AccessDecision::PAID);
        assert_eq!(
            AccessDecision::delegated(AccessDecision::DENIED),
            AccessDecision::DENIED
        );
    }

    #[test]
    fn decision_serializes_lowercase_reason() {
        let json = serde_json::to_value(AccessDecision::TRIAL).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true, "reason": "trial"}));
    }
}
