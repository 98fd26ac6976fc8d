//! Integration tests for the billing HTTP surface.
//!
//! The full router runs against in-memory adapters, a mock gateway and a
//! fixed clock:
//! 1. Gateway notifications are verified, applied and acknowledged
//! 2. Access and status endpoints reflect the stored entitlement
//! 3. Cancel endpoints enforce caller identity

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use billing_reconciler::adapters::gateway::MockPaymentGateway;
use billing_reconciler::adapters::http::billing::{USER_ADMIN_HEADER, USER_ID_HEADER};
use billing_reconciler::adapters::http::{app_router, BillingAppState};
use billing_reconciler::adapters::memory::{
    InMemoryDelegationReader, InMemoryEntitlementRepository, InMemoryProcessedNotificationStore,
    InMemoryReferralRepository,
};
use billing_reconciler::application::SubscriptionPlan;
use billing_reconciler::domain::billing::{
    BillingStatus, DelegationLink, Entitlement, SignatureVerifier,
};
use billing_reconciler::domain::foundation::{AccountId, Timestamp};
use billing_reconciler::ports::{BillingInterval, EntitlementRepository, FixedClock};

const SECRET: &str = "notification-secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    entitlements: InMemoryEntitlementRepository,
    delegations: InMemoryDelegationReader,
    gateway: MockPaymentGateway,
    clock: Arc<FixedClock>,
    app: Router,
}

fn t0() -> Timestamp {
    Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap())
}

fn id(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

fn harness() -> Harness {
    let entitlements = InMemoryEntitlementRepository::new();
    let delegations = InMemoryDelegationReader::new();
    let gateway = MockPaymentGateway::new();
    let clock = Arc::new(FixedClock::new(t0()));

    let state = BillingAppState {
        entitlements: Arc::new(entitlements.clone()),
        delegations: Arc::new(delegations.clone()),
        referrals: Arc::new(InMemoryReferralRepository::new()),
        gateway: Arc::new(gateway.clone()),
        seen_set: Some(Arc::new(InMemoryProcessedNotificationStore::new())),
        clock: clock.clone(),
        verifier: Arc::new(SignatureVerifier::new(&SecretString::new(SECRET.to_string()))),
        plan: SubscriptionPlan {
            amount: 299.0,
            currency: "RUB".to_string(),
            description: "Monthly subscription".to_string(),
        },
        trial_days: 14,
        dedup_retention: Duration::from_secs(72 * 3600),
        dedup_lease: Duration::from_secs(120),
    };

    Harness {
        entitlements,
        delegations,
        gateway,
        clock,
        app: app_router(state),
    }
}

fn sign(data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

fn notification(kind: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/webhooks/gateway/{}", kind))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Content-HMAC", sign(body.as_bytes()))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn as_user(method: &str, uri: &str, user: &str, is_admin: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user);
    if is_admin {
        builder = builder.header(USER_ADMIN_HEADER, "true");
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn paid(payer: &str, until: Timestamp, subscription: Option<&str>) -> Entitlement {
    let mut e = Entitlement::new(id(payer), t0());
    e.trial_ends_at = Some(t0());
    e.paid_until = Some(until);
    e.billing_status = BillingStatus::Active;
    e.gateway_subscription_id = subscription.map(str::to_string);
    e
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_responds() {
    let h = harness();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Payment lifecycle
// =============================================================================

#[tokio::test]
async fn first_payment_then_past_due_renewal() {
    let h = harness();
    h.entitlements.put(Entitlement::new(id("payer-1"), t0())).await;

    // Payment with a card token and no subscription yet
    let (status, ack) = send(
        &h.app,
        notification("pay", "AccountId=payer-1&TransactionId=1001&Token=tok1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, serde_json::json!({"code": 0}));

    let after_pay = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert_eq!(after_pay.paid_until, Some(t0().add_months(1)));
    assert_eq!(after_pay.billing_status, BillingStatus::Active);

    let created = h.gateway.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].card_token, "tok1");
    assert_eq!(created[0].start_date, t0().add_months(1));
    assert_eq!(created[0].interval, BillingInterval::Month);
    assert_eq!(created[0].period, 1);
    assert_eq!(after_pay.gateway_subscription_id.as_deref(), Some("sc_mock_1"));

    // Renewal fails a day after the window ends
    h.clock.set(t0().add_months(1).add_days(1));
    let (status, ack) = send(
        &h.app,
        notification("recurrent", "Id=sc_mock_1&AccountId=payer-1&Status=PastDue"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["code"], 0);

    let (status, body) = send(&h.app, as_user("GET", "/billing/status", "payer-1", false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["billing_status"], "past_due");
    assert_eq!(body["access"]["ok"], false);
    assert_eq!(body["access"]["reason"], "none");
}

#[tokio::test]
async fn repeated_payment_notification_extends_once() {
    let h = harness();
    h.entitlements
        .put(paid("payer-1", t0().add_days(5), Some("sc_1")))
        .await;
    let body = "AccountId=payer-1&TransactionId=2002";

    send(&h.app, notification("pay", body)).await;
    let (status, ack) = send(&h.app, notification("pay", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["code"], 0);
    let e = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert_eq!(e.paid_until, Some(t0().add_days(5).add_months(1)));
    assert!(h.gateway.created().is_empty());
}

#[tokio::test]
async fn failed_charge_marks_past_due() {
    let h = harness();
    h.entitlements
        .put(paid("payer-1", t0().add_days(2), Some("sc_1")))
        .await;

    let (status, ack) = send(
        &h.app,
        notification("fail", "AccountId=payer-1&TransactionId=3003&Reason=InsufficientFunds"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["code"], 0);
    let e = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert_eq!(e.billing_status, BillingStatus::PastDue);
    assert_eq!(e.paid_until, Some(t0().add_days(2)));
}

// =============================================================================
// Signature handling
// =============================================================================

#[tokio::test]
async fn accepts_canonical_signature_under_x_content_hmac() {
    let h = harness();
    h.entitlements.put(Entitlement::new(id("payer-1"), t0())).await;
    let raw = "AccountId=payer%2D1&TransactionId=4004";
    let canonical = "AccountId=payer-1&TransactionId=4004";

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/gateway/pay")
        .header("Content-HMAC", "not-a-signature")
        .header("X-Content-HMAC", sign(canonical.as_bytes()))
        .body(Body::from(raw))
        .unwrap();
    let (status, ack) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["code"], 0);
    let e = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert_eq!(e.paid_until, Some(t0().add_months(1)));
}

#[tokio::test]
async fn accepts_both_headers_when_each_is_valid() {
    let h = harness();
    h.entitlements.put(Entitlement::new(id("payer-1"), t0())).await;
    let raw = "AccountId=payer%2D1&TransactionId=4005";
    let canonical = "AccountId=payer-1&TransactionId=4005";

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/gateway/pay")
        .header("Content-HMAC", sign(raw.as_bytes()))
        .header("X-Content-HMAC", sign(canonical.as_bytes()))
        .body(Body::from(raw))
        .unwrap();
    let (status, _) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    let e = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert_eq!(e.billing_status, BillingStatus::Active);
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_changes() {
    let h = harness();
    h.entitlements.put(Entitlement::new(id("payer-1"), t0())).await;

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/gateway/pay")
        .header("Content-HMAC", sign(b"AccountId=someone-else"))
        .body(Body::from("AccountId=payer-1&TransactionId=5005"))
        .unwrap();
    let (status, ack) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(ack, serde_json::json!({"code": 13}));
    let e = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert!(e.paid_until.is_none());
}

#[tokio::test]
async fn missing_signature_headers_are_rejected() {
    let h = harness();

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/gateway/fail")
        .body(Body::from("AccountId=payer-1"))
        .unwrap();
    let (status, ack) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(ack["code"], 13);
}

#[tokio::test]
async fn unknown_payer_is_acknowledged() {
    let h = harness();

    let (status, ack) = send(
        &h.app,
        notification("pay", "AccountId=nobody&TransactionId=6006&Token=tok"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, serde_json::json!({"code": 0}));
    assert!(h.entitlements.find_by_payer(&id("nobody")).await.unwrap().is_none());
    assert!(h.gateway.created().is_empty());
}

#[tokio::test]
async fn storage_failure_asks_gateway_to_retry() {
    let h = harness();
    h.entitlements.put(Entitlement::new(id("payer-1"), t0())).await;
    h.entitlements.set_unavailable(true);

    let (status, ack) = send(
        &h.app,
        notification("pay", "AccountId=payer-1&TransactionId=7007"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ack["code"], 13);

    // The claim was released, so the retry is applied
    h.entitlements.set_unavailable(false);
    let (status, _) = send(
        &h.app,
        notification("pay", "AccountId=payer-1&TransactionId=7007"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let e = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert_eq!(e.paid_until, Some(t0().add_months(1)));
}

// =============================================================================
// Access
// =============================================================================

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let h = harness();
    let request = Request::builder().uri("/billing/access").body(Body::empty()).unwrap();

    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn trial_is_granted_once() {
    let h = harness();

    let (_, first) = send(&h.app, as_user("GET", "/billing/access", "new-user", false)).await;
    assert_eq!(first, serde_json::json!({"ok": true, "reason": "trial"}));

    h.clock.advance_days(15);
    let (_, later) = send(&h.app, as_user("GET", "/billing/access", "new-user", false)).await;
    assert_eq!(later, serde_json::json!({"ok": false, "reason": "none"}));

    let e = h.entitlements.find_by_payer(&id("new-user")).await.unwrap().unwrap();
    assert_eq!(e.trial_ends_at, Some(t0().add_days(14)));
}

#[tokio::test]
async fn admin_has_access_without_billing_state() {
    let h = harness();

    let (status, body) = send(&h.app, as_user("GET", "/billing/access", "root", true)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reason"], "admin");
    assert!(h.entitlements.find_by_payer(&id("root")).await.unwrap().is_none());
}

#[tokio::test]
async fn beneficiary_inherits_payer_access() {
    let h = harness();
    h.entitlements
        .put(paid("payer-1", t0().add_days(10), Some("sc_1")))
        .await;
    let mut beneficiary = Entitlement::new(id("family-1"), t0());
    beneficiary.trial_ends_at = Some(t0().add_days(-1));
    h.entitlements.put(beneficiary).await;
    h.delegations
        .link(DelegationLink::new(id("family-1"), id("payer-1"), t0()))
        .await;

    let (_, body) = send(&h.app, as_user("GET", "/billing/access", "family-1", false)).await;
    assert_eq!(body, serde_json::json!({"ok": true, "reason": "paid"}));

    h.clock.advance_days(11);
    let (_, body) = send(&h.app, as_user("GET", "/billing/access", "family-1", false)).await;
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn first_check_of_linked_beneficiary_does_not_spend_trial() {
    let h = harness();
    h.entitlements
        .put(paid("payer-1", t0().add_days(10), Some("sc_1")))
        .await;
    h.delegations
        .link(DelegationLink::new(id("family-2"), id("payer-1"), t0()))
        .await;

    let (status, body) = send(&h.app, as_user("GET", "/billing/access", "family-2", false)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"ok": true, "reason": "paid"}));
    assert!(h.entitlements.find_by_payer(&id("family-2")).await.unwrap().is_none());
}

// =============================================================================
// Cancel
// =============================================================================

#[tokio::test]
async fn cancel_is_idempotent() {
    let h = harness();
    h.entitlements
        .put(paid("payer-1", t0().add_days(20), Some("sc_1")))
        .await;

    let (status, first) = send(&h.app, as_user("POST", "/billing/cancel", "payer-1", false)).await;
    let (_, second) = send(&h.app, as_user("POST", "/billing/cancel", "payer-1", false)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cancelled"], true);
    assert_eq!(second["cancelled"], false);
    assert_eq!(h.gateway.cancelled(), vec!["sc_1".to_string()]);

    // Paid window survives cancellation
    let (_, access) = send(&h.app, as_user("GET", "/billing/access", "payer-1", false)).await;
    assert_eq!(access["reason"], "paid");
}

#[tokio::test]
async fn cancelled_echo_then_new_card_registers_fresh_subscription() {
    let h = harness();
    h.entitlements
        .put(paid("payer-1", t0().add_days(20), Some("sc_1")))
        .await;
    send(&h.app, as_user("POST", "/billing/cancel", "payer-1", false)).await;

    // Gateway confirms the cancellation after the local cancel
    let (status, _) = send(
        &h.app,
        notification("recurrent", "Id=sc_1&AccountId=payer-1&Status=Cancelled"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let echoed = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert!(echoed.gateway_subscription_id.is_none());

    let (status, _) = send(
        &h.app,
        notification("pay", "AccountId=payer-1&TransactionId=3003&Token=tok2"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let created = h.gateway.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].card_token, "tok2");
    let e = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert_eq!(e.gateway_subscription_id.as_deref(), Some("sc_mock_1"));
    assert_eq!(e.billing_status, BillingStatus::Active);
}

#[tokio::test]
async fn non_admin_cannot_use_admin_cancel() {
    let h = harness();
    h.entitlements
        .put(paid("payer-1", t0().add_days(20), Some("sc_1")))
        .await;

    let (status, body) = send(
        &h.app,
        as_user("POST", "/admin/billing/payer-1/cancel", "someone", false),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert!(h.gateway.cancelled().is_empty());
}

#[tokio::test]
async fn admin_cancels_on_behalf_of_payer() {
    let h = harness();
    h.entitlements
        .put(paid("payer-1", t0().add_days(20), Some("sc_1")))
        .await;

    let (status, body) = send(
        &h.app,
        as_user("POST", "/admin/billing/payer-1/cancel", "ops", true),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    let e = h.entitlements.find_by_payer(&id("payer-1")).await.unwrap().unwrap();
    assert_eq!(e.billing_status, BillingStatus::Cancelled);
}

#[tokio::test]
async fn admin_cancel_of_unknown_payer_is_not_found() {
    let h = harness();

    let (status, _) = send(
        &h.app,
        as_user("POST", "/admin/billing/ghost/cancel", "ops", true),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
