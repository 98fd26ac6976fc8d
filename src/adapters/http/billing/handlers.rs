//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Json, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckAccessHandler, CheckAccessQuery,
    GetBillingStatusHandler, GetBillingStatusQuery, HandlePaymentFailedHandler,
    HandlePaymentSucceededHandler, HandleRecurringStatusChangedHandler,
    ReceiveNotificationCommand, ReceiveNotificationHandler, ReceiveNotificationResult,
    SubscriptionPlan,
};
use crate::domain::billing::{
    BillingError, NotificationKind, Principal, SignatureHeaders, SignatureVerifier,
    CONTENT_HMAC_HEADER, X_CONTENT_HMAC_HEADER,
};
use crate::domain::foundation::{AccountId, ErrorCode};
use crate::ports::{
    Clock, DelegationReader, EntitlementRepository, PaymentGateway, ProcessedNotificationStore,
    ReferralRepository,
};

use super::dto::{AccessResponse, BillingStatusResponse, CancelResponse, ErrorResponse, GatewayAck};

/// Header carrying the caller's account id, set by the identity proxy.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header flagging the caller as an administrator.
pub const USER_ADMIN_HEADER: &str = "X-User-Admin";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; handlers are built on demand from the Arc-wrapped ports.
#[derive(Clone)]
pub struct BillingAppState {
    pub entitlements: Arc<dyn EntitlementRepository>,
    pub delegations: Arc<dyn DelegationReader>,
    pub referrals: Arc<dyn ReferralRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// Notification seen-set; `None` disables de-duplication.
    pub seen_set: Option<Arc<dyn ProcessedNotificationStore>>,
    pub clock: Arc<dyn Clock>,
    pub verifier: Arc<SignatureVerifier>,
    pub plan: SubscriptionPlan,
    pub trial_days: u32,
    pub dedup_retention: Duration,
    pub dedup_lease: Duration,
}

impl BillingAppState {
    pub fn receive_notification_handler(&self) -> ReceiveNotificationHandler {
        let handler = ReceiveNotificationHandler::new(
            self.verifier.clone(),
            HandlePaymentSucceededHandler::new(
                self.entitlements.clone(),
                self.referrals.clone(),
                self.gateway.clone(),
                self.clock.clone(),
                self.plan.clone(),
            ),
            HandleRecurringStatusChangedHandler::new(self.entitlements.clone(), self.clock.clone()),
            HandlePaymentFailedHandler::new(self.entitlements.clone(), self.clock.clone()),
        );
        match &self.seen_set {
            Some(store) => handler.with_seen_set(store.clone(), self.dedup_retention, self.dedup_lease),
            None => handler,
        }
    }

    pub fn check_access_handler(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(
            self.entitlements.clone(),
            self.delegations.clone(),
            self.clock.clone(),
            self.trial_days,
        )
    }

    pub fn billing_status_handler(&self) -> GetBillingStatusHandler {
        GetBillingStatusHandler::new(self.entitlements.clone(), Arc::new(self.check_access_handler()))
    }

    pub fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.entitlements.clone(),
            self.gateway.clone(),
            self.clock.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Caller identity
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity forwarded by the identity proxy in front of this service.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Rejection type for AuthenticatedPrincipal extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = header_value(&parts.headers, USER_ID_HEADER)
            .and_then(|s| AccountId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        let is_admin = header_value(&parts.headers, USER_ADMIN_HEADER)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        Ok(AuthenticatedPrincipal(Principal::new(account_id, is_admin)))
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks (signature verified, no caller identity)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/gateway/pay
pub async fn receive_pay(State(state): State<BillingAppState>, headers: HeaderMap, body: Bytes) -> Response {
    receive(state, NotificationKind::Pay, headers, body).await
}

/// POST /webhooks/gateway/recurrent
pub async fn receive_recurrent(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    receive(state, NotificationKind::Recurrent, headers, body).await
}

/// POST /webhooks/gateway/fail
pub async fn receive_fail(State(state): State<BillingAppState>, headers: HeaderMap, body: Bytes) -> Response {
    receive(state, NotificationKind::Fail, headers, body).await
}

async fn receive(state: BillingAppState, kind: NotificationKind, headers: HeaderMap, body: Bytes) -> Response {
    let cmd = ReceiveNotificationCommand {
        kind,
        body: body.to_vec(),
        headers: SignatureHeaders::new(
            header_value(&headers, CONTENT_HMAC_HEADER).map(str::to_string),
            header_value(&headers, X_CONTENT_HMAC_HEADER).map(str::to_string),
        ),
    };

    match state.receive_notification_handler().handle(cmd).await {
        Ok(ReceiveNotificationResult::Processed(_)) | Ok(ReceiveNotificationResult::Duplicate { .. }) => {
            (StatusCode::OK, Json(GatewayAck::accepted())).into_response()
        }
        Err(e) => (e.status_code(), Json(GatewayAck::for_error(&e))).into_response(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /billing/status - Billing state and access of the caller
pub async fn get_billing_status(
    State(state): State<BillingAppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse, BillingApiError> {
    let view = state
        .billing_status_handler()
        .handle(GetBillingStatusQuery { principal })
        .await?;

    Ok(Json(BillingStatusResponse::from(view)))
}

/// GET /billing/access - Access decision only
pub async fn check_access(
    State(state): State<BillingAppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse, BillingApiError> {
    let decision = state
        .check_access_handler()
        .handle(CheckAccessQuery { principal })
        .await?;

    Ok(Json(AccessResponse::from(decision)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /billing/cancel - Cancel the caller's recurring subscription
pub async fn cancel_own_subscription(
    State(state): State<BillingAppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .cancel_handler()
        .handle(CancelSubscriptionCommand::own(principal))
        .await?;

    Ok(Json(CancelResponse::from(result)))
}

/// POST /admin/billing/{payer_id}/cancel - Cancel on behalf of a payer (admin only)
pub async fn admin_cancel_subscription(
    State(state): State<BillingAppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(payer_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    if !principal.is_admin {
        return Err(BillingError::Forbidden.into());
    }
    let payer_id = AccountId::new(payer_id)
        .map_err(|e| BillingError::validation("payer_id", e.to_string()))?;

    let result = state
        .cancel_handler()
        .handle(CancelSubscriptionCommand {
            payer_id,
            requested_by: principal,
        })
        .await?;

    Ok(Json(CancelResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match self.0.code() {
            ErrorCode::EntitlementNotFound | ErrorCode::NotFound => {
                (StatusCode::NOT_FOUND, "ENTITLEMENT_NOT_FOUND")
            }
            ErrorCode::Unauthorized => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED"),
            ErrorCode::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ErrorCode::ExternalServiceError => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
            ErrorCode::ValidationFailed => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "billing request failed");
        }

        let body = ErrorResponse::new(error_code, self.0.message());
        (status, Json(body)).into_response()
    }
}
