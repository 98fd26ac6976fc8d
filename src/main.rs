//! Billing reconciler server.
//!
//! Loads configuration from `BILLING__*` environment variables, connects the
//! entitlement store, and serves gateway webhooks and the billing API.

use std::sync::Arc;

use thiserror::Error;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use billing_reconciler::adapters::gateway::{GatewayClientConfig, HttpPaymentGateway};
use billing_reconciler::adapters::http::{app_router, BillingAppState};
use billing_reconciler::adapters::memory::InMemoryProcessedNotificationStore;
use billing_reconciler::adapters::postgres::{
    self, PostgresDelegationReader, PostgresEntitlementRepository, PostgresReferralRepository,
};
use billing_reconciler::adapters::redis::{self as redis_adapter, RedisProcessedNotificationStore};
use billing_reconciler::application::SubscriptionPlan;
use billing_reconciler::config::{AppConfig, ConfigError, ValidationError};
use billing_reconciler::domain::billing::SignatureVerifier;
use billing_reconciler::domain::foundation::DomainError;
use billing_reconciler::ports::{GatewayError, ProcessedNotificationStore, SystemClock};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("storage unavailable: {0}")]
    Storage(#[from] DomainError),

    #[error("gateway client: {0}")]
    Gateway(#[from] GatewayError),

    #[error("bind failed: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return Err(e.into());
    }

    let state = build_state(&config).await?;

    let request_id = http::HeaderName::from_static(REQUEST_ID_HEADER);
    let app = app_router(state)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, mode = ?config.gateway.mode, "billing reconciler listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn build_state(config: &AppConfig) -> Result<BillingAppState, StartupError> {
    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
    }

    let seen_set: Option<Arc<dyn ProcessedNotificationStore>> = if !config.dedup.enabled {
        None
    } else if let Some(url) = config.redis.url.as_deref() {
        let conn = redis_adapter::connect(url, config.redis.timeout()).await?;
        Some(Arc::new(RedisProcessedNotificationStore::new(
            conn,
            config.redis.key_prefix.clone(),
        )))
    } else {
        tracing::warn!("no redis configured, notification seen-set is per process");
        Some(Arc::new(InMemoryProcessedNotificationStore::new()))
    };

    let credentials = config
        .gateway
        .active_credentials()
        .ok_or(ValidationError::MissingRequired("gateway credentials"))?;
    let gateway = HttpPaymentGateway::new(
        GatewayClientConfig::new(credentials.public_id.clone(), credentials.api_secret.clone())
            .with_base_url(config.gateway.api_base_url.clone())
            .with_timeout(config.gateway.request_timeout()),
    )?;

    let secret = config
        .gateway
        .webhook_secret
        .as_ref()
        .ok_or(ValidationError::MissingRequired("gateway.webhook_secret"))?;

    Ok(BillingAppState {
        entitlements: Arc::new(PostgresEntitlementRepository::new(pool.clone())),
        delegations: Arc::new(PostgresDelegationReader::new(pool.clone())),
        referrals: Arc::new(PostgresReferralRepository::new(pool)),
        gateway: Arc::new(gateway),
        seen_set,
        clock: Arc::new(SystemClock),
        verifier: Arc::new(SignatureVerifier::new(secret)),
        plan: SubscriptionPlan::from_config(&config.billing),
        trial_days: config.billing.trial_days,
        dedup_retention: config.dedup.retention(),
        dedup_lease: config.dedup.lease(),
    })
}
