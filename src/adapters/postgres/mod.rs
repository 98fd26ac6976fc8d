//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresEntitlementRepository` - Entitlement rows with row-locked updates
//! - `PostgresDelegationReader` - Beneficiary to payer links
//! - `PostgresReferralRepository` - First-payment marking on attributions

mod delegation_reader;
mod entitlement_repository;
mod referral_repository;

pub use delegation_reader::PostgresDelegationReader;
pub use entitlement_repository::PostgresEntitlementRepository;
pub use referral_repository::PostgresReferralRepository;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};

/// Opens the connection pool.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "connecting to PostgreSQL"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::database(format!("Failed to connect: {}", e)))
}

/// Applies pending migrations from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    tracing::info!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Migration failed: {}", e)))
}

/// Rehydrates an account id read back from a row.
pub(crate) fn row_account_id(column: &str, value: String) -> Result<AccountId, DomainError> {
    AccountId::new(value).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", column, e))
    })
}
