//! PostgreSQL implementation of ReferralRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::ports::ReferralRepository;

pub struct PostgresReferralRepository {
    pool: PgPool,
}

impl PostgresReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferralRepository for PostgresReferralRepository {
    async fn mark_first_paid(
        &self,
        referred_id: &AccountId,
        paid_at: Timestamp,
    ) -> Result<bool, DomainError> {
        // The IS NULL guard makes the write one-shot under concurrency.
        let result = sqlx::query(
            r#"
            UPDATE referral_attributions
            SET first_paid_at = $2
            WHERE referred_id = $1 AND first_paid_at IS NULL
            "#,
        )
        .bind(referred_id.as_str())
        .bind(paid_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark referral paid: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
