//! PostgreSQL implementation of EntitlementRepository.
//!
//! `modify` runs inside a transaction holding `SELECT ... FOR UPDATE` on the
//! payer's row, so two notifications for one payer cannot interleave their
//! read and write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::billing::{BillingStatus, Entitlement};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::ports::{EntitlementChange, EntitlementRepository, EntitlementUpdate};

use super::row_account_id;

const SELECT_COLUMNS: &str = r#"
    SELECT payer_id, trial_ends_at, paid_until, billing_status, gateway_subscription_id,
           card_fingerprint, card_token, billing_updated_at
    FROM entitlements
"#;

pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        payer_id: &AccountId,
    ) -> Result<Option<EntitlementRow>, DomainError> {
        let query = format!("{} WHERE payer_id = $1 FOR UPDATE", SELECT_COLUMNS);
        sqlx::query_as::<_, EntitlementRow>(&query)
            .bind(payer_id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to lock entitlement: {}", e)))
    }

    async fn write_row(
        tx: &mut Transaction<'_, Postgres>,
        entitlement: &Entitlement,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE entitlements SET
                trial_ends_at = $2,
                paid_until = $3,
                billing_status = $4,
                gateway_subscription_id = $5,
                card_fingerprint = $6,
                card_token = $7,
                billing_updated_at = $8
            WHERE payer_id = $1
            "#,
        )
        .bind(entitlement.payer_id.as_str())
        .bind(entitlement.trial_ends_at.map(|t| *t.as_datetime()))
        .bind(entitlement.paid_until.map(|t| *t.as_datetime()))
        .bind(entitlement.billing_status.as_str())
        .bind(&entitlement.gateway_subscription_id)
        .bind(&entitlement.card_fingerprint)
        .bind(&entitlement.card_token)
        .bind(entitlement.billing_updated_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update entitlement: {}", e)))?;

        Ok(())
    }
}

/// Database row representation of an entitlement.
#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    payer_id: String,
    trial_ends_at: Option<DateTime<Utc>>,
    paid_until: Option<DateTime<Utc>>,
    billing_status: String,
    gateway_subscription_id: Option<String>,
    card_fingerprint: Option<String>,
    card_token: Option<String>,
    billing_updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(Entitlement {
            payer_id: row_account_id("payer_id", row.payer_id)?,
            trial_ends_at: row.trial_ends_at.map(Timestamp::from_datetime),
            paid_until: row.paid_until.map(Timestamp::from_datetime),
            billing_status: parse_status(&row.billing_status)?,
            gateway_subscription_id: row.gateway_subscription_id,
            card_fingerprint: row.card_fingerprint,
            card_token: row.card_token,
            billing_updated_at: Timestamp::from_datetime(row.billing_updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<BillingStatus, DomainError> {
    BillingStatus::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid billing_status value: {}", s),
        )
    })
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn find_by_payer(&self, payer_id: &AccountId) -> Result<Option<Entitlement>, DomainError> {
        let query = format!("{} WHERE payer_id = $1", SELECT_COLUMNS);
        let row: Option<EntitlementRow> = sqlx::query_as(&query)
            .bind(payer_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find entitlement: {}", e)))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn insert_if_absent(&self, entitlement: &Entitlement) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO entitlements (
                payer_id, trial_ends_at, paid_until, billing_status, gateway_subscription_id,
                card_fingerprint, card_token, billing_updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (payer_id) DO NOTHING
            "#,
        )
        .bind(entitlement.payer_id.as_str())
        .bind(entitlement.trial_ends_at.map(|t| *t.as_datetime()))
        .bind(entitlement.paid_until.map(|t| *t.as_datetime()))
        .bind(entitlement.billing_status.as_str())
        .bind(&entitlement.gateway_subscription_id)
        .bind(&entitlement.card_fingerprint)
        .bind(&entitlement.card_token)
        .bind(entitlement.billing_updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert entitlement: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn modify(
        &self,
        payer_id: &AccountId,
        update: EntitlementUpdate,
    ) -> Result<Option<EntitlementChange>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        let Some(row) = Self::lock_row(&mut tx, payer_id).await? else {
            // Dropping the transaction rolls it back.
            return Ok(None);
        };

        let before = Entitlement::try_from(row)?;
        let mut after = before.clone();
        update(&mut after);

        if after != before {
            Self::write_row(&mut tx, &after).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit entitlement: {}", e)))?;

        Ok(Some(EntitlementChange { before, after }))
    }
}
