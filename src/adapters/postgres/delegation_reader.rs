//! PostgreSQL implementation of DelegationReader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::DelegationLink;
use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::ports::DelegationReader;

use super::row_account_id;

pub struct PostgresDelegationReader {
    pool: PgPool,
}

impl PostgresDelegationReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DelegationRow {
    beneficiary_id: String,
    payer_id: String,
    linked_at: DateTime<Utc>,
}

impl TryFrom<DelegationRow> for DelegationLink {
    type Error = DomainError;

    fn try_from(row: DelegationRow) -> Result<Self, Self::Error> {
        Ok(DelegationLink::new(
            row_account_id("beneficiary_id", row.beneficiary_id)?,
            row_account_id("payer_id", row.payer_id)?,
            Timestamp::from_datetime(row.linked_at),
        ))
    }
}

#[async_trait]
impl DelegationReader for PostgresDelegationReader {
    async fn find_link(
        &self,
        beneficiary_id: &AccountId,
    ) -> Result<Option<DelegationLink>, DomainError> {
        let row: Option<DelegationRow> = sqlx::query_as(
            r#"
            SELECT beneficiary_id, payer_id, linked_at
            FROM delegation_links
            WHERE beneficiary_id = $1
            "#,
        )
        .bind(beneficiary_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find delegation link: {}", e)))?;

        row.map(DelegationLink::try_from).transpose()
    }
}
