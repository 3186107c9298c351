//! Postgres-backed ledger

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::models::{NewTransaction, Transaction, TransactionQuery};
use super::{Ledger, LedgerError};

/// Ledger stored in the `transactions` table
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn insert(&self, entry: NewTransaction) -> Result<Transaction, LedgerError> {
        let record = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                id, input_file_url, input_count, output_file_url, output_count, status
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, input_file_url, input_count, output_file_url, output_count,
                      status, timestamp
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.input_file_url)
        .bind(entry.input_count)
        .bind(&entry.output_file_url)
        .bind(entry.output_count)
        .bind(entry.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        debug!(transaction_id = %record.id, status = %record.status, "Inserted transaction");

        Ok(record)
    }

    async fn list(&self, query: TransactionQuery) -> Result<Vec<Transaction>, LedgerError> {
        let (limit, offset) = query.bounds();

        let records = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, input_file_url, input_count, output_file_url, output_count,
                   status, timestamp
            FROM transactions
            ORDER BY timestamp DESC
            LIMIT $1
            OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = records.len(), "Queried transactions");

        Ok(records)
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        crate::db::health_check(&self.pool)
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))
    }
}
