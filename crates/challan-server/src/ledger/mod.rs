//! Transaction ledger
//!
//! Append-only history of completed batches. Each batch writes exactly one
//! row after its input and output objects are stored; rows are never updated.

mod models;
mod queries;

use async_trait::async_trait;
use thiserror::Error;

pub use models::{
    NewTransaction, Transaction, TransactionQuery, DEFAULT_TRANSACTION_QUERY_LIMIT,
    MAX_TRANSACTION_QUERY_LIMIT,
};
pub use queries::PgLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Insert and list operations over the transaction ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn insert(&self, entry: NewTransaction) -> Result<Transaction, LedgerError>;

    /// Newest first.
    async fn list(&self, query: TransactionQuery) -> Result<Vec<Transaction>, LedgerError>;

    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), LedgerError>;
}
