//! Ledger data models

use chrono::{DateTime, Utc};
use challan_common::TransactionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of transactions returned per query
pub const DEFAULT_TRANSACTION_QUERY_LIMIT: i64 = 100;

/// Maximum number of transactions that can be returned in a single query.
pub const MAX_TRANSACTION_QUERY_LIMIT: i64 = 1000;

/// A completed batch as stored in the `transactions` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub input_file_url: String,
    pub input_count: i64,
    pub output_file_url: String,
    pub output_count: i64,
    /// `success` or `no results`
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Values for a new ledger row; `id` and `timestamp` are generated on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub input_file_url: String,
    pub input_count: i64,
    pub output_file_url: String,
    pub output_count: i64,
    pub status: TransactionStatus,
}

impl NewTransaction {
    pub fn new(
        input_file_url: impl Into<String>,
        input_count: usize,
        output_file_url: impl Into<String>,
        output_count: usize,
    ) -> Self {
        Self {
            input_file_url: input_file_url.into(),
            input_count: i64::try_from(input_count).unwrap_or(i64::MAX),
            output_file_url: output_file_url.into(),
            output_count: i64::try_from(output_count).unwrap_or(i64::MAX),
            status: TransactionStatus::from_output_count(output_count),
        }
    }
}

/// Pagination for the transaction history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_TRANSACTION_QUERY_LIMIT
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_TRANSACTION_QUERY_LIMIT,
            offset: 0,
        }
    }
}

impl TransactionQuery {
    /// Limit and offset clamped to the accepted range.
    pub fn bounds(&self) -> (i64, i64) {
        (
            self.limit.clamp(1, MAX_TRANSACTION_QUERY_LIMIT),
            self.offset.max(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_derives_status() {
        let hit = NewTransaction::new("in", 2, "out", 2);
        assert_eq!(hit.status, TransactionStatus::Success);
        assert_eq!(hit.input_count, 2);

        let miss = NewTransaction::new("in", 3, "out", 0);
        assert_eq!(miss.status, TransactionStatus::NoResults);
    }

    #[test]
    fn test_query_bounds_are_clamped() {
        let query = TransactionQuery {
            limit: 50_000,
            offset: -4,
        };
        assert_eq!(query.bounds(), (MAX_TRANSACTION_QUERY_LIMIT, 0));

        let query = TransactionQuery { limit: 0, offset: 10 };
        assert_eq!(query.bounds(), (1, 10));
    }

    #[test]
    fn test_query_defaults_from_empty_json() {
        let query: TransactionQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query, TransactionQuery::default());
    }
}
