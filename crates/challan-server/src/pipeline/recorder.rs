//! Ledger writes for finished batches

use std::sync::Arc;
use tracing::{error, info};

use crate::ledger::{Ledger, NewTransaction, Transaction};

/// Writes the single ledger entry of a finished batch
#[derive(Clone)]
pub struct RunRecorder {
    ledger: Arc<dyn Ledger>,
}

impl RunRecorder {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Persist `entry`. A failed write is logged and yields `None`.
    pub async fn record(&self, entry: NewTransaction) -> Option<Transaction> {
        match self.ledger.insert(entry).await {
            Ok(transaction) => {
                info!(transaction_id = %transaction.id, status = %transaction.status, "Recorded batch");
                Some(transaction)
            },
            Err(e) => {
                error!(error = %e, "Failed to write ledger entry");
                None
            },
        }
    }
}
