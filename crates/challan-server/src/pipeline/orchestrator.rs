//! Batch sequencing from upload to ledger entry

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument};

use super::aggregate::{flatten, render_csv};
use super::egress::EgressResolver;
use super::enrichment::{EnrichmentClient, RowOutcome};
use super::ingest::parse_input;
use super::quota::QuotaEvictor;
use super::recorder::RunRecorder;
use super::txn::{input_key, output_key, TxnIdGenerator};
use super::{BatchError, BatchReport, BatchStage};
use crate::config::QuotaConfig;
use crate::ledger::{Ledger, NewTransaction};
use crate::storage::{ObjectStore, CSV_CONTENT_TYPE};

/// Drives one uploaded CSV through every pipeline stage
pub struct BatchOrchestrator {
    store: Arc<dyn ObjectStore>,
    recorder: RunRecorder,
    evictor: QuotaEvictor,
    resolver: Arc<EgressResolver>,
    enrichment: EnrichmentClient,
    ids: TxnIdGenerator,
}

impl BatchOrchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        ledger: Arc<dyn Ledger>,
        resolver: Arc<EgressResolver>,
        enrichment: EnrichmentClient,
        quota: QuotaConfig,
    ) -> Self {
        Self {
            store,
            recorder: RunRecorder::new(ledger),
            evictor: QuotaEvictor::new(quota),
            resolver,
            enrichment,
            ids: TxnIdGenerator::new(),
        }
    }

    /// Run a batch to completion. A panic anywhere inside the batch is
    /// reported as [`BatchError::Internal`].
    pub async fn run(&self, input: Vec<u8>) -> Result<BatchReport, BatchError> {
        match AssertUnwindSafe(self.execute(input)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(error = %message, "Batch panicked");
                Err(BatchError::Internal(message))
            },
        }
    }

    #[instrument(skip(self, input), fields(txn_id, input_bytes = input.len()))]
    async fn execute(&self, input: Vec<u8>) -> Result<BatchReport, BatchError> {
        let txn_id = self.ids.next();
        tracing::Span::current().record("txn_id", txn_id);

        enter(BatchStage::Evicting);
        self.evictor.run(self.store.as_ref()).await;

        enter(BatchStage::Parsing);
        let rows = parse_input(&input).map_err(|e| abort(BatchStage::Parsing, e))?;
        info!(rows = rows.len(), "Parsed input");

        enter(BatchStage::StoringInput);
        let input_key = input_key(txn_id);
        self.store
            .put_object(&input_key, input, CSV_CONTENT_TYPE)
            .await
            .map_err(|e| abort(BatchStage::StoringInput, BatchError::storage(&input_key, e)))?;
        let input_url = self.store.object_url(&input_key);

        enter(BatchStage::Resolving);
        let mut current_ip = self.resolver.resolve().await;

        enter(BatchStage::Enriching);
        let mut per_row = Vec::with_capacity(rows.len());
        let mut skipped_rows = 0;
        for (index, row) in rows.iter().enumerate() {
            let external_ref = format!("{}-{}", txn_id, index);
            match self
                .enrichment
                .enrich(row, &external_ref, &self.resolver, &mut current_ip)
                .await
            {
                RowOutcome::Enriched(records) => per_row.push(records),
                RowOutcome::Skipped { .. } => {
                    skipped_rows += 1;
                    per_row.push(Vec::new());
                },
            }
        }
        let records = flatten(per_row);

        enter(BatchStage::StoringOutput);
        let output = render_csv(&records).map_err(|e| abort(BatchStage::StoringOutput, e))?;
        let output_key = output_key(txn_id);
        self.store
            .put_object(&output_key, output, CSV_CONTENT_TYPE)
            .await
            .map_err(|e| abort(BatchStage::StoringOutput, BatchError::storage(&output_key, e)))?;
        let download_url = self.store.object_url(&output_key);

        enter(BatchStage::Recording);
        let entry = NewTransaction::new(&input_url, rows.len(), &download_url, records.len());
        let status = entry.status;
        let recorded = self.recorder.record(entry).await.is_some();

        enter(BatchStage::Done);
        info!(
            input_count = rows.len(),
            output_count = records.len(),
            skipped_rows,
            status = %status,
            recorded,
            "Batch finished"
        );

        Ok(BatchReport {
            txn_id,
            download_url,
            input_count: rows.len(),
            output_count: records.len(),
            skipped_rows,
            status,
            recorded,
        })
    }
}

fn enter(stage: BatchStage) {
    info!(stage = %stage, "Batch stage");
}

fn abort(stage: BatchStage, err: BatchError) -> BatchError {
    error!(stage = %stage, code = err.code(), error = %err, "Batch aborted");
    err
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "batch panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let static_payload: Box<dyn Any + Send> = Box::new("static boom");
        assert_eq!(panic_message(static_payload.as_ref()), "static boom");

        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned_payload.as_ref()), "owned boom");

        let other_payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other_payload.as_ref()), "batch panicked");
    }
}
