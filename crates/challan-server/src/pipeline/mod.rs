//! Batch enrichment pipeline
//!
//! One uploaded CSV runs through the stages below, strictly in order:
//!
//! 1. quota eviction over the shared bucket
//! 2. CSV parsing
//! 3. input object write
//! 4. egress IP resolution
//! 5. per-row challan lookups (one request in flight, one retry per row)
//! 6. output CSV rendering and write
//! 7. ledger entry
//!
//! Parsing and both object writes abort the batch. Lookup failures only skip
//! the affected row and a ledger failure is logged without failing the batch.

mod aggregate;
mod egress;
mod enrichment;
mod ingest;
mod orchestrator;
mod quota;
mod recorder;
mod txn;

use challan_common::TransactionStatus;
use serde::Serialize;
use thiserror::Error;

pub use aggregate::{flatten, render_csv};
pub use egress::{EgressError, EgressResolver};
pub use enrichment::{parse_challans, EnrichmentClient, EnrichmentError, RowOutcome};
pub use ingest::parse_input;
pub use orchestrator::BatchOrchestrator;
pub use quota::{plan_eviction, EvictionReport, QuotaEvictor};
pub use recorder::RunRecorder;
pub use txn::{input_key, output_key, TxnIdGenerator};

/// Errors that abort a batch
#[derive(Debug, Error)]
pub enum BatchError {
    /// No file was supplied with the request
    #[error("Upload error: {0}")]
    Upload(String),

    /// The uploaded buffer is not a usable CSV
    #[error("Parse error: {0}")]
    Parse(String),

    /// Writing the input or output object failed
    #[error("Failed to store '{key}': {message}")]
    StorageWrite { key: String, message: String },

    /// Anything else, including a panic inside the batch
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    pub fn storage(key: &str, err: anyhow::Error) -> Self {
        Self::StorageWrite {
            key: key.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// Machine-readable code used in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Upload(_) => "UPLOAD_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::StorageWrite { .. } => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Stages a batch moves through; logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Evicting,
    Parsing,
    StoringInput,
    Resolving,
    Enriching,
    StoringOutput,
    Recording,
    Done,
}

impl BatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evicting => "evicting",
            Self::Parsing => "parsing",
            Self::StoringInput => "storing_input",
            Self::Resolving => "resolving",
            Self::Enriching => "enriching",
            Self::StoringOutput => "storing_output",
            Self::Recording => "recording",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for BatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub txn_id: u64,
    /// Public URL of the output CSV
    pub download_url: String,
    pub input_count: usize,
    pub output_count: usize,
    /// Rows whose lookup and retry both failed
    pub skipped_rows: usize,
    pub status: TransactionStatus,
    /// Whether the ledger entry was written
    pub recorded: bool,
}
