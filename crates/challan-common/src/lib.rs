//! Challan Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the challan batch workspace.
//!
//! # Overview
//!
//! - **Types**: input rows, challan records, storage objects and ledger status
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` variables
//! - **Errors**: the small error enum used by the shared types
//!
//! # Example
//!
//! ```no_run
//! use challan_common::logging::{init_logging, LogConfig};
//! use challan_common::types::TransactionStatus;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!(status = %TransactionStatus::from_output_count(3), "ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{ChallanError, Result};
pub use types::{ChallanRecord, InputRow, StorageObject, TransactionStatus};
