//! Error types shared across the challan workspace

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, ChallanError>;

/// Errors raised by the shared types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChallanError {
    #[error("Invalid transaction status: '{0}' (expected 'success' or 'no results')")]
    InvalidStatus(String),
}
