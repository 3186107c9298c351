//! Challan batch enrichment server
//!
//! Accepts a CSV of vehicle registration numbers, looks up the challans of
//! every vehicle with an external service and publishes the results as a CSV
//! in a shared S3-compatible bucket. Each run is recorded in a Postgres
//! ledger.
//!
//! # Layout
//!
//! - [`pipeline`]: the batch stages and [`pipeline::BatchOrchestrator`]
//! - [`storage`]: bucket access behind [`storage::ObjectStore`]
//! - [`ledger`]: the `transactions` table behind [`ledger::Ledger`]
//! - [`api`] and [`features`]: the HTTP surface
//!
//! # Example
//!
//! ```no_run
//! use challan_server::{config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     db::run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ledger;
pub mod middleware;
pub mod pipeline;
pub mod storage;

pub use error::{ApiResult, AppError};
