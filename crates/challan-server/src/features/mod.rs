//! Feature slices of the `/api/v1` surface
//!
//! - **batches**: upload a CSV and run it through the enrichment pipeline
//! - **transactions**: history of completed batches, newest first

pub mod batches;
pub mod transactions;

use axum::Router;
use std::sync::Arc;

use crate::ledger::Ledger;
use crate::pipeline::BatchOrchestrator;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub orchestrator: Arc<BatchOrchestrator>,
    pub ledger: Arc<dyn Ledger>,
}

/// Mounts every feature under its own path prefix
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/batches", batches::batches_routes().with_state(state.orchestrator))
        .nest(
            "/transactions",
            transactions::transactions_routes().with_state(state.ledger),
        )
}
