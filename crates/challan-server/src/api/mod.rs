pub mod response;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::error::{ApiResult, AppError};
use crate::features;
use crate::ledger::Ledger;
use crate::middleware;
use crate::pipeline::BatchOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BatchOrchestrator>,
    pub ledger: Arc<dyn Ledger>,
}

/// Build the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        orchestrator: state.orchestrator.clone(),
        ledger: state.ledger.clone(),
    };

    let api_v1 = features::router(feature_state)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::upload_limit_layer(config.server.max_upload_bytes));

    Router::new()
        .route("/health", get(health))
        .with_state(state)
        .nest("/api/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn health(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.ledger.ping().await.map_err(|e| {
        tracing::error!("Database health check failed: {}", e);
        AppError::Unavailable("database unreachable".to_string())
    })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "database": "connected",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    ))
}
