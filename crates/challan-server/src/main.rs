//! Challan server - main entry point

use anyhow::{Context, Result};
use challan_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use challan_server::{
    api::{self, AppState},
    config::Config,
    db,
    ledger::{Ledger, PgLedger},
    pipeline::{BatchOrchestrator, EgressResolver, EnrichmentClient},
    storage::{ObjectStore, Storage},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("challan-server".to_string())
        .filter_directives("challan_server=debug,tower_http=debug,sqlx=warn".to_string())
        .build()
        .merge_env()?;

    // Keeps the non-blocking file writer alive until shutdown.
    let _log_guard = init_logging(&log_config)?;

    info!("Starting challan server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let store: Arc<dyn ObjectStore> = Arc::new(Storage::new(config.storage.clone()));
    let ledger: Arc<dyn Ledger> = Arc::new(PgLedger::new(pool));

    let resolver = Arc::new(
        EgressResolver::new(config.egress.clone()).context("Failed to build egress IP client")?,
    );
    let enrichment = EnrichmentClient::new(config.enrichment.clone())
        .context("Failed to build challan lookup client")?;

    let orchestrator = Arc::new(BatchOrchestrator::new(
        store,
        ledger.clone(),
        resolver,
        enrichment,
        config.quota,
    ));

    let app = api::create_router(AppState { orchestrator, ledger }, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for in-flight batches", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
