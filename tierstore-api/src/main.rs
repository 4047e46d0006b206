//! tierstore Server Entry Point
//!
//! Loads configuration, reconciles the data directory into the in-memory
//! tier, and starts the Axum HTTP server.

use std::sync::Arc;

use tierstore_api::telemetry::{init_tracer, TelemetryConfig};
use tierstore_api::{create_api_router, ApiError, ApiResult, AppState};
use tierstore_core::{PatternUidGenerator, ServiceConfig, UidGenerator};
use tierstore_storage::{reconcile, FsRecordStore, MemoryTier, RecordTier, TierConfig, TieredStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ServiceConfig::load()?;

    let telemetry_config = TelemetryConfig::from_log_config(&config.logs);
    init_tracer(&telemetry_config)?;

    let uids = Arc::new(PatternUidGenerator::from_config(&config.uid)?);

    let disk = FsRecordStore::open(&config.data.path, uids.clone())
        .await
        .map_err(|e| {
            ApiError::internal_error(format!(
                "Failed to open data directory {}: {}",
                config.data.path.display(),
                e
            ))
        })?
        .with_scan_concurrency(config.data.scan_concurrency);
    let data_root = disk.root().to_path_buf();

    let memory = MemoryTier::from_config(&config.cache);
    let report = reconcile(&disk, &memory)
        .await
        .map_err(|e| ApiError::internal_error(format!("Reconciliation failed: {}", e)))?;
    tracing::info!(
        data_root = %data_root.display(),
        loaded = report.loaded,
        skipped = report.skipped,
        "Data directory reconciled"
    );

    let store = TieredStore::new(
        memory,
        Arc::new(disk) as Arc<dyn RecordTier>,
        TierConfig::new(config.cache.default_ttl()),
    );
    let state = AppState::new(store, uids as Arc<dyn UidGenerator>).with_data_root(data_root);
    let app = create_api_router(state, &config.http);

    let addr = format!("{}:{}", config.http.host, config.http.port);
    tracing::info!(
        %addr,
        default_ttl_secs = config.cache.data_ttl_secs,
        max_request_body = config.http.max_request_body,
        "Starting tierstore server"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
