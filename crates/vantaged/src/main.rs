//! vantaged — Vantage report summary daemon.
//!
//! Wires the queue, snapshot store, handler, and scheduler together, then
//! serves the JSON API until SIGINT or an API-initiated shutdown. The
//! scheduler handle is owned here so shutdown can cancel it exactly once
//! before the process exits.

use std::sync::Arc;

use anyhow::{Context, Result};

use vantage_core::config::VantageConfig;
use vantage_services::{
    AutoSnapshot, ReportHandler, SnapshotDb, SnapshotMap, SnapshotStore, StaticAuthorizer,
    SummaryQueue, ThreadedOracle,
};

mod builder;

use builder::SectionReportBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = VantageConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = VantageConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        VantageConfig::default()
    });
    tracing::info!(port = config.api.port, "vantaged starting");

    // Snapshot store
    let store: Arc<dyn SnapshotStore> = if config.storage.in_memory {
        tracing::info!("using in-memory snapshot store");
        Arc::new(SnapshotMap::new())
    } else {
        let db = SnapshotDb::open(&config.storage.db_path)
            .with_context(|| format!("opening snapshot db {}", config.storage.db_path.display()))?;
        tracing::info!(path = %config.storage.db_path.display(), "snapshot db opened");
        Arc::new(db)
    };

    // Queue over the built-in oracle
    let oracle = Arc::new(ThreadedOracle::new(Arc::new(SectionReportBuilder::new(
        config.oracle.clone(),
    ))));
    let queue = SummaryQueue::new(oracle);

    // Handler
    let authorizer = Arc::new(StaticAuthorizer::from_config(&config.auth));
    let handler = ReportHandler::new(queue.clone(), store.clone(), authorizer);

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Auto-snapshot scheduler ──────────────────────────────────────────────
    let scheduler_handle = if config.scheduler.enabled {
        tracing::info!(
            initial_delay_minutes = config.scheduler.initial_delay_minutes,
            period_minutes = config.scheduler.period_minutes,
            "automatic snapshots enabled"
        );
        Some(AutoSnapshot::new(queue.clone(), store.clone(), config.scheduler.clone()).spawn())
    } else {
        tracing::info!("automatic snapshots not enabled");
        None
    };

    // ── API server ───────────────────────────────────────────────────────────
    let api_task = {
        let state = vantage_api::ApiState {
            handler,
            queue,
            scheduler_enabled: config.scheduler.enabled,
            shutdown_tx: shutdown_tx.clone(),
        };
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = vantage_api::serve(state, port).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────
    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = api_task           => tracing::error!("API task exited: {:?}", r),
    }

    // Cancel the scheduler before exiting so an in-progress backoff sleep
    // is interrupted rather than abandoned mid-firing.
    if let Some(handle) = scheduler_handle {
        handle.cancel();
        handle.join().await;
    }

    Ok(())
}
