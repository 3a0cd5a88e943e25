//! /status and /daemon/shutdown handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub in_flight: Vec<InFlightJson>,
    pub snapshots: usize,
    pub scheduler_enabled: bool,
}

#[derive(Serialize)]
pub struct InFlightJson {
    pub org: String,
    pub owner: String,
    pub percent: u8,
    pub age_secs: u64,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let in_flight = state
        .queue
        .in_flight()
        .into_iter()
        .map(|info| InFlightJson {
            org: info.scope.org.clone(),
            owner: format!("{:?}", info.scope.owner),
            percent: info.percent,
            age_secs: info.age_secs,
        })
        .collect();

    let snapshots = state
        .handler
        .store()
        .list()
        .map(|ids| ids.len())
        .unwrap_or(0);

    Json(StatusResponse {
        in_flight,
        snapshots,
        scheduler_enabled: state.scheduler_enabled,
    })
}

// ── /daemon/shutdown ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    let _ = state.shutdown_tx.send(());

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
