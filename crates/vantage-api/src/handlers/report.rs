//! /summary handlers — the poll endpoint and snapshot listing.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use vantage_services::{ReportReply, ReportRequest};

use super::{caller_from_headers, error_response, ApiState};

// ── /summary (POST) ───────────────────────────────────────────────────────────

/// One poll cycle. Clients send `start` once, then re-poll with `no_start`
/// until the status is terminal.
pub async fn handle_summary(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<ReportRequest>,
) -> Result<Response, (StatusCode, String)> {
    let caller = caller_from_headers(&headers)?;

    match state.handler.handle(&caller, &request) {
        Ok(ReportReply::Live(response)) => Ok(Json(response).into_response()),
        // Stored bodies are already serialized; return them verbatim.
        Ok(ReportReply::Stored(body)) => Ok((
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()),
        Err(e) => Err(error_response(e)),
    }
}

// ── /summary/snapshots (GET) ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SnapshotListResponse {
    pub ids: Vec<String>,
}

pub async fn handle_snapshot_list(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<SnapshotListResponse>, (StatusCode, String)> {
    let caller = caller_from_headers(&headers)?;
    let ids = state
        .handler
        .list_snapshots(&caller)
        .map_err(error_response)?;
    Ok(Json(SnapshotListResponse { ids }))
}
