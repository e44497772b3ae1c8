//! `GET /api/admin/calendars`, `GET /api/admin/calendars/{id}/history`,
//! `POST /api/admin/calendars/{id}/sync`.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::caldav;
use crate::domain::{CalendarSourceResponse, SyncHistoryResponse};
use crate::error::Error;
use crate::state::AppState;
use crate::store;
use crate::web::error::ApiError;
use crate::web::extractors::Admin;

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CalendarListResponse {
    pub sources: Vec<CalendarSourceResponse>,
}

pub async fn list(
    Admin(_session): Admin,
    State(state): State<AppState>,
) -> Result<Json<CalendarListResponse>, ApiError> {
    let sources = store::calendars::list(state.store.pool()).await?;
    Ok(Json(CalendarListResponse {
        sources: sources.into_iter().map(CalendarSourceResponse::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HistoryResponse {
    pub entries: Vec<SyncHistoryResponse>,
}

pub async fn history(
    Admin(_session): Admin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    if !(1..=50).contains(&query.limit) {
        return Err(Error::validation("limit must be between 1 and 50").into());
    }

    let entries = store::sync_history::list_latest(state.store.pool(), id, query.limit).await?;
    Ok(Json(HistoryResponse {
        entries: entries.into_iter().map(SyncHistoryResponse::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct SyncTriggeredResponse {
    ok: bool,
}

/// Runs the sync pipeline for one source inline and waits for it, unlike the
/// background service tick: an admin clicking "sync now" wants to see the
/// result immediately.
pub async fn sync_now(
    Admin(_session): Admin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SyncTriggeredResponse>, ApiError> {
    let source = store::calendars::get(state.store.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("calendar source not found"))?;

    let creds = state
        .calendar_sources
        .iter()
        .find(|c| c.provider == source.provider && c.base_url == source.base_url)
        .ok_or_else(|| ApiError::not_found("calendar source is no longer configured"))?;

    let now = state.clock.now();
    caldav::sync_source(&state.store, creds, state.host_timezone, now, true).await?;

    Ok(Json(SyncTriggeredResponse { ok: true }))
}
