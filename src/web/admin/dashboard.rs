//! `GET /api/admin/dashboard`.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use ts_rs::TS;

use crate::state::AppState;
use crate::store;
use crate::web::error::ApiError;
use crate::web::extractors::Admin;

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardResponse {
    pub upcoming_count: i64,
    #[ts(type = "string | null")]
    pub next_booking_time: Option<DateTime<FixedOffset>>,
    pub next_booking_title: Option<String>,
}

pub async fn get(
    Admin(_session): Admin,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let now = state.clock.now();

    let upcoming_count = store::bookings::count_upcoming(state.store.pool(), now).await?;
    let next = store::bookings::next_upcoming(state.store.pool(), now).await?;

    Ok(Json(DashboardResponse {
        upcoming_count,
        next_booking_time: next.as_ref().map(|b| b.start),
        next_booking_title: next.map(|b| b.title),
    }))
}
