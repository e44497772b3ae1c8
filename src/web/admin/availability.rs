//! `GET|PUT /api/admin/availability`.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::domain::HostAvailabilitySlot;
use crate::error::Error;
use crate::state::AppState;
use crate::store;
use crate::web::error::ApiError;
use crate::web::extractors::Admin;

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AvailabilityResponse {
    pub slots: Vec<HostAvailabilitySlot>,
}

pub async fn get(
    Admin(_session): Admin,
    State(state): State<AppState>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let slots = store::availability::read(state.store.pool()).await?;
    Ok(Json(AvailabilityResponse { slots }))
}

#[derive(Debug, Deserialize)]
pub struct PutRequest {
    slots: Vec<HostAvailabilitySlot>,
}

pub async fn put(
    Admin(_session): Admin,
    State(state): State<AppState>,
    Json(body): Json<PutRequest>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    if body.slots.is_empty() {
        return Err(Error::validation("slots must not be empty").into());
    }
    if let Some(bad) = body.slots.iter().find(|s| !s.is_valid()) {
        return Err(Error::validation(format!(
            "invalid slot: dayOfWeek={} startTime={} endTime={}",
            bad.day_of_week, bad.start_time, bad.end_time
        ))
        .into());
    }

    store::availability::replace_all(state.store.pool(), &body.slots).await?;

    Ok(Json(AvailabilityResponse { slots: body.slots }))
}
