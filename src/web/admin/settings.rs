//! `GET|PUT /api/admin/settings`.

use axum::extract::State;
use axum::Json;

use crate::domain::SchedulingSettings;
use crate::error::Error;
use crate::state::AppState;
use crate::store;
use crate::web::error::ApiError;
use crate::web::extractors::Admin;

pub async fn get(
    Admin(_session): Admin,
    State(state): State<AppState>,
) -> Result<Json<SchedulingSettings>, ApiError> {
    let settings = store::settings::read(state.store.pool()).await?;
    Ok(Json(settings))
}

pub async fn put(
    Admin(_session): Admin,
    State(state): State<AppState>,
    Json(settings): Json<SchedulingSettings>,
) -> Result<Json<SchedulingSettings>, ApiError> {
    settings.validate().map_err(Error::validation)?;

    store::settings::write(state.store.pool(), &settings).await?;

    Ok(Json(settings))
}
