//! `GET /api/admin/bookings`, `GET /api/admin/bookings/{id}`,
//! `POST /api/admin/bookings/{id}/cancel`.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::domain::{BookingResponse, BookingStatus};
use crate::error::Error;
use crate::state::AppState;
use crate::store;
use crate::web::error::ApiError;
use crate::web::extractors::Admin;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    page: i64,
    #[serde(default = "default_page_size")]
    page_size: i64,
    status: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}

pub async fn list(
    Admin(_session): Admin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<BookingListResponse>, ApiError> {
    if query.page < 1 {
        return Err(Error::validation("page must be at least 1").into());
    }
    if !(1..=100).contains(&query.page_size) {
        return Err(Error::validation("pageSize must be between 1 and 100").into());
    }

    // Any status value other than `confirmed`/`cancelled` (including `all`
    // or absent) returns every booking, unfiltered.
    let status = query.status.as_deref().and_then(BookingStatus::parse);

    let (bookings, total_count) = store::bookings::list(
        state.store.pool(),
        query.page,
        query.page_size,
        status,
    )
    .await?;

    Ok(Json(BookingListResponse {
        bookings: bookings.into_iter().map(BookingResponse::from).collect(),
        total_count,
        page: query.page,
        page_size: query.page_size,
    }))
}

pub async fn get(
    Admin(_session): Admin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = store::bookings::get(state.store.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("booking not found"))?;

    Ok(Json(BookingResponse::from(booking)))
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    ok: bool,
}

/// Idempotent: cancelling an already-cancelled booking still returns
/// `{ok:true}`. 404 only when the id does not exist at all.
pub async fn cancel(
    Admin(_session): Admin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let booking = store::bookings::get(state.store.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("booking not found"))?;

    store::bookings::cancel(state.store.pool(), id).await?;

    if booking.status == BookingStatus::Confirmed {
        state
            .smtp_client
            .send_cancellation(&booking.email, &booking.name, &booking.title)
            .await;
    }

    Ok(Json(OkResponse { ok: true }))
}
