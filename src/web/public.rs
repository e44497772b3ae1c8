//! Public (unauthenticated) API handlers: parse, slots, book.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use super::error::ApiError;
use super::validate;
use crate::domain::{CachedEvent, SchedulingSettings};
use crate::error::Error;
use crate::interval::Interval;
use crate::revalidator::{self, BookingRequest};
use crate::slot_engine::{self, ParticipantWindow, Slot, SlotEngineInput};
use crate::state::AppState;
use crate::store;

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ParseRequestBody {
    pub message: String,
    pub timezone: String,
    #[serde(default)]
    pub previous_messages: Vec<String>,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ParseResponseBody {
    pub parse_result: serde_json::Value,
    pub system_message: String,
}

/// `POST /api/parse`.
pub async fn parse(
    State(state): State<AppState>,
    Json(body): Json<ParseRequestBody>,
) -> Result<Json<ParseResponseBody>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(Error::validation("message must not be empty").into());
    }
    Tz::from_str(&body.timezone)
        .map_err(|_| Error::validation(format!("unknown timezone {}", body.timezone)))?;

    let response = state
        .parser_client
        .parse(&body.message, &body.timezone, &body.previous_messages)
        .await?;

    Ok(Json(ParseResponseBody {
        parse_result: response.parse_result,
        system_message: response.system_message,
    }))
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AvailabilityWindowBody {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SlotsRequestBody {
    pub availability_windows: Vec<AvailabilityWindowBody>,
    pub duration_minutes: i32,
    pub timezone: String,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SlotsResponseBody {
    pub slots: Vec<Slot>,
}

/// `POST /api/slots`.
pub async fn slots(
    State(state): State<AppState>,
    Json(body): Json<SlotsRequestBody>,
) -> Result<Json<SlotsResponseBody>, ApiError> {
    let participant_timezone = Tz::from_str(&body.timezone)
        .map_err(|_| Error::validation(format!("unknown timezone {}", body.timezone)))?;

    let windows: Vec<ParticipantWindow> = body
        .availability_windows
        .iter()
        .map(|w| ParticipantWindow {
            start: w.start,
            end: w.end,
        })
        .collect();

    if windows.is_empty() {
        return Err(Error::validation("availabilityWindows must not be empty").into());
    }

    let range_start = windows.iter().map(|w| w.start.with_timezone(&chrono::Utc)).min().unwrap();
    let range_end = windows.iter().map(|w| w.end.with_timezone(&chrono::Utc)).max().unwrap();

    let settings: SchedulingSettings = store::settings::read(state.store.pool()).await?;
    let template = store::availability::read(state.store.pool()).await?;
    let existing_bookings = store::bookings::range_confirmed(state.store.pool(), range_start, range_end).await?;
    let cached_events: Vec<CachedEvent> =
        store::cached_events::range(state.store.pool(), range_start, range_end).await?;

    let blockers: Vec<Interval> = existing_bookings
        .iter()
        .map(|b| Interval::new(b.start.with_timezone(&chrono::Utc), b.end.with_timezone(&chrono::Utc)))
        .chain(cached_events.iter().map(|e| Interval::new(e.start, e.end)))
        .collect();

    let now = state.clock.now();

    let computed = slot_engine::compute_slots(SlotEngineInput {
        participant_windows: &windows,
        host_template: &template,
        host_timezone: state.host_timezone,
        blockers: &blockers,
        duration_minutes: body.duration_minutes,
        participant_timezone,
        now,
        settings: &settings,
    })?;

    Ok(Json(SlotsResponseBody { slots: computed }))
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SlotBody {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookRequestBody {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub slot: SlotBody,
    pub duration_minutes: i32,
    pub timezone: String,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookResponseBody {
    pub booking_id: uuid::Uuid,
    pub confirmed: bool,
}

/// Structural email validation: `local@domain`, a `.` in the domain, no
/// trailing dot.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if domain.ends_with('.') || !domain.contains('.') {
        return false;
    }
    !domain.contains('@')
}

/// `POST /api/book`.
pub async fn book(
    State(state): State<AppState>,
    Json(body): Json<BookRequestBody>,
) -> Result<Json<BookResponseBody>, ApiError> {
    if !is_valid_email(&body.email) {
        return Err(Error::validation("invalid email address").into());
    }
    if body.slot.end - body.slot.start != chrono::Duration::minutes(body.duration_minutes as i64) {
        return Err(Error::validation("slot duration does not match durationMinutes").into());
    }

    let name = validate::bounded("name", body.name, 200)?;
    let email = validate::bounded("email", body.email, 254)?;
    let title = validate::bounded("title", body.title, 300)?;
    let phone = validate::bounded_optional("phone", body.phone, 64)?;
    let description = validate::bounded_optional("description", body.description, 2000)?;

    let request = BookingRequest {
        name,
        email,
        phone,
        title,
        description,
        start: body.slot.start,
        end: body.slot.end,
        timezone: body.timezone,
        duration_minutes: body.duration_minutes,
    };

    let now = state.clock.now();
    let booking = revalidator::book(&state.store, now, state.host_timezone, request).await?;

    Ok(Json(BookResponseBody {
        booking_id: booking.id,
        confirmed: true,
    }))
}
