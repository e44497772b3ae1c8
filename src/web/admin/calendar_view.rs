//! `GET /api/admin/calendar-view`.
//!
//! Merges the host's recurring availability template, cached external
//! events, and confirmed bookings into one timeline for the admin UI.
//! Availability is emitted first so calendar/booking events render on top
//! of it, and is suppressed entirely for any host-local date that holds an
//! all-day external event.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::Error;
use crate::slot_engine;
use crate::state::AppState;
use crate::store;
use crate::web::error::ApiError;
use crate::web::extractors::Admin;

#[derive(Debug, Deserialize)]
pub struct CalendarViewQuery {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CalendarEventKind {
    Availability,
    Calendar,
    Booking,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CalendarViewEvent {
    pub kind: CalendarEventKind,
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CalendarViewResponse {
    pub events: Vec<CalendarViewEvent>,
}

pub async fn get(
    Admin(_session): Admin,
    State(state): State<AppState>,
    Query(query): Query<CalendarViewQuery>,
) -> Result<Json<CalendarViewResponse>, ApiError> {
    if query.start >= query.end {
        return Err(Error::validation("start must be before end").into());
    }

    let tz = match &query.tz {
        Some(s) => {
            Tz::from_str(s).map_err(|_| Error::validation(format!("unknown timezone {s}")))?
        }
        None => state.host_timezone,
    };

    let cached_events = store::cached_events::range(state.store.pool(), query.start, query.end).await?;
    let bookings = store::bookings::range_confirmed(state.store.pool(), query.start, query.end).await?;
    let template = store::availability::read(state.store.pool()).await?;

    // Any host-local date holding an all-day external event loses its
    // availability rendering for that date.
    let suppressed_dates: HashSet<chrono::NaiveDate> = cached_events
        .iter()
        .filter(|e| e.all_day)
        .map(|e| e.start.with_timezone(&tz).date_naive())
        .collect();

    let host_intervals =
        slot_engine::expand_host_template(&template, state.host_timezone, query.start, query.end);

    let mut events = Vec::new();

    for interval in host_intervals {
        if interval.end <= query.start || interval.start >= query.end {
            continue;
        }
        let local_date = interval.start.with_timezone(&tz).date_naive();
        if suppressed_dates.contains(&local_date) {
            continue;
        }
        events.push(CalendarViewEvent {
            kind: CalendarEventKind::Availability,
            id: None,
            title: None,
            start: interval.start,
            end: interval.end,
            all_day: false,
        });
    }

    for event in cached_events {
        events.push(CalendarViewEvent {
            kind: CalendarEventKind::Calendar,
            id: Some(event.id),
            title: event.summary,
            start: event.start,
            end: event.end,
            all_day: event.all_day,
        });
    }

    for booking in bookings {
        events.push(CalendarViewEvent {
            kind: CalendarEventKind::Booking,
            id: Some(booking.id),
            title: Some(booking.title),
            start: booking.start.with_timezone(&Utc),
            end: booking.end.with_timezone(&Utc),
            all_day: false,
        });
    }

    Ok(Json(CalendarViewResponse { events }))
}
