//! Recomputes slot validity under current store state immediately before
//! persisting a booking, and performs the atomic insert-or-conflict.

use crate::domain::{Booking, BookingStatus};
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::slot_engine::{self, ParticipantWindow, SlotEngineInput};
use crate::store::{self, Store};
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use uuid::Uuid;

pub struct BookingRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub timezone: String,
    pub duration_minutes: i32,
}

/// Pre-check (optimistic replay of the Slot Engine) plus a transactional
/// re-check. At no point after a successful return may two confirmed
/// bookings overlap.
pub async fn book(
    store: &Store,
    now: DateTime<Utc>,
    host_timezone: Tz,
    request: BookingRequest,
) -> Result<Booking> {
    let participant_timezone = Tz::from_str(&request.timezone)
        .map_err(|_| Error::validation(format!("unknown timezone {}", request.timezone)))?;

    let settings = store::settings::read(store.pool()).await?;
    let template = store::availability::read(store.pool()).await?;

    let start_instant = request.start.with_timezone(&Utc);
    let end_instant = request.end.with_timezone(&Utc);

    let existing_bookings = store::bookings::range_confirmed(store.pool(), start_instant, end_instant).await?;
    let cached_events = store::cached_events::range(store.pool(), start_instant, end_instant).await?;

    let blockers: Vec<Interval> = existing_bookings
        .iter()
        .map(|b| Interval::new(b.start.with_timezone(&Utc), b.end.with_timezone(&Utc)))
        .chain(cached_events.iter().map(|e| Interval::new(e.start, e.end)))
        .collect();

    let window = ParticipantWindow {
        start: request.start,
        end: request.end,
    };

    let slots = slot_engine::compute_slots(SlotEngineInput {
        participant_windows: &[window],
        host_template: &template,
        host_timezone,
        blockers: &blockers,
        duration_minutes: request.duration_minutes,
        participant_timezone,
        now,
        settings: &settings,
    })?;

    let appears = slots
        .iter()
        .any(|s| s.start.with_timezone(&Utc) == start_instant && s.end.with_timezone(&Utc) == end_instant);

    if !appears {
        return Err(Error::SlotUnavailable);
    }

    let booking = Booking {
        id: Uuid::new_v4(),
        name: request.name,
        email: request.email,
        phone: request.phone,
        title: request.title,
        description: request.description,
        start: request.start,
        end: request.end,
        timezone: request.timezone,
        duration_minutes: request.duration_minutes,
        status: BookingStatus::Confirmed,
        created_at: now,
    };

    let mut tx = store.pool().begin().await?;
    let inserted = store::bookings::insert_if_no_conflict(&mut tx, &booking).await?;
    if !inserted {
        tx.rollback().await?;
        return Err(Error::SlotUnavailable);
    }
    tx.commit().await?;

    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HostAvailabilitySlot;
    use chrono::NaiveTime;
    use chrono_tz::America::New_York;

    async fn seeded_store() -> Store {
        let store = Store::connect(":memory:").await.unwrap();
        store::availability::replace_all(
            store.pool(),
            &[HostAvailabilitySlot {
                day_of_week: 2,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            }],
        )
        .await
        .unwrap();
        store
    }

    fn request(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> BookingRequest {
        BookingRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: None,
            title: "Intro call".into(),
            description: None,
            start,
            end,
            timezone: "America/New_York".into(),
            duration_minutes: 30,
        }
    }

    fn ny(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        New_York.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().fixed_offset()
    }

    #[tokio::test]
    async fn second_request_for_same_slot_conflicts() {
        use chrono::TimeZone;

        let store = seeded_store().await;
        let now = ny(2026, 2, 10, 10, 0).with_timezone(&Utc);
        let start = ny(2026, 2, 10, 13, 0);
        let end = ny(2026, 2, 10, 13, 30);

        let first = book(&store, now, New_York, request(start, end)).await;
        assert!(first.is_ok());

        let second = book(&store, now, New_York, request(start, end)).await;
        assert!(matches!(second, Err(Error::SlotUnavailable)));
    }
}
