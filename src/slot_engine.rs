//! Composes participant windows, host weekly template, blockers, duration
//! and policy into a sequence of candidate slots.
//!
//! Implemented as free functions over plain structs — this is synchronous,
//! purely computational logic with no need for trait-object indirection.

use crate::domain::{HostAvailabilitySlot, SchedulingSettings};
use crate::error::{Error, Result};
use crate::interval::{self, Interval};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::time::Duration as StdDuration;
use ts_rs::TS;

/// One participant-supplied window of free time, already a valid instant
/// interval (it carries its own UTC offset).
#[derive(Debug, Clone, Copy)]
pub struct ParticipantWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Slot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

pub struct SlotEngineInput<'a> {
    pub participant_windows: &'a [ParticipantWindow],
    pub host_template: &'a [HostAvailabilitySlot],
    pub host_timezone: Tz,
    pub blockers: &'a [Interval],
    pub duration_minutes: i32,
    pub participant_timezone: Tz,
    pub now: DateTime<Utc>,
    pub settings: &'a SchedulingSettings,
}

pub fn compute_slots(input: SlotEngineInput) -> Result<Vec<Slot>> {
    if !(5..=480).contains(&input.duration_minutes) {
        return Err(Error::validation("durationMinutes must be between 5 and 480"));
    }
    if input.participant_windows.is_empty() {
        return Err(Error::validation("availabilityWindows must not be empty"));
    }

    let participant_intervals: Vec<Interval> = input
        .participant_windows
        .iter()
        .map(|w| Interval::new(w.start.with_timezone(&Utc), w.end.with_timezone(&Utc)))
        .collect();

    let range_start = participant_intervals.iter().map(|i| i.start).min().unwrap();
    let range_end = participant_intervals.iter().map(|i| i.end).max().unwrap();

    let host_intervals = expand_host_template(
        input.host_template,
        input.host_timezone,
        range_start,
        range_end,
    );

    let std_duration = StdDuration::from_secs(input.duration_minutes as u64 * 60);

    let notice_floor = input.now + Duration::hours(input.settings.min_notice_hours as i64);
    let window_ceiling = input.now + Duration::days(input.settings.booking_window_days as i64);

    let mut slots = Vec::new();

    for participant in &participant_intervals {
        for host in &host_intervals {
            let Some(overlap) = interval::intersect(*participant, *host) else {
                continue;
            };

            let free = interval::subtract(overlap, input.blockers);
            for piece in free {
                for candidate in interval::chunk(std_duration, piece) {
                    if candidate.start >= notice_floor && candidate.start <= window_ceiling {
                        slots.push(candidate);
                    }
                }
            }
        }
    }

    // Natural lexicographic order of intersect x chunk already yields this,
    // but participant windows / host slots may be supplied out of order.
    slots.sort_by_key(|i| i.start);

    Ok(slots
        .into_iter()
        .map(|i| to_offset(i, input.participant_timezone))
        .collect())
}

fn to_offset(interval: Interval, tz: Tz) -> Slot {
    Slot {
        start: to_fixed(interval.start, tz),
        end: to_fixed(interval.end, tz),
    }
}

fn to_fixed(instant: DateTime<Utc>, tz: Tz) -> DateTime<FixedOffset> {
    let offset = tz.offset_from_utc_datetime(&instant.naive_utc());
    instant.with_timezone(&offset.fix())
}

/// Expand the host's weekly template into concrete instant intervals for
/// every host-local date in `[range_start, range_end]` whose weekday matches
/// a template row.
pub(crate) fn expand_host_template(
    template: &[HostAvailabilitySlot],
    host_tz: Tz,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Vec<Interval> {
    let start_date = range_start.with_timezone(&host_tz).date_naive();
    let end_date = range_end.with_timezone(&host_tz).date_naive();

    let mut result = Vec::new();
    let mut date = start_date;
    while date <= end_date {
        let weekday_num = date.weekday().num_days_from_monday() as i16 + 1;
        for slot in template {
            if slot.day_of_week != weekday_num {
                continue;
            }
            let naive_start = NaiveDateTime::new(date, slot.start_time);
            let naive_end = NaiveDateTime::new(date, slot.end_time);
            let start = resolve_local_lenient(host_tz, naive_start);
            let end = resolve_local_lenient(host_tz, naive_end);
            if start < end {
                result.push(Interval::new(start, end));
            }
        }
        date = date.succ_opt().expect("date range bounded by participant input");
    }
    result
}

/// Resolve a host-local wall time to an instant, forward-lenient: a skipped
/// wall time (spring-forward gap) maps to the first instant after the gap;
/// an ambiguous wall time (fall-back overlap) maps to its first occurrence.
pub(crate) fn resolve_local_lenient(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earlier, _later) => earlier.with_timezone(&Utc),
        chrono::LocalResult::None => {
            // Scan forward in one-minute steps past the DST gap; gaps are a
            // small bounded number of minutes (typically 60) in every zone
            // this service targets.
            let mut probe = naive;
            for _ in 0..(6 * 60) {
                probe += Duration::minutes(1);
                if let chrono::LocalResult::Single(dt) = tz.from_local_datetime(&probe) {
                    return dt.with_timezone(&Utc);
                }
            }
            tz.from_utc_datetime(&naive).with_timezone(&Utc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HostAvailabilitySlot;
    use chrono::NaiveTime;
    use chrono_tz::America::New_York;

    fn settings(min_notice_hours: i32, booking_window_days: i32) -> SchedulingSettings {
        SchedulingSettings {
            min_notice_hours,
            booking_window_days,
            default_duration_minutes: 30,
            video_link: None,
        }
    }

    fn ny_offset(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        New_York
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .fixed_offset()
    }

    fn weekday_template() -> Vec<HostAvailabilitySlot> {
        vec![HostAvailabilitySlot {
            day_of_week: 2, // Tuesday
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        }]
    }

    #[test]
    fn basic_overlap_yields_ten_half_hour_slots() {
        let windows = vec![ParticipantWindow {
            start: ny_offset(2026, 2, 10, 12, 0),
            end: ny_offset(2026, 2, 10, 17, 0),
        }];
        let settings = settings(0, 30);
        let now = ny_offset(2026, 2, 10, 10, 0).with_timezone(&Utc);

        let slots = compute_slots(SlotEngineInput {
            participant_windows: &windows,
            host_template: &weekday_template(),
            host_timezone: New_York,
            blockers: &[],
            duration_minutes: 30,
            participant_timezone: New_York,
            now,
            settings: &settings,
        })
        .unwrap();

        assert_eq!(slots.len(), 10);
        assert_eq!(slots[0].start, ny_offset(2026, 2, 10, 12, 0));
        assert_eq!(slots.last().unwrap().start, ny_offset(2026, 2, 10, 16, 30));
    }

    #[test]
    fn blocker_splits_overlap_into_eight_slots() {
        let windows = vec![ParticipantWindow {
            start: ny_offset(2026, 2, 10, 12, 0),
            end: ny_offset(2026, 2, 10, 17, 0),
        }];
        let settings = settings(0, 30);
        let now = ny_offset(2026, 2, 10, 10, 0).with_timezone(&Utc);
        let blocker = Interval::new(
            ny_offset(2026, 2, 10, 13, 0).with_timezone(&Utc),
            ny_offset(2026, 2, 10, 14, 0).with_timezone(&Utc),
        );

        let slots = compute_slots(SlotEngineInput {
            participant_windows: &windows,
            host_template: &weekday_template(),
            host_timezone: New_York,
            blockers: &[blocker],
            duration_minutes: 30,
            participant_timezone: New_York,
            now,
            settings: &settings,
        })
        .unwrap();

        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        assert_eq!(
            starts,
            vec![
                ny_offset(2026, 2, 10, 12, 0),
                ny_offset(2026, 2, 10, 12, 30),
                ny_offset(2026, 2, 10, 14, 0),
                ny_offset(2026, 2, 10, 14, 30),
                ny_offset(2026, 2, 10, 15, 0),
                ny_offset(2026, 2, 10, 15, 30),
                ny_offset(2026, 2, 10, 16, 0),
                ny_offset(2026, 2, 10, 16, 30),
            ]
        );
    }

    #[test]
    fn min_notice_filter_drops_early_slots() {
        let windows = vec![ParticipantWindow {
            start: ny_offset(2026, 2, 10, 12, 0),
            end: ny_offset(2026, 2, 10, 17, 0),
        }];
        let settings = settings(4, 30);
        let now = ny_offset(2026, 2, 10, 10, 30).with_timezone(&Utc);

        let slots = compute_slots(SlotEngineInput {
            participant_windows: &windows,
            host_template: &weekday_template(),
            host_timezone: New_York,
            blockers: &[],
            duration_minutes: 30,
            participant_timezone: New_York,
            now,
            settings: &settings,
        })
        .unwrap();

        assert_eq!(slots[0].start, ny_offset(2026, 2, 10, 14, 30));
        assert_eq!(slots.len(), 5);
    }

    #[test]
    fn rejects_out_of_range_duration() {
        let windows = vec![ParticipantWindow {
            start: ny_offset(2026, 2, 10, 12, 0),
            end: ny_offset(2026, 2, 10, 13, 0),
        }];
        let settings = settings(0, 30);
        let result = compute_slots(SlotEngineInput {
            participant_windows: &windows,
            host_template: &weekday_template(),
            host_timezone: New_York,
            blockers: &[],
            duration_minutes: 600,
            participant_timezone: New_York,
            now: Utc::now(),
            settings: &settings,
        });
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_windows() {
        let settings = settings(0, 30);
        let result = compute_slots(SlotEngineInput {
            participant_windows: &[],
            host_template: &weekday_template(),
            host_timezone: New_York,
            blockers: &[],
            duration_minutes: 30,
            participant_timezone: New_York,
            now: Utc::now(),
            settings: &settings,
        });
        assert!(result.is_err());
    }
}
