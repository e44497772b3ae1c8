//! ICS parsing and recurrence expansion. Uses the `ical` crate for the
//! component/property parse and `rrule` for expanding `RRULE` series over
//! the sync horizon, with `chrono-tz` for VTIMEZONE/IANA mapping.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use ical::IcalParser;
use std::str::FromStr;

pub struct ParsedEvent {
    pub uid: String,
    pub summary: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

/// Parse every VEVENT in `ics`, drop `CANCELLED`/`TRANSPARENT` occurrences,
/// and expand recurring series over `[horizon_start, horizon_end]`.
pub fn parse_and_expand(
    ics: &str,
    horizon_start: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
    host_tz: Tz,
) -> anyhow::Result<Vec<ParsedEvent>> {
    let mut out = Vec::new();

    for calendar in IcalParser::new(ics.as_bytes()) {
        let calendar = calendar?;
        for event in &calendar.events {
            out.extend(expand_event(event, horizon_start, horizon_end, host_tz)?);
        }
    }

    Ok(out)
}

fn prop<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a Property> {
    event.properties.iter().find(|p| p.name == name)
}

fn param_value(prop: &Property, key: &str) -> Option<String> {
    prop.params
        .as_ref()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, values)| values.first().cloned())
}

fn expand_event(
    event: &IcalEvent,
    horizon_start: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
    host_tz: Tz,
) -> anyhow::Result<Vec<ParsedEvent>> {
    let status = prop(event, "STATUS").and_then(|p| p.value.clone()).unwrap_or_default();
    if status.eq_ignore_ascii_case("CANCELLED") {
        return Ok(Vec::new());
    }
    let transparency = prop(event, "TRANSP").and_then(|p| p.value.clone()).unwrap_or_default();
    if transparency.eq_ignore_ascii_case("TRANSPARENT") {
        return Ok(Vec::new());
    }

    let uid = prop(event, "UID")
        .and_then(|p| p.value.clone())
        .ok_or_else(|| anyhow::anyhow!("VEVENT missing UID"))?;
    let summary = prop(event, "SUMMARY").and_then(|p| p.value.clone());

    let dtstart_prop = prop(event, "DTSTART")
        .ok_or_else(|| anyhow::anyhow!("VEVENT {uid} missing DTSTART"))?;

    let (start, end, all_day) = if is_date_value(dtstart_prop) {
        all_day_interval(event, dtstart_prop, host_tz)?
    } else {
        timed_interval(event, dtstart_prop, host_tz)?
    };

    match prop(event, "RRULE").and_then(|p| p.value.clone()) {
        Some(rrule_value) => {
            let occurrences = expand_recurrence(
                &rrule_value,
                start,
                end - start,
                horizon_start,
                horizon_end,
            )?;
            Ok(occurrences
                .into_iter()
                .map(|(start, end)| ParsedEvent {
                    uid: uid.clone(),
                    summary: summary.clone(),
                    start,
                    end,
                    all_day,
                })
                .collect())
        }
        None => Ok(vec![ParsedEvent {
            uid,
            summary,
            start,
            end,
            all_day,
        }]),
    }
}

fn is_date_value(prop: &Property) -> bool {
    param_value(prop, "VALUE").as_deref() == Some("DATE")
}

/// `[DTSTART local-midnight, DTEND local-midnight)` in the host timezone.
/// RFC 5545's DTEND is exclusive already; synthesize `+1 day` when absent.
fn all_day_interval(
    event: &IcalEvent,
    dtstart_prop: &Property,
    host_tz: Tz,
) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>, bool)> {
    let start_date = parse_ical_date(dtstart_prop.value.as_deref().unwrap_or_default())?;
    let end_date = match prop(event, "DTEND").and_then(|p| p.value.clone()) {
        Some(value) => parse_ical_date(&value)?,
        None => start_date
            .succ_opt()
            .ok_or_else(|| anyhow::anyhow!("DTSTART date has no successor"))?,
    };

    let start = local_midnight(host_tz, start_date);
    let end = local_midnight(host_tz, end_date);
    Ok((start, end, true))
}

fn timed_interval(
    event: &IcalEvent,
    dtstart_prop: &Property,
    host_tz: Tz,
) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>, bool)> {
    let event_tz = param_value(dtstart_prop, "TZID")
        .and_then(|tzid| Tz::from_str(&tzid).ok())
        .unwrap_or(host_tz);

    let start = parse_ical_datetime(dtstart_prop.value.as_deref().unwrap_or_default(), event_tz)?;

    let end = match prop(event, "DTEND") {
        Some(dtend_prop) => {
            let tz = param_value(dtend_prop, "TZID")
                .and_then(|tzid| Tz::from_str(&tzid).ok())
                .unwrap_or(event_tz);
            parse_ical_datetime(dtend_prop.value.as_deref().unwrap_or_default(), tz)?
        }
        None => {
            let duration = prop(event, "DURATION")
                .and_then(|p| p.value.clone())
                .and_then(|v| parse_ical_duration(&v))
                .unwrap_or_else(Duration::zero);
            start + duration
        }
    };

    Ok((start, end, false))
}

fn parse_ical_date(value: &str) -> anyhow::Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(value, "%Y%m%d")?)
}

fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        chrono::LocalResult::None => tz.from_utc_datetime(&naive).with_timezone(&Utc),
    }
}

/// `YYYYMMDDTHHMMSS` (floating/local) or `YYYYMMDDTHHMMSSZ` (UTC).
fn parse_ical_datetime(value: &str, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    if let Some(stripped) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S")?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")?;
    Ok(match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        chrono::LocalResult::None => tz.from_utc_datetime(&naive).with_timezone(&Utc),
    })
}

/// Minimal ISO-8601 duration parser covering the subset RFC 5545 allows:
/// `P[n]D[T[n]H[n]M[n]S]` / `PT...`.
fn parse_ical_duration(value: &str) -> Option<Duration> {
    let value = value.strip_prefix('P')?;
    let negative = false;
    let (date_part, time_part) = value.split_once('T').unwrap_or((value, ""));

    let mut total = Duration::zero();
    let mut number = String::new();
    for c in date_part.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else if c == 'D' {
            total += Duration::days(number.parse().ok()?);
            number.clear();
        } else if c == 'W' {
            total += Duration::weeks(number.parse().ok()?);
            number.clear();
        }
    }
    number.clear();
    for c in time_part.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else if c == 'H' {
            total += Duration::hours(number.parse().ok()?);
            number.clear();
        } else if c == 'M' {
            total += Duration::minutes(number.parse().ok()?);
            number.clear();
        } else if c == 'S' {
            total += Duration::seconds(number.parse().ok()?);
            number.clear();
        }
    }

    Some(if negative { -total } else { total })
}

fn expand_recurrence(
    rrule_value: &str,
    dtstart: DateTime<Utc>,
    duration: Duration,
    horizon_start: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
) -> anyhow::Result<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
    let dtstart_line = format!(
        "DTSTART:{}\nRRULE:{}",
        dtstart.format("%Y%m%dT%H%M%SZ"),
        rrule_value
    );

    let set: rrule::RRuleSet = dtstart_line
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid RRULE '{rrule_value}': {e}"))?;

    let set = set
        .after(horizon_start.with_timezone(&rrule::Tz::UTC))
        .before(horizon_end.with_timezone(&rrule::Tz::UTC));

    // Bounded well above any realistic sync horizon occurrence count.
    let result = set.all(2000);

    Ok(result
        .dates
        .into_iter()
        .map(|dt| {
            let start = dt.with_timezone(&Utc);
            (start, start + duration)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_plain_duration() {
        assert_eq!(parse_ical_duration("PT1H30M"), Some(Duration::minutes(90)));
        assert_eq!(parse_ical_duration("P1D"), Some(Duration::days(1)));
    }

    #[test]
    fn parses_utc_datetime() {
        let dt = parse_ical_datetime("20260210T130000Z", chrono_tz::America::New_York).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 2, 10, 13, 0, 0).unwrap());
    }

    #[test]
    fn all_day_event_spans_host_local_midnight_to_midnight() {
        let start = local_midnight(chrono_tz::America::New_York, NaiveDate::from_ymd_opt(2026, 2, 11).unwrap());
        let end = local_midnight(chrono_tz::America::New_York, NaiveDate::from_ymd_opt(2026, 2, 12).unwrap());
        assert!(end - start == Duration::hours(24));
    }
}
