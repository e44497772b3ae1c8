use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// `confirmed | cancelled`. Closed discriminated union, so a tagged variant
/// rather than a free-form string once it leaves the store row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A reserved meeting. `end - start` always equals `duration_minutes`; two
/// confirmed bookings never have overlapping half-open intervals.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub timezone: String,
    pub duration_minutes: i32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Wire representation of a [`Booking`], `camelCase` per the HTTP surface.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookingResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub timezone: String,
    pub duration_minutes: i32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            name: b.name,
            email: b.email,
            phone: b.phone,
            title: b.title,
            description: b.description,
            start: b.start,
            end: b.end,
            timezone: b.timezone,
            duration_minutes: b.duration_minutes,
            status: b.status,
            created_at: b.created_at,
        }
    }
}

/// One row of the host's recurring weekly template. `day_of_week` is
/// 1..=7, Mon=1. Interpreted entirely in the host's configured timezone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HostAvailabilitySlot {
    pub day_of_week: i16,
    #[ts(type = "string")]
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[ts(type = "string")]
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl HostAvailabilitySlot {
    pub fn is_valid(&self) -> bool {
        (1..=7).contains(&self.day_of_week) && self.start_time < self.end_time
    }
}

/// Wire format for local times on the availability template: `"HH:MM"`,
/// not chrono's default `"HH:MM:SS"`.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, "%H:%M").map_err(serde::de::Error::custom)
    }
}
