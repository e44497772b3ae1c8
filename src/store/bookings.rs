use crate::domain::{Booking, BookingStatus};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    title: String,
    description: Option<String>,
    start_offset: String,
    end_offset: String,
    timezone: String,
    duration_minutes: i64,
    status: String,
    created_at: String,
}

impl BookingRow {
    fn into_booking(self) -> anyhow::Result<Booking> {
        Ok(Booking {
            id: Uuid::parse_str(&self.id)?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            title: self.title,
            description: self.description,
            start: DateTime::parse_from_rfc3339(&self.start_offset)?,
            end: DateTime::parse_from_rfc3339(&self.end_offset)?,
            timezone: self.timezone,
            duration_minutes: self.duration_minutes as i32,
            status: BookingStatus::parse(&self.status)
                .ok_or_else(|| anyhow::anyhow!("unknown booking status {}", self.status))?,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)?.with_timezone(&Utc),
        })
    }
}

const BOOKING_COLUMNS: &str = "id, name, email, phone, title, description, \
     start_offset, end_offset, timezone, duration_minutes, status, created_at";

/// Within an already-open transaction: re-query overlapping confirmed
/// bookings; if any exist, do not insert and return `false`; otherwise
/// insert `booking` as confirmed and return `true`. The caller's
/// transaction is the serialization point.
pub async fn insert_if_no_conflict(
    tx: &mut Transaction<'_, Sqlite>,
    booking: &Booking,
) -> anyhow::Result<bool> {
    let start_epoch = booking.start.timestamp();
    let end_epoch = booking.end.timestamp();

    let conflict: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM bookings WHERE status = 'confirmed' \
         AND start_epoch < ?1 AND end_epoch > ?2 LIMIT 1",
    )
    .bind(end_epoch)
    .bind(start_epoch)
    .fetch_optional(&mut **tx)
    .await?;

    if conflict.is_some() {
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO bookings (id, name, email, phone, title, description, \
         start_offset, end_offset, start_epoch, end_epoch, timezone, \
         duration_minutes, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(booking.id.to_string())
    .bind(&booking.name)
    .bind(&booking.email)
    .bind(&booking.phone)
    .bind(&booking.title)
    .bind(&booking.description)
    .bind(booking.start.to_rfc3339())
    .bind(booking.end.to_rfc3339())
    .bind(start_epoch)
    .bind(end_epoch)
    .bind(&booking.timezone)
    .bind(booking.duration_minutes as i64)
    .bind(booking.status.as_str())
    .bind(booking.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(true)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> anyhow::Result<Option<Booking>> {
    let row: Option<BookingRow> = sqlx::query_as(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(BookingRow::into_booking).transpose()
}

pub async fn list(
    pool: &SqlitePool,
    page: i64,
    page_size: i64,
    status: Option<BookingStatus>,
) -> anyhow::Result<(Vec<Booking>, i64)> {
    let offset = (page - 1).max(0) * page_size;

    let (rows, total): (Vec<BookingRow>, i64) = match status {
        Some(status) => {
            let rows: Vec<BookingRow> = sqlx::query_as(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 \
                 ORDER BY start_epoch DESC LIMIT ?2 OFFSET ?3"
            ))
            .bind(status.as_str())
            .bind(page_size)
            .bind(offset)
            .fetch_all(pool)
            .await?;
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE status = ?1")
                    .bind(status.as_str())
                    .fetch_one(pool)
                    .await?;
            (rows, count)
        }
        None => {
            let rows: Vec<BookingRow> = sqlx::query_as(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY start_epoch DESC LIMIT ?1 OFFSET ?2"
            ))
            .bind(page_size)
            .bind(offset)
            .fetch_all(pool)
            .await?;
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
                .fetch_one(pool)
                .await?;
            (rows, count)
        }
    };

    let bookings = rows
        .into_iter()
        .map(BookingRow::into_booking)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok((bookings, total))
}

/// Confirmed bookings overlapping `[start, end)`, half-open intersection
/// against the precomputed epoch columns.
pub async fn range_confirmed(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<Vec<Booking>> {
    let rows: Vec<BookingRow> = sqlx::query_as(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = 'confirmed' \
         AND start_epoch < ?1 AND end_epoch > ?2 ORDER BY start_epoch ASC"
    ))
    .bind(end.timestamp())
    .bind(start.timestamp())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(BookingRow::into_booking)
        .collect::<anyhow::Result<Vec<_>>>()
}

/// Transition `confirmed -> cancelled`. Idempotent: cancelling an already
/// cancelled or absent booking returns `false` without error.
pub async fn cancel(pool: &SqlitePool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE bookings SET status = 'cancelled' WHERE id = ?1 AND status = 'confirmed'",
    )
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_upcoming(pool: &SqlitePool, now: DateTime<Utc>) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM bookings WHERE status = 'confirmed' AND start_epoch >= ?1",
    )
    .bind(now.timestamp())
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn next_upcoming(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<Booking>> {
    let row: Option<BookingRow> = sqlx::query_as(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = 'confirmed' \
         AND start_epoch >= ?1 ORDER BY start_epoch ASC LIMIT 1"
    ))
    .bind(now.timestamp())
    .fetch_optional(pool)
    .await?;

    row.map(BookingRow::into_booking).transpose()
}
