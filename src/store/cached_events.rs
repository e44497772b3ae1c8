use crate::domain::CachedEvent;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    source_id: String,
    calendar_url: String,
    uid: String,
    summary: Option<String>,
    start_instant: String,
    end_instant: String,
    all_day: i64,
}

impl EventRow {
    fn into_event(self) -> anyhow::Result<CachedEvent> {
        Ok(CachedEvent {
            id: Uuid::parse_str(&self.id)?,
            source_id: Uuid::parse_str(&self.source_id)?,
            calendar_url: self.calendar_url,
            uid: self.uid,
            summary: self.summary,
            start: DateTime::parse_from_rfc3339(&self.start_instant)?.with_timezone(&Utc),
            end: DateTime::parse_from_rfc3339(&self.end_instant)?.with_timezone(&Utc),
            all_day: self.all_day != 0,
        })
    }
}

/// Delete every cached event owned by `source_id`, then insert `events`, in
/// one transaction: a concurrent reader sees either the complete old set or
/// the complete new set, never a mix.
pub async fn replace_all_for_source(
    pool: &SqlitePool,
    source_id: Uuid,
    events: &[CachedEvent],
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM cached_events WHERE source_id = ?1")
        .bind(source_id.to_string())
        .execute(&mut *tx)
        .await?;

    for event in events {
        sqlx::query(
            "INSERT INTO cached_events \
             (id, source_id, calendar_url, uid, summary, start_instant, end_instant, all_day) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(event.id.to_string())
        .bind(event.source_id.to_string())
        .bind(&event.calendar_url)
        .bind(&event.uid)
        .bind(&event.summary)
        .bind(event.start.to_rfc3339())
        .bind(event.end.to_rfc3339())
        .bind(event.all_day as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Cached events overlapping `[start, end)` across all sources.
pub async fn range(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<Vec<CachedEvent>> {
    let rows: Vec<EventRow> = sqlx::query_as(
        "SELECT id, source_id, calendar_url, uid, summary, start_instant, end_instant, all_day \
         FROM cached_events WHERE start_instant < ?1 AND end_instant > ?2 \
         ORDER BY start_instant ASC",
    )
    .bind(end.to_rfc3339())
    .bind(start.to_rfc3339())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(EventRow::into_event)
        .collect::<anyhow::Result<Vec<_>>>()
}
