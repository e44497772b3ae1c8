use crate::domain::{CalDavProvider, CalendarSource};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: String,
    provider: String,
    base_url: String,
    calendar_home_url: Option<String>,
    last_sync_at: Option<String>,
    last_sync_result: Option<String>,
}

impl SourceRow {
    fn into_source(self) -> anyhow::Result<CalendarSource> {
        Ok(CalendarSource {
            id: Uuid::parse_str(&self.id)?,
            provider: CalDavProvider::parse(&self.provider)
                .ok_or_else(|| anyhow::anyhow!("unknown calendar provider {}", self.provider))?,
            base_url: self.base_url,
            calendar_home_url: self.calendar_home_url,
            last_sync_at: self
                .last_sync_at
                .map(|s| DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
                .transpose()?,
            last_sync_result: self.last_sync_result,
        })
    }
}

const SOURCE_COLUMNS: &str =
    "id, provider, base_url, calendar_home_url, last_sync_at, last_sync_result";

/// Insert a source for `(provider, base_url)` if absent; the id is
/// deterministic ([`CalendarSource::derive_id`]) so this is safe to call on
/// every process start with the configured provider set.
pub async fn upsert(
    pool: &SqlitePool,
    provider: CalDavProvider,
    base_url: &str,
) -> anyhow::Result<CalendarSource> {
    let id = CalendarSource::derive_id(provider, base_url);

    sqlx::query(
        "INSERT INTO calendar_sources (id, provider, base_url) VALUES (?1, ?2, ?3) \
         ON CONFLICT(provider, base_url) DO NOTHING",
    )
    .bind(id.to_string())
    .bind(provider.as_str())
    .bind(base_url)
    .execute(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("calendar source {id} missing immediately after upsert"))
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> anyhow::Result<Option<CalendarSource>> {
    let row: Option<SourceRow> = sqlx::query_as(&format!(
        "SELECT {SOURCE_COLUMNS} FROM calendar_sources WHERE id = ?1"
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(SourceRow::into_source).transpose()
}

pub async fn list(pool: &SqlitePool) -> anyhow::Result<Vec<CalendarSource>> {
    let rows: Vec<SourceRow> = sqlx::query_as(&format!(
        "SELECT {SOURCE_COLUMNS} FROM calendar_sources ORDER BY provider, base_url"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(SourceRow::into_source)
        .collect::<anyhow::Result<Vec<_>>>()
}

pub async fn update_sync_status(
    pool: &SqlitePool,
    id: Uuid,
    calendar_home_url: Option<&str>,
    last_sync_at: DateTime<Utc>,
    last_sync_result: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE calendar_sources SET \
         calendar_home_url = COALESCE(?2, calendar_home_url), \
         last_sync_at = ?3, last_sync_result = ?4 \
         WHERE id = ?1",
    )
    .bind(id.to_string())
    .bind(calendar_home_url)
    .bind(last_sync_at.to_rfc3339())
    .bind(last_sync_result)
    .execute(pool)
    .await?;

    Ok(())
}
