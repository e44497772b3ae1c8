use crate::domain::{SyncHistoryEntry, SyncStatus};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: String,
    source_id: String,
    synced_at: String,
    status: String,
    error_message: Option<String>,
}

impl HistoryRow {
    fn into_entry(self) -> anyhow::Result<SyncHistoryEntry> {
        Ok(SyncHistoryEntry {
            id: Uuid::parse_str(&self.id)?,
            source_id: Uuid::parse_str(&self.source_id)?,
            synced_at: DateTime::parse_from_rfc3339(&self.synced_at)?.with_timezone(&Utc),
            status: SyncStatus::parse(&self.status)
                .ok_or_else(|| anyhow::anyhow!("unknown sync status {}", self.status))?,
            error_message: self.error_message,
        })
    }
}

pub async fn append(pool: &SqlitePool, entry: &SyncHistoryEntry) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO sync_history (id, source_id, synced_at, status, error_message) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(entry.id.to_string())
    .bind(entry.source_id.to_string())
    .bind(entry.synced_at.to_rfc3339())
    .bind(entry.status.as_str())
    .bind(&entry.error_message)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_latest(
    pool: &SqlitePool,
    source_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<SyncHistoryEntry>> {
    let rows: Vec<HistoryRow> = sqlx::query_as(
        "SELECT id, source_id, synced_at, status, error_message FROM sync_history \
         WHERE source_id = ?1 ORDER BY synced_at DESC LIMIT ?2",
    )
    .bind(source_id.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(HistoryRow::into_entry)
        .collect::<anyhow::Result<Vec<_>>>()
}

/// Keep only the most recent `n` rows for `source_id`.
pub async fn prune_to_n(pool: &SqlitePool, source_id: Uuid, n: i64) -> anyhow::Result<()> {
    sqlx::query(
        "DELETE FROM sync_history WHERE source_id = ?1 AND id NOT IN ( \
             SELECT id FROM sync_history WHERE source_id = ?1 \
             ORDER BY synced_at DESC LIMIT ?2 \
         )",
    )
    .bind(source_id.to_string())
    .bind(n)
    .execute(pool)
    .await?;

    Ok(())
}
