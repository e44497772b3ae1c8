use crate::domain::SchedulingSettings;
use sqlx::SqlitePool;

#[derive(sqlx::FromRow)]
struct SettingsRow {
    min_notice_hours: i64,
    booking_window_days: i64,
    default_duration_minutes: i64,
    video_link: Option<String>,
}

impl From<SettingsRow> for SchedulingSettings {
    fn from(row: SettingsRow) -> Self {
        Self {
            min_notice_hours: row.min_notice_hours as i32,
            booking_window_days: row.booking_window_days as i32,
            default_duration_minutes: row.default_duration_minutes as i32,
            video_link: row.video_link,
        }
    }
}

/// Returns defaults ([`SchedulingSettings::default`]) when no row has been
/// written yet.
pub async fn read(pool: &SqlitePool) -> anyhow::Result<SchedulingSettings> {
    let row: Option<SettingsRow> = sqlx::query_as(
        "SELECT min_notice_hours, booking_window_days, default_duration_minutes, video_link \
         FROM scheduling_settings WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into).unwrap_or_default())
}

pub async fn write(pool: &SqlitePool, settings: &SchedulingSettings) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO scheduling_settings \
         (id, min_notice_hours, booking_window_days, default_duration_minutes, video_link) \
         VALUES (1, ?1, ?2, ?3, ?4) \
         ON CONFLICT(id) DO UPDATE SET \
            min_notice_hours = excluded.min_notice_hours, \
            booking_window_days = excluded.booking_window_days, \
            default_duration_minutes = excluded.default_duration_minutes, \
            video_link = excluded.video_link",
    )
    .bind(settings.min_notice_hours as i64)
    .bind(settings.booking_window_days as i64)
    .bind(settings.default_duration_minutes as i64)
    .bind(&settings.video_link)
    .execute(pool)
    .await?;

    Ok(())
}
