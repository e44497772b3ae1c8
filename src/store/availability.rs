use crate::domain::HostAvailabilitySlot;
use chrono::NaiveTime;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct SlotRow {
    day_of_week: i64,
    start_time: String,
    end_time: String,
}

impl SlotRow {
    fn into_slot(self) -> anyhow::Result<HostAvailabilitySlot> {
        Ok(HostAvailabilitySlot {
            day_of_week: self.day_of_week as i16,
            start_time: NaiveTime::parse_from_str(&self.start_time, "%H:%M:%S")?,
            end_time: NaiveTime::parse_from_str(&self.end_time, "%H:%M:%S")?,
        })
    }
}

pub async fn read(pool: &SqlitePool) -> anyhow::Result<Vec<HostAvailabilitySlot>> {
    let rows: Vec<SlotRow> = sqlx::query_as(
        "SELECT day_of_week, start_time, end_time FROM host_availability_slots \
         ORDER BY day_of_week, start_time",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(SlotRow::into_slot)
        .collect::<anyhow::Result<Vec<_>>>()
}

/// Replace the entire weekly template in a single transaction.
pub async fn replace_all(
    pool: &SqlitePool,
    slots: &[HostAvailabilitySlot],
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM host_availability_slots")
        .execute(&mut *tx)
        .await?;

    for slot in slots {
        sqlx::query(
            "INSERT INTO host_availability_slots (id, day_of_week, start_time, end_time) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(slot.day_of_week as i64)
        .bind(slot.start_time.format("%H:%M:%S").to_string())
        .bind(slot.end_time.format("%H:%M:%S").to_string())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
