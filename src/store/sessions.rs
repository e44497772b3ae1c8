use crate::domain::AdminSession;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;

/// 32 random bytes, hex-encoded: 256 bits of entropy, URL-safe.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

/// Insert a fresh session and opportunistically delete expired rows.
pub async fn create(pool: &SqlitePool, now: DateTime<Utc>) -> anyhow::Result<AdminSession> {
    let session = AdminSession {
        token: generate_token(),
        created_at: now,
        expires_at: now + Duration::days(7),
    };

    sqlx::query("INSERT INTO admin_sessions (token, created_at, expires_at) VALUES (?1, ?2, ?3)")
        .bind(&session.token)
        .bind(session.created_at.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?1")
        .bind(now.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(session)
}

/// `None` if absent or expired. An expired row found during lookup is
/// deleted immediately.
pub async fn validate(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<AdminSession>> {
    let row: Option<(String, String, String)> = sqlx::query_as(
        "SELECT token, created_at, expires_at FROM admin_sessions WHERE token = ?1",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some((token, created_at, expires_at)) = row else {
        return Ok(None);
    };

    let session = AdminSession {
        token,
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        expires_at: DateTime::parse_from_rfc3339(&expires_at)?.with_timezone(&Utc),
    };

    if session.is_expired(now) {
        revoke(pool, &session.token).await?;
        return Ok(None);
    }

    Ok(Some(session))
}

/// Idempotent: deleting an absent token is not an error.
pub async fn revoke(pool: &SqlitePool, token: &str) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM admin_sessions WHERE token = ?1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn cleanup_expired(pool: &SqlitePool, now: DateTime<Utc>) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?1")
        .bind(now.to_rfc3339())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
