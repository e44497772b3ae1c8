//! Durable state. `Store` wraps a `SqlitePool`; one module per entity
//! family, each exposing free functions over `&SqlitePool` or
//! `&mut Transaction` for multi-statement atomic operations.

pub mod availability;
pub mod bookings;
pub mod calendars;
pub mod cached_events;
mod migrations;
pub mod sessions;
pub mod settings;
pub mod sync_history;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(db_path: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{db_path}"))
            .with_context(|| format!("parsing database path {db_path}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("connecting to sqlite database")?;

        migrations::run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
