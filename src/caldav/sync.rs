//! Per-source sync pipeline: discovery -> calendar listing -> event fetch
//! -> ICS parse/expand -> atomic cache replacement -> history recording.
//! Failures for one source are recorded and never abort the pass for
//! another.

use super::discovery::CalDavClient;
use super::ics;
use crate::domain::{CalDavProvider, CachedEvent, SyncHistoryEntry, SyncStatus};
use crate::store::{self, Store};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

const SYNC_TIMEOUT: StdDuration = StdDuration::from_secs(60);

#[derive(Clone)]
pub struct SourceCredentials {
    pub provider: CalDavProvider,
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Run the pipeline for every configured source, in sequence. One source's
/// failure never prevents the others from syncing.
pub async fn sync_all(
    store: &Store,
    sources: &[SourceCredentials],
    host_tz: Tz,
    now: DateTime<Utc>,
    manual: bool,
) {
    for creds in sources {
        if let Err(e) = sync_source(store, creds, host_tz, now, manual).await {
            warn!(error = %e, base_url = %creds.base_url, "calendar sync failed");
        }
    }
}

pub async fn sync_source(
    store: &Store,
    creds: &SourceCredentials,
    host_tz: Tz,
    now: DateTime<Utc>,
    manual: bool,
) -> anyhow::Result<()> {
    let horizon_start = if manual { now } else { now - Duration::days(30) };
    let horizon_end = now + Duration::days(60);

    let source = store::calendars::upsert(store.pool(), creds.provider, &creds.base_url).await?;

    let result = run_pipeline(
        store,
        creds,
        source.id,
        &source.calendar_home_url,
        host_tz,
        horizon_start,
        horizon_end,
        now,
    )
    .await;

    let (status, error_message) = match &result {
        Ok(()) => (SyncStatus::Ok, None),
        Err(e) => (SyncStatus::Error, Some(e.to_string())),
    };

    store::calendars::update_sync_status(store.pool(), source.id, None, now, status.as_str())
        .await
        .ok();

    let entry = SyncHistoryEntry {
        id: Uuid::new_v4(),
        source_id: source.id,
        synced_at: now,
        status,
        error_message,
    };
    store::sync_history::append(store.pool(), &entry).await.ok();
    store::sync_history::prune_to_n(store.pool(), source.id, 50).await.ok();

    info!(source_id = %source.id, status = status.as_str(), "calendar sync completed");
    result
}

async fn run_pipeline(
    store: &Store,
    creds: &SourceCredentials,
    source_id: Uuid,
    cached_home_url: &Option<String>,
    host_tz: Tz,
    horizon_start: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let client = CalDavClient::new(
        &creds.base_url,
        creds.username.clone(),
        creds.password.clone(),
        SYNC_TIMEOUT,
    )?;

    let home_url = match cached_home_url {
        Some(url) => Url::parse(url)?,
        None => {
            let principal = client.discover_principal().await?;
            let home = client.discover_calendar_home(&principal).await?;
            store::calendars::update_sync_status(
                store.pool(),
                source_id,
                Some(home.as_str()),
                now,
                "",
            )
            .await?;
            home
        }
    };

    let calendars = client.list_calendars(&home_url).await?;

    let mut events = Vec::new();
    for calendar_url in &calendars {
        let payloads = client
            .fetch_events(calendar_url, horizon_start, horizon_end)
            .await?;

        for ics_payload in payloads {
            let parsed = ics::parse_and_expand(&ics_payload, horizon_start, horizon_end, host_tz)?;
            events.extend(parsed.into_iter().map(|p| CachedEvent {
                id: Uuid::new_v4(),
                source_id,
                calendar_url: calendar_url.to_string(),
                uid: p.uid,
                summary: p.summary,
                start: p.start,
                end: p.end,
                all_day: p.all_day,
            }));
        }
    }

    store::cached_events::replace_all_for_source(store.pool(), source_id, &events).await?;
    Ok(())
}
