use super::Service;
use crate::caldav;
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

const TICK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Background CalDAV sync service. Ticks every 10 minutes; a single global
/// semaphore gates execution with a zero-wait try-acquire so overlapping
/// ticks are dropped rather than queued.
pub struct SyncService {
    app_state: AppState,
    in_flight: Arc<Semaphore>,
}

impl SyncService {
    pub fn new(app_state: AppState) -> Self {
        Self {
            app_state,
            in_flight: Arc::new(Semaphore::new(1)),
        }
    }
}

#[async_trait::async_trait]
impl Service for SyncService {
    fn name(&self) -> &'static str {
        "sync"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        let mut interval = tokio::time::interval(TICK_INTERVAL);

        loop {
            interval.tick().await;

            let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
                debug!("sync tick skipped: previous sync still in flight");
                continue;
            };

            let store = self.app_state.store.clone();
            let sources = self.app_state.calendar_sources.clone();
            let host_tz = self.app_state.host_timezone;
            let now = self.app_state.clock.now();

            tokio::spawn(async move {
                let _permit = permit;
                info!("starting scheduled calendar sync");
                caldav::sync_all(&store, &sources, host_tz, now, false).await;
            });
        }
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
