//! Application state shared across the web surface and background services.

use crate::caldav::SourceCredentials;
use crate::clock::Clock;
use crate::parser_client::ParserClient;
use crate::session::SessionCache;
use crate::smtp_client::SmtpClient;
use crate::store::Store;
use chrono_tz::Tz;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub session_cache: SessionCache,
    pub clock: Arc<dyn Clock>,
    pub host_timezone: Tz,
    pub parser_client: ParserClient,
    pub smtp_client: SmtpClient,
    pub calendar_sources: Arc<Vec<SourceCredentials>>,
    pub admin_password: Arc<str>,
}

impl AppState {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        host_timezone: Tz,
        parser_client: ParserClient,
        smtp_client: SmtpClient,
        calendar_sources: Vec<SourceCredentials>,
        admin_password: String,
    ) -> Self {
        let session_cache = SessionCache::new(store.clone());
        Self {
            store,
            session_cache,
            clock,
            host_timezone,
            parser_client,
            smtp_client,
            calendar_sources: Arc::new(calendar_sources),
            admin_password: Arc::from(admin_password),
        }
    }
}
