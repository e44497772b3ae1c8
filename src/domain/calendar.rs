use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// `fastmail | icloud`. Closed set of supported CalDAV providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CalDavProvider {
    Fastmail,
    Icloud,
}

impl CalDavProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalDavProvider::Fastmail => "fastmail",
            CalDavProvider::Icloud => "icloud",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fastmail" => Some(CalDavProvider::Fastmail),
            "icloud" => Some(CalDavProvider::Icloud),
            _ => None,
        }
    }
}

/// A configured external calendar. The id is deterministic from
/// `(provider, base_url)` so it survives process restarts without a
/// generated-on-first-boot identity. Credentials never live here; they stay
/// in process configuration, owned by the sync subsystem.
#[derive(Debug, Clone)]
pub struct CalendarSource {
    pub id: Uuid,
    pub provider: CalDavProvider,
    pub base_url: String,
    pub calendar_home_url: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_result: Option<String>,
}

impl CalendarSource {
    /// Deterministic id: a v5 UUID over `provider:base_url`, so the same
    /// configured source always upserts the same row.
    pub fn derive_id(provider: CalDavProvider, base_url: &str) -> Uuid {
        let name = format!("{}:{}", provider.as_str(), base_url);
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CalendarSourceResponse {
    pub id: Uuid,
    pub provider: CalDavProvider,
    pub base_url: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_result: Option<String>,
}

impl From<CalendarSource> for CalendarSourceResponse {
    fn from(s: CalendarSource) -> Self {
        Self {
            id: s.id,
            provider: s.provider,
            base_url: s.base_url,
            last_sync_at: s.last_sync_at,
            last_sync_result: s.last_sync_result,
        }
    }
}

/// An event pulled from an external calendar during sync. Scoped per source:
/// the cache for a source is replaced atomically on every sync.
#[derive(Debug, Clone)]
pub struct CachedEvent {
    pub id: Uuid,
    pub source_id: Uuid,
    pub calendar_url: String,
    pub uid: String,
    pub summary: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

/// `ok | error`. Pruned to the most recent 50 rows per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SyncStatus {
    Ok,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Ok => "ok",
            SyncStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ok" => Some(SyncStatus::Ok),
            "error" => Some(SyncStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncHistoryEntry {
    pub id: Uuid,
    pub source_id: Uuid,
    pub synced_at: DateTime<Utc>,
    pub status: SyncStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SyncHistoryResponse {
    pub id: Uuid,
    pub synced_at: DateTime<Utc>,
    pub status: SyncStatus,
    pub error_message: Option<String>,
}

impl From<SyncHistoryEntry> for SyncHistoryResponse {
    fn from(e: SyncHistoryEntry) -> Self {
        Self {
            id: e.id,
            synced_at: e.synced_at,
            status: e.status,
            error_message: e.error_message,
        }
    }
}
