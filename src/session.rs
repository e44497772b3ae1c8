//! In-memory cache over the single admin session, backed by SQLite.

use crate::domain::AdminSession;
use crate::store::{self, Store};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedSession {
    expires_at: DateTime<Utc>,
    cached_at: Instant,
}

/// Fast session-token validity check without a DB round-trip on every
/// request. Entries expire from the cache after a short TTL even if the
/// underlying session is still valid, so revocation in the database is
/// picked up promptly.
#[derive(Clone)]
pub struct SessionCache {
    cache: Arc<DashMap<String, CachedSession>>,
    store: Store,
    cache_ttl: Duration,
}

impl SessionCache {
    pub fn new(store: Store) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            store,
            cache_ttl: Duration::from_secs(60),
        }
    }

    /// Validate a session token, using the cache when possible.
    pub async fn validate(&self, token: &str, now: DateTime<Utc>) -> Option<AdminSession> {
        if let Some(entry) = self.cache.get(token) {
            let fresh = entry.cached_at + self.cache_ttl > Instant::now();
            let valid = entry.expires_at > now;
            if fresh && valid {
                return Some(AdminSession {
                    token: token.to_owned(),
                    created_at: now,
                    expires_at: entry.expires_at,
                });
            }
            drop(entry);
            self.cache.remove(token);
        }

        let session = store::sessions::validate(self.store.pool(), token, now)
            .await
            .ok()
            .flatten()?;

        self.cache.insert(
            token.to_owned(),
            CachedSession {
                expires_at: session.expires_at,
                cached_at: Instant::now(),
            },
        );

        Some(session)
    }

    /// Remove a session from the cache immediately (logout).
    pub fn evict(&self, token: &str) {
        self.cache.remove(token);
    }

    /// Delete expired sessions from the database and sweep the cache.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let deleted = store::sessions::cleanup_expired(self.store.pool(), now).await?;
        self.cache.retain(|_, entry| entry.expires_at > now);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    async fn seeded() -> (Store, SessionCache) {
        let store = Store::connect(":memory:").await.unwrap();
        let cache = SessionCache::new(store.clone());
        (store, cache)
    }

    #[tokio::test]
    async fn validates_freshly_created_session() {
        let (store, cache) = seeded().await;
        let now = Utc::now();
        let session = store::sessions::create(store.pool(), now).await.unwrap();

        let validated = cache.validate(&session.token, now).await;
        assert!(validated.is_some());
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        let (_store, cache) = seeded().await;
        let validated = cache.validate("does-not-exist", Utc::now()).await;
        assert!(validated.is_none());
    }

    #[tokio::test]
    async fn evict_forces_recheck_against_store() {
        let (store, cache) = seeded().await;
        let now = Utc::now();
        let session = store::sessions::create(store.pool(), now).await.unwrap();

        cache.validate(&session.token, now).await;
        store::sessions::revoke(store.pool(), &session.token).await.unwrap();
        cache.evict(&session.token);

        let validated = cache.validate(&session.token, now).await;
        assert!(validated.is_none());
    }
}
