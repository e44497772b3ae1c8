use chrono::{DateTime, Utc};

/// Opaque-token admin session row. `expires_at = created_at + 7 days`,
/// fixed at creation time rather than sliding on use.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
