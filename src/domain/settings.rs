use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Singleton scheduling policy. Mutated only through a replace operation;
/// `read` returns these defaults when no row has been written yet.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SchedulingSettings {
    pub min_notice_hours: i32,
    pub booking_window_days: i32,
    pub default_duration_minutes: i32,
    pub video_link: Option<String>,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            min_notice_hours: 6,
            booking_window_days: 30,
            default_duration_minutes: 30,
            video_link: None,
        }
    }
}

impl SchedulingSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_notice_hours < 0 {
            return Err("minNoticeHours must be >= 0".into());
        }
        if self.booking_window_days < 1 {
            return Err("bookingWindowDays must be >= 1".into());
        }
        if !(5..=480).contains(&self.default_duration_minutes) {
            return Err("defaultDurationMinutes must be between 5 and 480".into());
        }
        Ok(())
    }
}
