//! Configuration module.
//!
//! This module handles loading and parsing configuration from environment variables
//! using the figment crate. It supports flexible duration parsing that accepts both
//! numeric values (interpreted as seconds) and duration strings with units.

use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main application configuration.
///
/// Required fields (`host_timezone`, `gemini_api_key`, `admin_password`) have
/// no defaults: a missing one fails config loading, and the process exits
/// before serving anything.
#[derive(Deserialize)]
pub struct Config {
    /// Log level for the application
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Port for the web server
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Graceful shutdown timeout duration
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    /// IANA timezone the host's availability template is interpreted in
    pub michael_host_timezone: String,
    /// Credential for the natural-language availability parser
    pub gemini_api_key: String,
    /// Admin login password, compared constant-time at `/api/admin/login`
    pub michael_admin_password: String,

    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub smtp_from: Option<String>,
    #[serde(default)]
    pub smtp_from_name: Option<String>,

    #[serde(default)]
    pub fastmail_url: Option<String>,
    #[serde(default)]
    pub fastmail_username: Option<String>,
    #[serde(default)]
    pub fastmail_password: Option<String>,

    #[serde(default)]
    pub icloud_url: Option<String>,
    #[serde(default)]
    pub icloud_username: Option<String>,
    #[serde(default)]
    pub icloud_password: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "michael.db".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

/// Duration parser configured to handle various time units with seconds as default
const DURATION_PARSER: DurationParser<'static> = DurationParser::builder()
    .time_units(&[TimeUnit::Second, TimeUnit::MilliSecond, TimeUnit::Minute])
    .parse_multiple(None)
    .allow_time_unit_delimiter()
    .disable_infinity()
    .disable_fraction()
    .disable_exponent()
    .default_unit(TimeUnit::Second)
    .build();

/// Custom deserializer for duration fields that accepts both numeric and string values
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a duration string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            DURATION_PARSER
                .parse(value)
                .map_err(|e| {
                    serde::de::Error::custom(format!(
                        "Invalid duration format '{}': {}. Examples: '5' (5 seconds), '3500ms', '30s', '2m'",
                        value, e
                    ))
                })?
                .try_into()
                .map_err(|e| serde::de::Error::custom(format!("Duration conversion error: {}", e)))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value < 0 {
                return Err(serde::de::Error::custom("Duration cannot be negative"));
            }
            Ok(Duration::from_secs(value as u64))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// An all-or-nothing SMTP configuration, derived from [`Config`]'s optional
/// SMTP fields. Missing any required piece means SMTP is disabled entirely.
pub struct RawSmtpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub from_name: Option<String>,
}

impl Config {
    pub fn smtp(&self) -> RawSmtpConfig {
        RawSmtpConfig {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            from: self.smtp_from.clone(),
            from_name: self.smtp_from_name.clone(),
        }
    }
}
