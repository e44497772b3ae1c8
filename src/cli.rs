use clap::Parser;

/// Michael - self-hosted meeting scheduling service
///
/// This application runs all services:
/// - web: HTTP server for the public and admin API
/// - sync: background CalDAV calendar sync
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log formatter to use
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,
}

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum TracingFormat {
    /// Use pretty formatter (default in debug mode)
    Pretty,
    /// Use JSON formatter (default in release mode)
    Json,
}

#[derive(clap::ValueEnum, Clone, Debug, PartialEq)]
pub enum ServiceName {
    /// HTTP server for the public and admin API
    Web,
    /// Background CalDAV calendar sync
    Sync,
}

impl ServiceName {
    /// Get all available services
    pub fn all() -> Vec<ServiceName> {
        vec![ServiceName::Web, ServiceName::Sync]
    }

    /// Convert to string for service registration
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Web => "web",
            ServiceName::Sync => "sync",
        }
    }
}

#[cfg(debug_assertions)]
const DEFAULT_TRACING_FORMAT: TracingFormat = TracingFormat::Pretty;
#[cfg(not(debug_assertions))]
const DEFAULT_TRACING_FORMAT: TracingFormat = TracingFormat::Json;

fn default_tracing_format() -> TracingFormat {
    DEFAULT_TRACING_FORMAT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_as_str() {
        assert_eq!(ServiceName::Web.as_str(), "web");
        assert_eq!(ServiceName::Sync.as_str(), "sync");
    }

    #[test]
    fn test_service_name_all() {
        let all = ServiceName::all();
        assert_eq!(all.len(), 2);
    }
}
