use clap::Parser;
use figment::{providers::Env, Figment};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::caldav::SourceCredentials;
use crate::clock::SystemClock;
use crate::cli::{Args, ServiceName};
use crate::config::Config;
use crate::domain::CalDavProvider;
use crate::parser_client::ParserClient;
use crate::services::manager::ServiceManager;
use crate::services::sync::SyncService;
use crate::services::web::WebService;
use crate::smtp_client::{SmtpClient, SmtpSettings};
use crate::state::AppState;
use crate::store::Store;

mod caldav;
mod cli;
mod clock;
mod config;
mod domain;
mod error;
mod formatter;
mod interval;
mod logging;
mod parser_client;
mod revalidator;
mod services;
mod session;
mod signals;
mod slot_engine;
mod smtp_client;
mod state;
mod store;
mod web;

fn resolve_smtp(config: &Config) -> Option<SmtpSettings> {
    let raw = config.smtp();
    match (raw.host, raw.port, raw.username, raw.password, raw.from) {
        (Some(host), Some(port), Some(username), Some(password), Some(from)) => {
            Some(SmtpSettings {
                host,
                port,
                username,
                password,
                from,
                from_name: raw.from_name,
            })
        }
        (None, None, None, None, None) => None,
        _ => {
            warn!("SMTP environment variables partially set; SMTP is disabled");
            None
        }
    }
}

fn resolve_calendar_sources(config: &Config) -> Vec<SourceCredentials> {
    let mut sources = Vec::new();

    match (&config.fastmail_url, &config.fastmail_username, &config.fastmail_password) {
        (Some(url), Some(username), Some(password)) => sources.push(SourceCredentials {
            provider: CalDavProvider::Fastmail,
            base_url: url.clone(),
            username: username.clone(),
            password: password.clone(),
        }),
        (None, None, None) => {}
        _ => warn!("Fastmail CalDAV environment variables partially set; Fastmail sync is disabled"),
    }

    match (&config.icloud_url, &config.icloud_username, &config.icloud_password) {
        (Some(url), Some(username), Some(password)) => sources.push(SourceCredentials {
            provider: CalDavProvider::Icloud,
            base_url: url.clone(),
            username: username.clone(),
            password: password.clone(),
        }),
        (None, None, None) => {}
        _ => warn!("iCloud CalDAV environment variables partially set; iCloud sync is disabled"),
    }

    sources
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config: Config = Figment::new()
        .merge(Env::raw())
        .extract()
        .expect("Failed to load config");

    logging::setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting michael"
    );

    let host_timezone = chrono_tz::Tz::from_str(&config.michael_host_timezone)
        .expect("MICHAEL_HOST_TIMEZONE must be a valid IANA timezone");

    let store = Store::connect(&config.db_path)
        .await
        .expect("failed to connect to database");

    let parser_client = ParserClient::new(
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
            .to_string(),
        config.gemini_api_key.clone(),
    )
    .expect("failed to build parser client");

    let smtp_client = SmtpClient::new(resolve_smtp(&config));
    let calendar_sources = resolve_calendar_sources(&config);

    let app_state = AppState::new(
        store,
        Arc::new(SystemClock),
        host_timezone,
        parser_client,
        smtp_client,
        calendar_sources,
        config.michael_admin_password.clone(),
    );

    info!(
        port = config.port,
        shutdown_timeout = format!("{:.2?}", config.shutdown_timeout),
        host_timezone = %host_timezone,
        "configuration loaded"
    );

    let shutdown_timeout = config.shutdown_timeout;
    let port = config.port;

    let mut service_manager = ServiceManager::new();

    let web_service = Box::new(WebService::new(port, app_state.clone()));
    let sync_service = Box::new(SyncService::new(app_state));

    service_manager.register_service(ServiceName::Web.as_str(), web_service);
    service_manager.register_service(ServiceName::Sync.as_str(), sync_service);

    service_manager.spawn_all();

    signals::handle_shutdown_signals(service_manager, shutdown_timeout).await
}
