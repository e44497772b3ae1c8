//! Cancellation-email sender. Configuration is all-or-nothing: any missing
//! required piece disables sending entirely, logged once at startup rather
//! than per-send.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub from_name: Option<String>,
}

/// Sends cancellation notices, or is a no-op if SMTP was not fully
/// configured at startup.
#[derive(Clone)]
pub enum SmtpClient {
    Configured {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    Disabled,
}

impl SmtpClient {
    /// Build from settings, or log a notice and disable if `settings` is
    /// `None` (caller is responsible for resolving partial env-var sets to
    /// `None`).
    pub fn new(settings: Option<SmtpSettings>) -> Self {
        let Some(settings) = settings else {
            warn!("SMTP not fully configured; cancellation emails are disabled");
            return Self::Disabled;
        };

        let from_display = settings
            .from_name
            .as_deref()
            .map(|name| format!("{name} <{}>", settings.from))
            .unwrap_or_else(|| settings.from.clone());

        let from: Mailbox = match from_display.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!(error = %e, "invalid SMTP from address; cancellation emails are disabled");
                return Self::Disabled;
            }
        };

        let creds = Credentials::new(settings.username, settings.password);
        let transport = match AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host) {
            Ok(builder) => builder.port(settings.port).credentials(creds).build(),
            Err(e) => {
                warn!(error = %e, "invalid SMTP host; cancellation emails are disabled");
                return Self::Disabled;
            }
        };

        info!(host = %settings.host, "SMTP configured");
        Self::Configured { transport, from }
    }

    /// Send a cancellation notice. Failures are logged and swallowed: the
    /// cancellation itself has already been committed by the caller.
    pub async fn send_cancellation(&self, to_email: &str, to_name: &str, title: &str) {
        let Self::Configured { transport, from } = self else {
            return;
        };

        let to: Mailbox = match format!("{to_name} <{to_email}>").parse() {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, %to_email, "invalid recipient address; cancellation email not sent");
                return;
            }
        };

        let message = match Message::builder()
            .from(from.clone())
            .to(to)
            .subject(format!("Cancelled: {title}"))
            .body(format!(
                "Your meeting \"{title}\" has been cancelled by the host."
            )) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "failed to build cancellation email");
                return;
            }
        };

        if let Err(e) = transport.send(message).await {
            warn!(error = %e, %to_email, "failed to send cancellation email");
        }
    }
}
