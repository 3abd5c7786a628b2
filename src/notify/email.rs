//! SMTP delivery via lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use super::{Notice, Notifier, NotifyError};

/// SMTP settings for email notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP host; email is disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Sender address (defaults to `user`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipients, as a list or a comma-delimited string
    #[serde(default, deserialize_with = "deserialize_recipients")]
    pub recipients: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    587
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: default_port(),
            user: None,
            password: None,
            from: None,
            recipients: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SmtpConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars: `SMTP_SERVER`, `SMTP_PORT`, `EMAIL_USER`,
    /// `EMAIL_PASSWORD`, `EMAIL_FROM`, `TO_EMAILS` (comma-delimited) and
    /// `SMTP_TIMEOUT` (seconds).
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(server) = non_empty_env("SMTP_SERVER") {
            self.server = Some(server);
        }
        if let Some(port) = non_empty_env("SMTP_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(user) = non_empty_env("EMAIL_USER") {
            self.user = Some(user);
        }
        if let Ok(password) = std::env::var("EMAIL_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(from) = non_empty_env("EMAIL_FROM") {
            self.from = Some(from);
        }
        if let Ok(to) = std::env::var("TO_EMAILS") {
            self.recipients = parse_recipients(&to);
        }
        if let Some(secs) = non_empty_env("SMTP_TIMEOUT").and_then(|s| s.parse().ok()) {
            self.timeout_secs = secs;
        }
        self
    }

    /// Whether an SMTP server has been configured at all.
    pub fn is_configured(&self) -> bool {
        self.server.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.user.as_deref())
    }
}

/// Split a comma-delimited recipient list, dropping empty entries.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn deserialize_recipients<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Recipients {
        Delimited(String),
        List(Vec<String>),
    }

    Ok(match Recipients::deserialize(deserializer)? {
        Recipients::Delimited(s) => parse_recipients(&s),
        Recipients::List(list) => list
            .iter()
            .flat_map(|s| parse_recipients(s))
            .collect(),
    })
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Sends each notice as one plain-text email to every configured recipient.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let server = config
            .server
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| NotifyError::NotConfigured("SMTP_SERVER is not set".to_string()))?;
        let sender = config
            .sender()
            .ok_or_else(|| NotifyError::NotConfigured("no sender address (EMAIL_FROM or EMAIL_USER)".to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let Some(user) = config.user.clone() {
            let password = config.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(user, password));
        }

        // A bad address drops that recipient only
        let recipients: Vec<Mailbox> = config
            .recipients
            .iter()
            .filter_map(|r| match parse_mailbox(r) {
                Ok(mailbox) => Some(mailbox),
                Err(e) => {
                    warn!("Skipping recipient: {}", e);
                    None
                }
            })
            .collect();

        debug!(
            "Email notifier: {}:{} -> {} recipient(s)",
            server,
            config.port,
            recipients.len()
        );

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(sender)?,
            recipients,
        })
    }

    fn build_message(&self, notice: &Notice) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notice.subject())
            .header(ContentType::TEXT_PLAIN);
        for to in &self.recipients {
            builder = builder.to(to.clone());
        }
        builder
            .body(notice.body())
            .map_err(|e| NotifyError::Message(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        if self.recipients.is_empty() {
            warn!("No recipients configured, skipping email for {}", notice.url);
            return Ok(());
        }

        let message = self.build_message(notice)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(
            "Email sent for {} to {} recipient(s)",
            notice.url,
            self.recipients.len()
        );
        Ok(())
    }
}
