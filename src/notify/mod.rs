//! Change notifications.
//!
//! The monitor hands every first observation and every detected change to a
//! [`Notifier`]. Delivery is fire-and-forget: the monitor logs a failed
//! delivery and moves on, there is no retry or queue.

mod email;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

pub use email::{parse_recipients, EmailNotifier, SmtpConfig};

/// Errors raised while delivering a notice.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid email address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    #[error("notifier is not configured: {0}")]
    NotConfigured(String),
}

/// What a notice reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The URL was seen for the first time.
    MonitoringStarted,
    /// The URL's content digest changed.
    Changed,
}

/// A single notification about one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub url: String,
    pub kind: NoticeKind,
    /// Diff, AI summary plus diff, or the first-observation sentinel.
    pub description: String,
}

impl Notice {
    pub fn monitoring_started(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: NoticeKind::MonitoringStarted,
            description: description.into(),
        }
    }

    pub fn changed(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: NoticeKind::Changed,
            description: description.into(),
        }
    }

    pub fn subject(&self) -> String {
        match self.kind {
            NoticeKind::MonitoringStarted => format!("Monitoring started: {}", self.url),
            NoticeKind::Changed => format!("Web page update: {}", self.url),
        }
    }

    pub fn body(&self) -> String {
        let heading = match self.kind {
            NoticeKind::MonitoringStarted => "Now monitoring",
            NoticeKind::Changed => "The following page has changed",
        };
        format!(
            "{}: {}\n\nChange description:\n{}\n",
            heading, self.url, self.description
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subject())
    }
}

/// Delivers notices to whoever is watching.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Writes notices to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        // One line per event: the body goes in as an escaped field
        info!(url = %notice.url, "{}", notice.subject());
        debug!(url = %notice.url, body = ?notice.body(), "Notice body");
        Ok(())
    }
}
