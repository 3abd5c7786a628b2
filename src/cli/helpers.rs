//! Shared helper functions for CLI commands.

use std::sync::Arc;

use tracing::{info, warn};

use crate::llm::{LlmClient, LlmConfig, LlmSummarizer, Summarizer};
use crate::notify::{EmailNotifier, LogNotifier, Notifier, SmtpConfig};

/// Pick the notifier for a run.
///
/// Without an SMTP server (or with `--no-email`) notices go to the log.
/// An SMTP setup that cannot be used also falls back to the log, so the
/// pass still records state.
pub fn build_notifier(smtp: &SmtpConfig, no_email: bool) -> Arc<dyn Notifier> {
    if no_email {
        info!("Email disabled, notices will be logged");
        return Arc::new(LogNotifier);
    }
    if !smtp.is_configured() {
        warn!("SMTP_SERVER is not set, notices will be logged instead of emailed");
        return Arc::new(LogNotifier);
    }
    match EmailNotifier::new(smtp) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            warn!("Email unavailable, notices will be logged: {}", e);
            Arc::new(LogNotifier)
        }
    }
}

/// Build the change summarizer, or `None` when summaries are off or cannot
/// work with the current configuration.
pub fn build_summarizer(llm: &LlmConfig, no_summary: bool) -> Option<Arc<dyn Summarizer>> {
    if no_summary || !llm.enabled {
        return None;
    }
    if !llm.is_usable() {
        info!("No LLM API key configured, sending raw diffs");
        return None;
    }
    match LlmClient::new(llm.clone()) {
        Ok(client) => Some(Arc::new(LlmSummarizer::new(client))),
        Err(e) => {
            warn!("LLM client unavailable, sending raw diffs: {}", e);
            None
        }
    }
}

/// First characters of a digest, for display.
pub fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notice;

    #[test]
    fn test_short_digest() {
        assert_eq!(short_digest("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_digest("abc"), "abc");
    }

    #[test]
    fn test_summarizer_requires_key() {
        assert!(build_summarizer(&LlmConfig::default(), false).is_none());
        let keyed = LlmConfig::default().with_api_key("sk-test");
        assert!(build_summarizer(&keyed, false).is_some());
        assert!(build_summarizer(&keyed, true).is_none());
    }

    #[tokio::test]
    async fn test_notifier_falls_back_to_log() {
        let notice = Notice::changed("http://a.test", "diff");
        assert!(build_notifier(&SmtpConfig::default(), false)
            .notify(&notice)
            .await
            .is_ok());

        // configured server but no sender address
        let no_sender = SmtpConfig {
            server: Some("smtp.example.test".to_string()),
            ..SmtpConfig::default()
        };
        assert!(build_notifier(&no_sender, false).notify(&notice).await.is_ok());

        let bad_sender = SmtpConfig {
            server: Some("smtp.example.test".to_string()),
            from: Some("pagewatch at example".to_string()),
            ..SmtpConfig::default()
        };
        assert!(build_notifier(&bad_sender, false).notify(&notice).await.is_ok());
    }
}
