//! Change summarization with graceful fallback to the raw diff.

use std::borrow::Cow;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::client::{LlmClient, LlmError};
use crate::diff::PageDiff;

/// Appended to a diff that was cut short before submission.
pub const TRUNCATION_MARKER: &str = "\n... (diff truncated)";

/// Condenses a page diff into natural language.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, url: &str, diff: &str) -> Result<String, LlmError>;
}

/// [`Summarizer`] backed by an [`LlmClient`].
pub struct LlmSummarizer {
    client: LlmClient,
}

impl LlmSummarizer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, url: &str, diff: &str) -> Result<String, LlmError> {
        self.client.ensure_ready()?;

        let config = self.client.config();
        let diff = truncate_diff(diff, config.max_diff_chars);
        let prompt = config
            .get_prompt()
            .replace("{url}", url)
            .replace("{diff}", &diff);

        debug!("Summarizing diff for {} ({} chars)", url, diff.len());
        self.client.complete(&prompt).await
    }
}

/// Truncate a diff to at most `max_chars` bytes (UTF-8 safe), appending
/// [`TRUNCATION_MARKER`] when anything was cut.
pub fn truncate_diff(diff: &str, max_chars: usize) -> Cow<'_, str> {
    if diff.len() <= max_chars {
        return Cow::Borrowed(diff);
    }
    let mut end = max_chars;
    while end > 0 && !diff.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}{}", &diff[..end], TRUNCATION_MARKER))
}

/// Build the change description for a notification.
///
/// With a working summarizer the result is the summary followed by the full
/// diff. Every summarizer failure falls back to the diff alone.
pub async fn describe_change(
    summarizer: Option<&dyn Summarizer>,
    url: &str,
    diff: &PageDiff,
) -> String {
    let raw = diff.render();
    if diff.is_first_observation() {
        return raw;
    }
    let Some(summarizer) = summarizer else {
        return raw;
    };

    match summarizer.summarize(url, &raw).await {
        Ok(summary) => {
            info!("Summarized change for {}", url);
            format!("AI summary:\n{}\n\nDiff:\n{}", summary, raw)
        }
        Err(e) => {
            match &e {
                LlmError::Disabled => debug!("Summarization disabled, sending raw diff"),
                LlmError::MissingCredentials(_) => {
                    warn!("Summarization skipped for {}: {}", url, e)
                }
                LlmError::Authentication(_) => {
                    warn!("Summarization auth failed for {}: {} (check the API key)", url, e)
                }
                LlmError::RateLimited { .. } => {
                    warn!("Summarization rate limited for {}: {}", url, e)
                }
                LlmError::QuotaExceeded(_) => {
                    warn!("Summarization quota exhausted for {}: {}", url, e)
                }
                _ => warn!("Summarization failed for {}: {}", url, e),
            }
            raw
        }
    }
}
