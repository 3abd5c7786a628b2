//! LLM integration for summarizing page changes.

mod client;
mod summarizer;

pub use client::{
    classify_error_response, LlmClient, LlmConfig, LlmError, LlmProvider, DEFAULT_DIFF_PROMPT,
};
pub use summarizer::{describe_change, truncate_diff, LlmSummarizer, Summarizer, TRUNCATION_MARKER};
