//! Default prompts for LLM operations.

/// Instruction sent as the system message to chat-style providers.
pub const SYSTEM_INSTRUCTION: &str =
    "You summarize changes to monitored web pages for the people watching them.";

/// Default prompt for summarizing a web page diff.
pub const DEFAULT_DIFF_PROMPT: &str = r#"Summarize this web page diff.

The diff below compares the previous and current HTML of {url}. Lines starting with "-" were removed and lines starting with "+" were added. Ignore pure markup or formatting noise and describe what changed for a reader of the page: new or removed announcements, dates, prices, links, or wording.

Diff:
{diff}

Respond with a short plain-text summary of at most 5 bullet points. No preamble."#;
