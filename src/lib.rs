//! pagewatch - web page change monitoring.
//!
//! Fetches a list of pages, fingerprints their visible text, and when a page
//! changes sends a notification containing a line diff of the raw content
//! (optionally condensed by an LLM). State and snapshots persist between runs
//! so each invocation only reports what changed since the previous one.

pub mod cli;
pub mod config;
pub mod content;
pub mod diff;
pub mod http_client;
pub mod llm;
pub mod lock;
pub mod monitor;
pub mod notify;
pub mod storage;
pub mod watchlist;

pub use monitor::{Monitor, RunSummary, UrlOutcome};
