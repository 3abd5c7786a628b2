//! Per-run outcome reporting.

use std::fmt;

use tracing::{info, warn};

/// What happened to one URL during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    /// Seen for the first time; snapshot and digest stored.
    FirstObservation,
    /// Digest changed; notification sent and state updated.
    Changed,
    Unchanged,
    /// Fetch or persistence failed; prior state left as it was.
    Failed { reason: String },
}

impl UrlOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            UrlOutcome::FirstObservation => "new",
            UrlOutcome::Changed => "changed",
            UrlOutcome::Unchanged => "unchanged",
            UrlOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UrlOutcome::Failed { .. })
    }
}

impl fmt::Display for UrlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlOutcome::Failed { reason } => write!(f, "failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of one monitoring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// URLs newly added to the watch-list.
    pub added: Vec<String>,
    /// URLs dropped from the watch-list (record and snapshot deleted).
    pub removed: Vec<String>,
    /// Outcome for each watched URL, in watch-list order.
    pub outcomes: Vec<(String, UrlOutcome)>,
    /// Orphaned snapshot files deleted after the pass.
    pub pruned: usize,
}

impl RunSummary {
    pub fn outcome(&self, url: &str) -> Option<&UrlOutcome> {
        self.outcomes
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&UrlOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn first_observed(&self) -> usize {
        self.count(|o| *o == UrlOutcome::FirstObservation)
    }

    pub fn changed(&self) -> usize {
        self.count(|o| *o == UrlOutcome::Changed)
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| *o == UrlOutcome::Unchanged)
    }

    pub fn failed(&self) -> usize {
        self.count(UrlOutcome::is_failure)
    }

    /// Emit the summary through `tracing`.
    pub fn log(&self) {
        for url in &self.added {
            info!("Added to watch-list: {}", url);
        }
        for url in &self.removed {
            info!("Removed from watch-list: {}", url);
        }
        for (url, outcome) in &self.outcomes {
            if let UrlOutcome::Failed { reason } = outcome {
                warn!("Check failed for {}: {}", url, reason);
            }
        }
        info!("{}", self);
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checked {} URL(s): {} new, {} changed, {} unchanged, {} failed; {} added, {} removed",
            self.outcomes.len(),
            self.first_observed(),
            self.changed(),
            self.unchanged(),
            self.failed(),
            self.added.len(),
            self.removed.len()
        )?;
        if self.pruned > 0 {
            write!(f, "; {} orphaned snapshot(s) pruned", self.pruned)?;
        }
        Ok(())
    }
}
