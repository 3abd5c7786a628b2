//! Monitoring pass: reconcile the watch-list with tracked state, then check
//! every watched URL in order.
//!
//! Per-URL failures never abort the pass. A URL whose fetch fails keeps its
//! previous record so a transient outage does not look like a new page on the
//! next run. State is persisted after each URL, and only after the matching
//! snapshot has been written.

mod reconcile;
mod summary;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::content_digest;
use crate::diff::PageDiff;
use crate::http_client::{FetchError, PageFetcher};
use crate::llm::{describe_change, Summarizer};
use crate::notify::{Notice, Notifier};
use crate::storage::{SnapshotStore, StateMap, StateStore, StoreError};

pub use reconcile::{reconcile, Reconciliation};
pub use summary::{RunSummary, UrlOutcome};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to load state: {0}")]
    State(#[source] StoreError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("snapshot could not be written to {0}")]
    Snapshot(String),

    #[error("failed to persist state: {0}")]
    Persist(#[source] StoreError),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// Runs monitoring passes over a watch-list.
pub struct Monitor {
    fetcher: Arc<dyn PageFetcher>,
    summarizer: Option<Arc<dyn Summarizer>>,
    notifier: Arc<dyn Notifier>,
    state: StateStore,
    snapshots: SnapshotStore,
}

impl Monitor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
        state: StateStore,
        snapshots: SnapshotStore,
    ) -> Self {
        Self {
            fetcher,
            summarizer: None,
            notifier,
            state,
            snapshots,
        }
    }

    /// Condense change diffs with `summarizer` before notifying.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Run one pass over `urls`.
    ///
    /// Only an unreadable state file is an error; everything after that is
    /// recorded in the returned summary.
    pub async fn run(&self, urls: &[String]) -> Result<RunSummary, MonitorError> {
        let mut state = self.state.load().map_err(MonitorError::State)?;

        if let Err(e) = self.snapshots.ensure_dir() {
            warn!("Snapshot directory unavailable: {}", e);
        }

        let Reconciliation { added, removed } = reconcile(&state, urls);
        debug!(
            "Reconciled {} watched URL(s): {} added, {} removed",
            urls.len(),
            added.len(),
            removed.len()
        );

        for url in &removed {
            self.remove(url, &mut state);
        }

        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            info!("Checking {}", url);
            let result = AssertUnwindSafe(self.check_url(url, &mut state))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(MonitorError::Panicked(panic_message(payload))));

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Failed to check {}: {}", url, e);
                    UrlOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push((url.clone(), outcome));
        }

        let pruned = self.snapshots.prune(state.keys().map(String::as_str));

        let summary = RunSummary {
            added,
            removed,
            outcomes,
            pruned,
        };
        summary.log();
        Ok(summary)
    }

    fn remove(&self, url: &str, state: &mut StateMap) {
        info!("No longer watching {}", url);
        self.snapshots.delete(url);
        state.remove(url);
        if let Err(e) = self.state.save(state) {
            warn!("Failed to persist removal of {}: {}", url, e);
        }
    }

    async fn check_url(&self, url: &str, state: &mut StateMap) -> Result<UrlOutcome, MonitorError> {
        let content = self.fetcher.fetch(url).await?;
        let digest = content_digest(&content);

        let Some(previous_digest) = state.get(url) else {
            self.store(url, &content, digest, state)?;
            info!("Started monitoring {}", url);
            let description = describe_change(None, url, &PageDiff::NoPrevious).await;
            self.send(Notice::monitoring_started(url, description)).await;
            return Ok(UrlOutcome::FirstObservation);
        };

        if *previous_digest == digest {
            debug!("No change for {}", url);
            return Ok(UrlOutcome::Unchanged);
        }

        info!("Change detected for {}", url);
        let previous = self.snapshots.load(url);
        let diff = PageDiff::compute(previous.as_deref(), &content);
        let description = describe_change(self.summarizer.as_deref(), url, &diff).await;
        self.send(Notice::changed(url, description)).await;

        self.store(url, &content, digest, state)?;
        Ok(UrlOutcome::Changed)
    }

    /// Write the snapshot, then record and persist the digest. The in-memory
    /// record is rolled back if persisting fails.
    fn store(
        &self,
        url: &str,
        content: &str,
        digest: String,
        state: &mut StateMap,
    ) -> Result<(), MonitorError> {
        if !self.snapshots.save(url, content) {
            return Err(MonitorError::Snapshot(
                self.snapshots.path_for(url).display().to_string(),
            ));
        }

        let previous = state.insert(url.to_string(), digest);
        if let Err(e) = self.state.save(state) {
            match previous {
                Some(old) => state.insert(url.to_string(), old),
                None => state.remove(url),
            };
            return Err(MonitorError::Persist(e));
        }
        Ok(())
    }

    async fn send(&self, notice: Notice) {
        if let Err(e) = self.notifier.notify(&notice).await {
            warn!("Notification for {} failed: {}", notice.url, e);
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct PanickingFetcher;

    #[async_trait]
    impl PageFetcher for PanickingFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            if url.contains("boom") {
                panic!("parser exploded");
            }
            Ok("<p>fine</p>".to_string())
        }
    }

    #[derive(Default)]
    struct FailingNotifier(Mutex<usize>);

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _notice: &Notice) -> Result<(), NotifyError> {
            *self.0.lock().unwrap() += 1;
            Err(NotifyError::Transport("connection refused".to_string()))
        }
    }

    fn monitor(dir: &std::path::Path, fetcher: Arc<dyn PageFetcher>, notifier: Arc<dyn Notifier>) -> Monitor {
        Monitor::new(
            fetcher,
            notifier,
            StateStore::new(dir.join("state.json")),
            SnapshotStore::new(dir.join("snapshots")),
        )
    }

    #[tokio::test]
    async fn test_panic_is_isolated_to_one_url() {
        let dir = tempdir().unwrap();
        let notifier = Arc::new(FailingNotifier::default());
        let monitor = monitor(dir.path(), Arc::new(PanickingFetcher), notifier);

        let urls = vec!["http://boom.test".to_string(), "http://ok.test".to_string()];
        let summary = monitor.run(&urls).await.unwrap();

        assert!(matches!(
            summary.outcome("http://boom.test"),
            Some(UrlOutcome::Failed { reason }) if reason.contains("parser exploded")
        ));
        assert_eq!(summary.outcome("http://ok.test"), Some(&UrlOutcome::FirstObservation));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_url() {
        let dir = tempdir().unwrap();
        let notifier = Arc::new(FailingNotifier::default());
        let monitor = monitor(dir.path(), Arc::new(PanickingFetcher), notifier.clone());

        let urls = vec!["http://ok.test".to_string()];
        let summary = monitor.run(&urls).await.unwrap();

        assert_eq!(summary.outcome("http://ok.test"), Some(&UrlOutcome::FirstObservation));
        assert_eq!(*notifier.0.lock().unwrap(), 1);
        assert!(monitor.state_store().load().unwrap().contains_key("http://ok.test"));
    }

    #[tokio::test]
    async fn test_snapshot_write_failure_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        // A regular file where the snapshot directory should be
        std::fs::write(dir.path().join("snapshots"), "").unwrap();
        let monitor = monitor(
            dir.path(),
            Arc::new(PanickingFetcher),
            Arc::new(FailingNotifier::default()),
        );

        let urls = vec!["http://ok.test".to_string()];
        let summary = monitor.run(&urls).await.unwrap();

        assert!(summary.outcome("http://ok.test").unwrap().is_failure());
        assert!(monitor.state_store().load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_persist_failure_rolls_back_new_url() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("state.json");
        let known_digest = content_digest("<p>fine</p>");
        let on_disk = format!("{{\"http://known.test\": \"{}\"}}\n", known_digest);
        std::fs::write(&state_path, &on_disk).unwrap();
        // A directory in the way of the temporary file makes every save fail
        std::fs::create_dir(dir.path().join("state.json.tmp")).unwrap();

        let monitor = monitor(
            dir.path(),
            Arc::new(PanickingFetcher),
            Arc::new(FailingNotifier::default()),
        );
        monitor.snapshot_store().save("http://known.test", "<p>fine</p>");

        let urls = vec!["http://known.test".to_string(), "http://new.test".to_string()];
        let summary = monitor.run(&urls).await.unwrap();

        assert_eq!(summary.outcome("http://known.test"), Some(&UrlOutcome::Unchanged));
        assert!(matches!(
            summary.outcome("http://new.test"),
            Some(UrlOutcome::Failed { reason }) if reason.contains("state")
        ));
        assert_eq!(std::fs::read_to_string(&state_path).unwrap(), on_disk);
        assert!(!monitor.snapshot_store().exists("http://new.test"));
        assert!(monitor.snapshot_store().exists("http://known.test"));
        assert_eq!(summary.pruned, 1);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(42)), "unknown panic");
    }
}
