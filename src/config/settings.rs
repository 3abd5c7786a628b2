//! Resolved runtime settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http_client::{FetchError, HttpClient, USER_AGENT};
use crate::storage::{SnapshotStore, StateStore};

/// Default watch-list filename.
pub const DEFAULT_URLS_FILE: &str = "urls.txt";
/// Default state filename.
pub const DEFAULT_STATE_FILE: &str = "last_hashes.json";
/// Default snapshot directory name.
pub const DEFAULT_SNAPSHOT_DIR: &str = "snapshots";

/// Application settings with all paths resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Newline-delimited watch-list.
    pub urls_file: PathBuf,
    /// URL to digest mapping.
    pub state_file: PathBuf,
    /// Directory of raw page snapshots.
    pub snapshot_dir: PathBuf,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Config file the settings were loaded from, if any.
    pub config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_base_dir(Path::new("."))
    }
}

impl Settings {
    /// Default settings with files placed under `base_dir`.
    pub fn with_base_dir(base_dir: &Path) -> Self {
        Self {
            urls_file: base_dir.join(DEFAULT_URLS_FILE),
            state_file: base_dir.join(DEFAULT_STATE_FILE),
            snapshot_dir: base_dir.join(DEFAULT_SNAPSHOT_DIR),
            user_agent: USER_AGENT.to_string(),
            request_timeout: 30,
            config_path: None,
        }
    }

    /// Create the snapshot directory and the state file's parent directory.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.snapshot_dir)?;
        if let Some(parent) = self.state_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.state_file)
    }

    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(&self.snapshot_dir)
    }

    /// HTTP client configured with this run's timeout and user agent.
    pub fn http_client(&self) -> Result<HttpClient, FetchError> {
        HttpClient::builder()
            .timeout(Duration::from_secs(self.request_timeout))
            .user_agent(&self.user_agent)
            .build()
    }
}
