//! Snapshot storage: the last raw content seen for each watched URL.
//!
//! Snapshots only feed the human-readable diff; change detection uses the
//! digests kept by [`super::StateStore`]. Files are named by a hash of the URL
//! so arbitrary URL characters and lengths never reach the filesystem:
//! `{snapshot_dir}/{sha256(url)}.html`.
//!
//! All public operations are best-effort. Failures are logged with directory
//! diagnostics and reported through the return value, never propagated.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{log_directory_diagnostics, StoreError};
use crate::content::compute_hash;

/// File extension for snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "html";

/// Filesystem-safe key for a URL.
pub fn snapshot_key(url: &str) -> String {
    compute_hash(url)
}

/// Whether a file stem has the shape of a [`snapshot_key`].
fn is_snapshot_key(stem: &str) -> bool {
    stem.len() == 64 && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Directory of per-URL raw content snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the snapshot for `url`.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", snapshot_key(url), SNAPSHOT_EXTENSION))
    }

    /// Create the snapshot directory if it does not exist.
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))
    }

    pub fn exists(&self, url: &str) -> bool {
        self.path_for(url).is_file()
    }

    /// Create or overwrite the snapshot for `url`. Returns `true` on success.
    pub fn save(&self, url: &str, content: &str) -> bool {
        match self.try_save(url, content) {
            Ok(()) => {
                debug!("Saved snapshot for {}", url);
                true
            }
            Err(e) => {
                warn!("Failed to save snapshot for {}: {}", url, e);
                log_directory_diagnostics(&self.dir, "snapshot_dir");
                false
            }
        }
    }

    /// Read the snapshot for `url`, or `None` if it is absent or unreadable.
    pub fn load(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        match fs::read(&path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot for {} at {}", url, path.display());
                None
            }
            Err(e) => {
                warn!("Failed to read snapshot for {}: {}", url, StoreError::io(&path, e));
                log_directory_diagnostics(&self.dir, "snapshot_dir");
                None
            }
        }
    }

    /// Remove the snapshot for `url`. A missing snapshot counts as success.
    pub fn delete(&self, url: &str) -> bool {
        let path = self.path_for(url);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted snapshot for {}", url);
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!(
                    "Failed to delete snapshot for {}: {}",
                    url,
                    StoreError::io(&path, e)
                );
                log_directory_diagnostics(&self.dir, "snapshot_dir");
                false
            }
        }
    }

    /// Delete snapshot files that belong to none of `tracked` URLs.
    ///
    /// Only `{key}.html` files whose stem is a snapshot key are considered,
    /// so other files sharing the directory are left alone. Returns the
    /// number of files removed.
    pub fn prune<'a>(&self, tracked: impl IntoIterator<Item = &'a str>) -> usize {
        let keep: HashSet<String> = tracked.into_iter().map(snapshot_key).collect();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(
                    "Failed to list snapshots: {}",
                    StoreError::io(&self.dir, e)
                );
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_snapshot_key(stem) || keep.contains(stem) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Pruned orphaned snapshot {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!(
                    "Failed to prune orphaned snapshot: {}",
                    StoreError::io(&path, e)
                ),
            }
        }
        removed
    }

    fn try_save(&self, url: &str, content: &str) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let path = self.path_for(url);
        fs::write(&path, content).map_err(|e| StoreError::io(&path, e))
    }
}
