//! On-disk persistence for run state and page snapshots.

mod snapshot;
mod state;

use std::path::Path;

use thiserror::Error;

pub use snapshot::{snapshot_key, SnapshotStore, SNAPSHOT_EXTENSION};
pub use state::{StateMap, StateStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Log diagnostic information about a directory for debugging I/O failures.
///
/// Records the working directory, whether the directory exists, and its
/// permission bits (plus owner and running uid/gid on Unix).
pub(crate) fn log_directory_diagnostics(path: &Path, label: &str) {
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    tracing::warn!(
        "{} diagnostics: cwd={}, path={}, exists={}",
        label,
        cwd,
        path.display(),
        path.exists()
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        tracing::warn!("{} check: running as uid={} gid={}", label, uid, gid);

        let target = if path.exists() {
            Some(path)
        } else {
            path.parent().filter(|p| p.exists())
        };
        if let Some(target) = target {
            match std::fs::metadata(target) {
                Ok(meta) => tracing::warn!(
                    "{} metadata: path={}, owner={}:{}, mode={:o}, is_dir={}",
                    label,
                    target.display(),
                    meta.uid(),
                    meta.gid(),
                    meta.mode() & 0o7777,
                    meta.is_dir()
                ),
                Err(e) => tracing::warn!("{} metadata read failed: {}", label, e),
            }
        }
    }

    #[cfg(not(unix))]
    if let Ok(meta) = std::fs::metadata(path) {
        tracing::warn!(
            "{} metadata: readonly={}, is_dir={}",
            label,
            meta.permissions().readonly(),
            meta.is_dir()
        );
    }
}
