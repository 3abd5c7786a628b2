//! Run lock preventing overlapping `check` invocations.
//!
//! The lock file sits next to the state file (`<state_file>.lock`). The
//! advisory OS lock on it is what excludes other runs; the JSON metadata
//! inside only names the holder for error messages. A file nobody holds is
//! reclaimed whatever it contains, so a run killed mid-write never wedges
//! later runs. Dropping the [`RunLock`] clears the metadata and releases the
//! advisory lock; the file itself stays in place.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Information about the process holding the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
    pub pid: u32,
    pub host: String,
    pub started_at: DateTime<Utc>,
}

impl LockMetadata {
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            host: current_host(),
            started_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for LockMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PID {} on {} since {}",
            self.pid,
            self.host,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another check is already running ({0})")]
    AlreadyLocked(LockMetadata),

    #[error("lock file {path} is held by another process whose details are unreadable")]
    Unreadable { path: String },

    #[error("lock I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        LockError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Path of the lock file guarding `state_file`.
pub fn lock_path_for(state_file: &Path) -> PathBuf {
    let mut name = state_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    state_file.with_file_name(name)
}

/// A held run lock, released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
    metadata: LockMetadata,
}

impl RunLock {
    /// Acquire the lock guarding `state_file`.
    ///
    /// Fails with [`LockError::AlreadyLocked`] only while another process
    /// actually holds the advisory lock. Leftover contents from a run that
    /// died are overwritten.
    pub fn acquire(state_file: &Path) -> Result<Self, LockError> {
        let path = lock_path_for(state_file);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::io(&path, e))?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() != fs2::lock_contended_error().kind() {
                return Err(LockError::io(&path, e));
            }
            return Err(match read_metadata(&mut file) {
                Some(holder) => LockError::AlreadyLocked(holder),
                None => LockError::Unreadable {
                    path: path.display().to_string(),
                },
            });
        }

        let mut leftover = String::new();
        file.read_to_string(&mut leftover)
            .map_err(|e| LockError::io(&path, e))?;
        if !leftover.trim().is_empty() {
            match serde_json::from_str::<LockMetadata>(&leftover) {
                Ok(previous) => warn!("Reclaiming run lock left by {}", previous),
                Err(_) => warn!("Reclaiming unreadable run lock {}", path.display()),
            }
        }

        let metadata = LockMetadata::current();
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| LockError::io(&path, std::io::Error::other(e)))?;
        file.set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(json.as_bytes()))
            .and_then(|_| file.sync_all())
            .map_err(|e| LockError::io(&path, e))?;

        debug!("Acquired run lock {}", path.display());
        Ok(Self { file, path, metadata })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &LockMetadata {
        &self.metadata
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // Clear before unlocking so the next holder never sees our details
        if let Err(e) = self.file.set_len(0) {
            warn!("Failed to clear run lock {}: {}", self.path.display(), e);
        }
        let _ = FileExt::unlock(&self.file);
    }
}

fn read_metadata(file: &mut File) -> Option<LockMetadata> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut contents).ok()?;
    serde_json::from_str(&contents).ok()
}

fn current_host() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lock_path_for() {
        assert_eq!(
            lock_path_for(Path::new("/data/last_hashes.json")),
            PathBuf::from("/data/last_hashes.json.lock")
        );
    }

    #[test]
    fn test_acquire_and_release() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("state.json");

        let lock = RunLock::acquire(&state).unwrap();
        let path = lock.path().to_path_buf();
        assert_eq!(lock.metadata().pid, std::process::id());
        let written: LockMetadata =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(&written, lock.metadata());

        drop(lock);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        RunLock::acquire(&state).unwrap();
    }

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("state.json");

        let _held = RunLock::acquire(&state).unwrap();
        let err = RunLock::acquire(&state).unwrap_err();
        assert!(matches!(err, LockError::AlreadyLocked(ref m) if m.pid == std::process::id()));
    }

    #[test]
    fn test_held_lock_with_unreadable_details() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("state.json");
        let path = lock_path_for(&state);
        std::fs::write(&path, "").unwrap();

        let holder = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        holder.try_lock_exclusive().unwrap();

        let err = RunLock::acquire(&state).unwrap_err();
        assert!(matches!(err, LockError::Unreadable { .. }));
    }

    #[test]
    fn test_leftover_lock_from_dead_run_is_reclaimed() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("state.json");
        let previous = LockMetadata {
            pid: i32::MAX as u32,
            host: current_host(),
            started_at: Utc::now(),
        };
        std::fs::write(
            lock_path_for(&state),
            serde_json::to_string(&previous).unwrap(),
        )
        .unwrap();

        let lock = RunLock::acquire(&state).unwrap();
        assert_eq!(lock.metadata().pid, std::process::id());
    }

    #[test]
    fn test_unheld_empty_or_garbage_lock_is_reclaimed() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("state.json");
        let path = lock_path_for(&state);

        for leftover in ["", "not json", "{\"pid\": 1, \"host\": \"trunc"] {
            std::fs::write(&path, leftover).unwrap();
            let lock = RunLock::acquire(&state).unwrap();
            let written: LockMetadata =
                serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(written.pid, std::process::id());
            drop(lock);
        }
    }
}
