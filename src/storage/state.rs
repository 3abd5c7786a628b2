//! URL to digest state persisted between runs.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::StoreError;

/// Last-seen content digest per URL.
///
/// A `BTreeMap` keeps serialization order stable, so an unchanged map always
/// produces a byte-identical file.
pub type StateMap = BTreeMap<String, String>;

/// JSON file holding the [`StateMap`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the state file with an empty mapping if it does not exist.
    ///
    /// Returns `true` if the file was created.
    pub fn initialize(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&StateMap::new())?;
        info!("Initialized state file: {}", self.path.display());
        Ok(true)
    }

    /// Load the persisted mapping.
    ///
    /// A missing or blank file yields an empty mapping. A file that does not
    /// parse as a URL to digest mapping is reinitialized to an empty mapping.
    /// Only genuine read failures are returned as errors.
    pub fn load(&self) -> Result<StateMap, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("State file {} not found, starting empty", self.path.display());
                return Ok(StateMap::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(StateMap::new());
        }

        match serde_json::from_str::<StateMap>(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(
                    "State file {} is malformed ({}), reinitializing",
                    self.path.display(),
                    e
                );
                let empty = StateMap::new();
                if let Err(e) = self.save(&empty) {
                    warn!("Failed to reinitialize state file: {}", e);
                }
                Ok(empty)
            }
        }
    }

    /// Persist the mapping, replacing the previous file.
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place so a crash never leaves a half-written state file.
    pub fn save(&self, map: &StateMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut json = serde_json::to_string_pretty(map)?;
        json.push('\n');

        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::io(&self.path, e)
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
