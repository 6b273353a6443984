//! Saved whiteboard positions, one namespace per folder.
//!
//! Stored as a single JSON document:
//!
//! ```json
//! { "whiteboard_positions_/home/me/notes": { "a.md": { "x": 120.0, "y": 80.0 } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::PositionMap;
use crate::error::{MdrError, Result};

const KEY_PREFIX: &str = "whiteboard_positions_";

/// Namespace key for a folder.
#[must_use]
pub fn folder_key(folder: &Path) -> String {
    format!("{KEY_PREFIX}{}", folder.display())
}

/// JSON file holding position maps for every folder.
#[derive(Debug, Clone)]
pub struct PositionStore {
    path: PathBuf,
}

impl PositionStore {
    /// Store backed by `path` (created on first save).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_all(&self) -> BTreeMap<String, PositionMap> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to read saved positions; ignoring");
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(all) => all,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to parse saved positions; ignoring");
                BTreeMap::new()
            }
        }
    }

    /// Saved positions for `folder`; empty when none were saved or the file is unreadable.
    #[must_use]
    pub fn load(&self, folder: &Path) -> PositionMap {
        self.load_all()
            .remove(&folder_key(folder))
            .unwrap_or_default()
    }

    /// Replace the saved map for `folder`, leaving other folders untouched.
    ///
    /// # Errors
    /// Returns `MdrError::Io` when the file cannot be written.
    pub fn save(&self, folder: &Path, positions: &PositionMap) -> Result<()> {
        let mut all = self.load_all();
        all.insert(folder_key(folder), positions.clone());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| MdrError::io(parent, err))?;
        }
        let payload = serde_json::to_string_pretty(&all)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, payload).map_err(|err| MdrError::io(&staging, err))?;
        std::fs::rename(&staging, &self.path).map_err(|err| MdrError::io(&self.path, err))?;
        tracing::debug!(folder = %folder.display(), nodes = positions.len(), "saved positions");
        Ok(())
    }

    /// Drop the saved map for `folder`.
    ///
    /// # Errors
    /// Returns `MdrError::Io` when the file cannot be rewritten.
    pub fn clear(&self, folder: &Path) -> Result<()> {
        let mut all = self.load_all();
        if all.remove(&folder_key(folder)).is_none() {
            return Ok(());
        }
        let payload = serde_json::to_string_pretty(&all)?;
        std::fs::write(&self.path, payload).map_err(|err| MdrError::io(&self.path, err))
    }
}
