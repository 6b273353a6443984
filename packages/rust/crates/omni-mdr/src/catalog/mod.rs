//! File catalog: enumerate markdown notes under a root and read them safely.
//!
//! Scanning runs the directory walk on the blocking pool; reads go through
//! `tokio::fs` after the file id has been checked for containment.

mod detect;
mod paths;

use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{MdrError, Result};

pub use detect::{decode_note, is_binary};
pub use paths::{
    collapse_segments, ensure_contained, file_id_for, file_name_of, parent_dir_of,
    resolve_within_root,
};
pub(crate) use paths::normalize_slashes;

const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// One markdown note discovered under the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Root-relative path with forward slashes.
    pub id: String,
    /// Final path segment.
    pub name: String,
    /// Absolute location on disk.
    pub absolute_path: PathBuf,
    /// Root-relative path as the host renders it.
    pub relative_path: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
    /// Creation time, falling back to modification time when the
    /// filesystem does not record it.
    pub created_at: DateTime<Utc>,
}

/// Stat data returned alongside a file body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
    /// Creation time (modification time when unavailable).
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of the raw bytes.
    pub hash: String,
}

/// Body and metadata of one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// Decoded text.
    pub content: String,
    /// Stat data and content hash.
    pub metadata: FileMetadata,
}

/// What the catalog considers a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// Accepted file extensions, without the dot, case-insensitive.
    pub extensions: Vec<String>,
    /// Directory names pruned from the walk (hidden directories always are).
    pub exclude_dirs: Vec<String>,
    /// Reads larger than this fail with `TooLarge`.
    pub max_file_bytes: u64,
    /// Restrict the catalog to this single file id.
    pub single_file: Option<String>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            exclude_dirs: vec!["node_modules".to_string()],
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            single_file: None,
        }
    }
}

impl CatalogOptions {
    /// Whether a path carries one of the accepted extensions.
    #[must_use]
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    fn admits_id(&self, file_id: &str) -> bool {
        self.single_file
            .as_deref()
            .is_none_or(|only| only == file_id)
    }
}

/// Markdown notes under one root folder.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
    options: CatalogOptions,
}

impl FileCatalog {
    /// Catalog over `root` with the given options.
    pub fn new(root: impl Into<PathBuf>, options: CatalogOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Root folder as configured.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Active options.
    #[must_use]
    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// List every note under the root, sorted by relative path.
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    /// Returns `MdrError::Io` when the root exists but cannot be walked.
    pub async fn scan(&self) -> Result<Vec<FileEntry>> {
        let root = self.root.clone();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || scan_notes(&root, &options))
            .await
            .map_err(|err| MdrError::io(&self.root, std::io::Error::other(err)))?
    }

    /// Read one note by id.
    ///
    /// # Errors
    /// - `PathTraversal` when the id leaves the root
    /// - `NotFound` when nothing is there (or single-file mode hides it)
    /// - `TooLarge` / `BinaryFile` for files that are not readable notes
    pub async fn read(&self, file_id: &str) -> Result<FileContent> {
        let candidate = resolve_within_root(&self.root, file_id)?;
        let path = ensure_contained(&self.root, &candidate, file_id).await?;
        if let Some(id) = file_id_for(&candidate, &self.root)
            && !self.options.admits_id(&id)
        {
            return Err(MdrError::NotFound(file_id.to_string()));
        }

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|err| MdrError::io(&path, err))?;
        if !meta.is_file() {
            return Err(MdrError::NotFound(file_id.to_string()));
        }
        if meta.len() > self.options.max_file_bytes {
            return Err(MdrError::TooLarge {
                path: file_id.to_string(),
                size: meta.len(),
                limit: self.options.max_file_bytes,
            });
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| MdrError::io(&path, err))?;
        let hash = hex::encode(Sha256::digest(&bytes));
        let content = decode_note(bytes, file_id)?;
        let (modified_at, created_at) = timestamps(&meta);
        Ok(FileContent {
            content,
            metadata: FileMetadata {
                size: meta.len(),
                modified_at,
                created_at,
                hash,
            },
        })
    }
}

/// Blocking scan used by [`FileCatalog::scan`].
///
/// # Errors
/// Returns `MdrError::Io` when the root itself cannot be read.
pub fn scan_notes(root: &Path, options: &CatalogOptions) -> Result<Vec<FileEntry>> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "catalog root missing; empty scan");
        return Ok(Vec::new());
    }
    let excluded: HashSet<String> = options
        .exclude_dirs
        .iter()
        .map(|name| name.to_lowercase())
        .collect();

    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir() && paths::should_skip_dir(entry.path(), root, &excluded))
        });
    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walk failed at root"));
                return Err(MdrError::io(root, source));
            }
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry during scan");
                continue;
            }
        };
        if !entry.file_type().is_file() || !options.accepts(entry.path()) {
            continue;
        }
        let Some(id) = file_id_for(entry.path(), root) else {
            continue;
        };
        if file_name_of(&id).starts_with('.') || !options.admits_id(&id) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                tracing::warn!(file_id = %id, error = %err, "skipping note without metadata");
                continue;
            }
        };
        let (modified_at, created_at) = timestamps(&meta);
        let relative_path = entry
            .path()
            .strip_prefix(root)
            .map_or_else(|_| id.clone(), |rel| rel.display().to_string());
        entries.push(FileEntry {
            name: file_name_of(&id).to_string(),
            absolute_path: entry.path().to_path_buf(),
            relative_path,
            size: meta.len(),
            modified_at,
            created_at,
            id,
        });
    }
    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::debug!(root = %root.display(), count = entries.len(), "catalog scanned");
    Ok(entries)
}

fn timestamps(meta: &Metadata) -> (DateTime<Utc>, DateTime<Utc>) {
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let created = meta.created().unwrap_or(modified);
    (DateTime::<Utc>::from(modified), DateTime::<Utc>::from(created))
}
