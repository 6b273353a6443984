//! Error types for the markdown reader core.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MdrError>;

/// Error types for catalog, index and layout operations.
///
/// Each variant represents a specific failure mode a caller may want to
/// tell apart (a missing file is not a traversal attempt).
#[derive(Error, Debug)]
pub enum MdrError {
    /// File id does not name a file under the root.
    #[error("File not found: {0}")]
    NotFound(String),

    /// File id resolves outside the root folder.
    #[error("Path escapes root folder: {0}")]
    PathTraversal(String),

    /// File contains binary content (NULL bytes detected).
    #[error("Binary file detected: {0}")]
    BinaryFile(String),

    /// File exceeds the configured size limit.
    #[error("File too large: {path} ({size} bytes, limit: {limit})")]
    TooLarge {
        /// Offending file id.
        path: String,
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// Low-level I/O error with the path it happened on.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An index could not be built and no previous snapshot exists.
    #[error("{index} index unavailable: {reason}")]
    IndexUnavailable {
        /// Which index failed (`catalog`, `backlinks`, `search`).
        index: &'static str,
        /// Failure description from the build.
        reason: String,
    },

    /// Malformed request (missing query parameter and similar).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration could not be loaded or applied.
    #[error("Config error: {0}")]
    Config(String),

    /// Folder watcher failure.
    #[cfg(feature = "watch")]
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MdrError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP-style status code for transport layers.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::PathTraversal(_) => 403,
            Self::InvalidQuery(_) => 400,
            Self::TooLarge { .. } => 413,
            Self::BinaryFile(_) => 415,
            _ => 500,
        }
    }
}
