#![allow(clippy::doc_markdown)]

//! omni-mdr - Markdown folder reader core for Omni DevEnv
//!
//! Serves a folder of markdown notes: lists files, reads them safely,
//! resolves the link graph between them (including wiki links), fuzzy
//! searches names and bodies, and lays the graph out on a whiteboard.
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-mdr/src/
//! ├── lib.rs        # Re-exports (this file)
//! ├── error.rs      # MdrError enum
//! ├── config.rs     # Layered YAML settings
//! ├── catalog/      # Folder scan, contained reads, binary detection
//! ├── links/        # Link extraction, outline, preview text
//! ├── backlinks/    # Link resolution, backlink index, graph data
//! ├── search/       # Fuzzy scorer, query syntax, search index
//! ├── layout/       # Force-directed simulation, saved positions
//! ├── store/        # TTL caches, index store, session
//! ├── watcher.rs    # Folder watcher feeding cache invalidation
//! └── bin/mdr.rs    # Command line front-end
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_mdr::{IndexStore, MdrSettings};
//!
//! let store = IndexStore::new("./notes", MdrSettings::default());
//! let files = store.files().await?;
//! let info = store.backlinks("b.md").await?;
//! let hits = store.search("welcome", None).await?;
//! ```

// ============================================================================
// Module Declarations (ODF-REP: Atomic Structure)
// ============================================================================

pub mod backlinks;
pub mod catalog;
pub mod config;
mod error;
pub mod layout;
pub mod links;
pub mod search;
pub mod store;
#[cfg(feature = "watch")]
pub mod watcher;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use backlinks::{
    BacklinkEdge, BacklinkIndex, BacklinkInfo, BacklinkReference, Connection, GraphData, NoteNode,
};
pub use catalog::{CatalogOptions, FileCatalog, FileContent, FileEntry, FileMetadata};
pub use config::{LayoutSettings, MdrSettings, load_settings};
pub use error::{MdrError, Result};
pub use layout::{
    Canvas, ForceParams, GraphEdge, GraphNode, LayoutState, Position, PositionMap, PositionStore,
    compute_layout,
};
pub use links::{ExtractOptions, Heading, LinkKind, LinkReference, extract_links, extract_outline};
pub use search::{
    ApproximateScorer, FuzzyScorer, SearchIndex, SearchMatch, SearchOptions, SearchResult,
};
pub use store::{ChangeKind, FileChange, IndexStore, Session, StoreStats};
#[cfg(feature = "watch")]
pub use watcher::{FolderWatcherHandle, WatcherConfig, watch_folder};
