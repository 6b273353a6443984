//! Index store: the per-folder owner of catalog, backlink and search caches.
//!
//! Every query goes through a [`TtlCache`]; a change notification for a
//! note marks all three stale at once.

mod session;
mod ttl;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backlinks::{BacklinkIndex, BacklinkInfo, GraphData};
use crate::catalog::{FileCatalog, FileContent, FileEntry, file_id_for};
use crate::config::MdrSettings;
use crate::error::Result;
use crate::layout::{Canvas, PositionMap, compute_layout};
use crate::links::{Heading, extract_outline, preview};
use crate::search::{SearchIndex, SearchResult};

pub use session::Session;
use ttl::TtlCache;

/// Kind of filesystem change reported by a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// New file.
    Added,
    /// Content changed.
    Modified,
    /// File removed.
    Deleted,
}

/// A change notification for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Root-relative id of the file.
    pub file_id: String,
}

impl FileChange {
    /// Change for an id.
    pub fn new(kind: ChangeKind, file_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
        }
    }

    /// Change for an absolute path under `root`; `None` for paths outside it.
    #[must_use]
    pub fn from_path(kind: ChangeKind, root: &Path, path: &Path) -> Option<Self> {
        file_id_for(path, root).map(|file_id| Self { kind, file_id })
    }
}

/// Build counters, mostly for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Completed catalog scans.
    pub catalog_builds: u64,
    /// Completed backlink index builds.
    pub backlink_builds: u64,
    /// Completed search index builds.
    pub search_builds: u64,
}

/// Directory holding `file`; `.` for a bare relative file name.
fn parent_folder(file: &Path) -> PathBuf {
    file.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Caches and settings for one folder.
pub struct IndexStore {
    settings: Arc<MdrSettings>,
    catalog: FileCatalog,
    files: TtlCache<Vec<FileEntry>>,
    backlinks: TtlCache<BacklinkIndex>,
    search: TtlCache<SearchIndex>,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("root", &self.catalog.root())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl IndexStore {
    /// Store over `root`.
    ///
    /// When `root` names a file, the store serves that single note from its
    /// parent directory.
    pub fn new(root: impl Into<PathBuf>, settings: impl Into<Arc<MdrSettings>>) -> Self {
        let settings = settings.into();
        let root = root.into();
        let mut options = settings.catalog.clone();
        let folder = if root.is_file() {
            options.single_file = root
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            parent_folder(&root)
        } else {
            root
        };
        let ttl = settings.cache_ttl;
        tracing::debug!(root = %folder.display(), ttl_secs = ttl.as_secs(), "index store created");
        Self {
            catalog: FileCatalog::new(folder, options),
            files: TtlCache::new("catalog", ttl),
            backlinks: TtlCache::new("backlinks", ttl),
            search: TtlCache::new("search", ttl),
            settings,
        }
    }

    /// Folder being served.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.catalog.root()
    }

    /// Active settings.
    #[must_use]
    pub fn settings(&self) -> &MdrSettings {
        &self.settings
    }

    /// Catalog snapshot, sorted by relative path.
    ///
    /// # Errors
    /// `IndexUnavailable` when the first scan fails.
    pub async fn files(&self) -> Result<Arc<Vec<FileEntry>>> {
        self.files.get_or_build(|| self.catalog.scan()).await
    }

    /// Read one note. Not cached.
    ///
    /// # Errors
    /// See [`FileCatalog::read`].
    pub async fn read(&self, file_id: &str) -> Result<FileContent> {
        self.catalog.read(file_id).await
    }

    /// Backlink index snapshot.
    ///
    /// # Errors
    /// `IndexUnavailable` when the first build fails.
    pub async fn backlink_index(&self) -> Result<Arc<BacklinkIndex>> {
        self.backlinks
            .get_or_build(|| async {
                let files = self.files().await?;
                Ok(BacklinkIndex::build(
                    &self.catalog,
                    &files,
                    self.settings.links,
                    self.settings.search.read_concurrency,
                )
                .await)
            })
            .await
    }

    /// Linked-from and links-to lists for one note.
    ///
    /// # Errors
    /// `IndexUnavailable` when the first build fails.
    pub async fn backlinks(&self, file_id: &str) -> Result<BacklinkInfo> {
        Ok(self.backlink_index().await?.query(file_id))
    }

    /// Search index snapshot.
    ///
    /// # Errors
    /// `IndexUnavailable` when the first build fails.
    pub async fn search_index(&self) -> Result<Arc<SearchIndex>> {
        self.search
            .get_or_build(|| async {
                let files = self.files().await?;
                Ok(SearchIndex::build(&self.catalog, &files, self.settings.search.clone()).await)
            })
            .await
    }

    /// Ranked notes for `query`; `limit` defaults to the configured cap.
    ///
    /// A blank query returns nothing without building the index.
    ///
    /// # Errors
    /// `IndexUnavailable` when the first build fails.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.unwrap_or(self.settings.search.default_limit);
        Ok(self.search_index().await?.search(query, limit))
    }

    /// Whole-folder link graph.
    ///
    /// # Errors
    /// `IndexUnavailable` when the first build fails.
    pub async fn graph(&self) -> Result<GraphData> {
        Ok(self.backlink_index().await?.graph())
    }

    /// Heading outline of one note.
    ///
    /// # Errors
    /// See [`FileCatalog::read`].
    pub async fn outline(&self, file_id: &str) -> Result<Vec<Heading>> {
        Ok(extract_outline(&self.read(file_id).await?.content))
    }

    /// Plain-text card preview of one note.
    ///
    /// # Errors
    /// See [`FileCatalog::read`].
    pub async fn preview(&self, file_id: &str, max_chars: usize) -> Result<String> {
        Ok(preview(&self.read(file_id).await?.content, max_chars))
    }

    /// Whiteboard positions for every note, honoring `saved`.
    ///
    /// # Errors
    /// `IndexUnavailable` when the first build fails.
    pub async fn layout(
        &self,
        canvas: Canvas,
        saved: Option<&PositionMap>,
        iterations: Option<usize>,
    ) -> Result<PositionMap> {
        let graph = self.graph().await?;
        let iterations = iterations.unwrap_or(self.settings.layout.iterations);
        Ok(compute_layout(
            &graph.node_ids(),
            graph.layout_edges(),
            canvas,
            saved,
            iterations,
        ))
    }

    /// Invalidate every cache if the change concerns a note.
    ///
    /// Returns whether anything was invalidated.
    pub fn notify(&self, change: &FileChange) -> bool {
        if !self.catalog.options().accepts(Path::new(&change.file_id)) {
            tracing::trace!(file_id = %change.file_id, "ignoring change to non-note file");
            return false;
        }
        tracing::debug!(
            file_id = %change.file_id,
            kind = ?change.kind,
            "note changed; invalidating indexes"
        );
        self.invalidate_all();
        true
    }

    /// Invalidate every cache after a directory under the root was created,
    /// moved or removed. Such events carry no per-note paths.
    pub fn notify_folder(&self, dir_id: &str) {
        tracing::debug!(dir_id, "folder changed; invalidating indexes");
        self.invalidate_all();
    }

    /// Mark catalog, backlink and search caches stale.
    pub fn invalidate_all(&self) {
        self.files.invalidate();
        self.backlinks.invalidate();
        self.search.invalidate();
    }

    /// Completed build counts.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            catalog_builds: self.files.builds(),
            backlink_builds: self.backlinks.builds(),
            search_builds: self.search.builds(),
        }
    }
}
