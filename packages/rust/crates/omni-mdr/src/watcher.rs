//! Folder watcher feeding change notifications into an [`IndexStore`].
//!
//! Uses `notify` for cross-platform monitoring. Every note event marks the
//! store's caches stale; the next query rebuilds them once.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::store::{ChangeKind, FileChange, IndexStore};

/// Configuration for the folder watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Patterns (relative to the root) never reported.
    pub exclude: Vec<String>,
    /// Repeated modify events for one path inside this window are dropped.
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/.*/**".to_string(),
                "**/.*".to_string(),
            ],
            debounce_ms: 100,
        }
    }
}

/// Handle to stop the watcher.
#[derive(Debug)]
pub struct FolderWatcherHandle {
    tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl FolderWatcherHandle {
    /// Stop watching and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.tx.send(()).await;
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "watcher task ended abnormally");
        }
    }
}

fn build_exclude_set(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => tracing::warn!(pattern, error = %err, "ignoring invalid exclude glob"),
        }
    }
    builder.build().ok()
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

/// Whether an event on `path` may move a whole subtree of notes.
///
/// Renaming or removing a directory arrives as a single event for the
/// directory itself; a path that no longer exists is judged by its lack of
/// an extension.
fn touches_folder(kind: &EventKind, path: &Path) -> bool {
    let structural = matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );
    structural && (path.is_dir() || path.extension().is_none())
}

/// Watch the store's folder recursively until the handle is stopped.
///
/// `callback` sees every change the store accepted.
///
/// # Errors
/// Returns `MdrError::Watch` when the OS watcher cannot be set up.
pub fn watch_folder<F>(
    store: Arc<IndexStore>,
    config: &WatcherConfig,
    callback: Option<F>,
) -> Result<FolderWatcherHandle>
where
    F: Fn(&FileChange) + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(1);
    let (watcher_tx, mut watcher_rx) = mpsc::channel(100);

    let mut watcher = RecommendedWatcher::new(
        move |result: std::result::Result<Event, notify::Error>| {
            let _ = watcher_tx.blocking_send(result);
        },
        Config::default().with_poll_interval(Duration::from_millis(50)),
    )?;
    watcher.watch(store.root(), RecursiveMode::Recursive)?;

    // Event paths arrive absolute; ids are computed against the canonical root.
    let root =
        std::fs::canonicalize(store.root()).unwrap_or_else(|_| store.root().to_path_buf());
    let exclude = build_exclude_set(&config.exclude);
    let debounce_window = Duration::from_millis(config.debounce_ms);
    tracing::info!(root = %root.display(), "watching folder");

    let task = tokio::spawn(async move {
        // Keep watcher alive by moving it into this task
        let _watcher = watcher;
        let mut last_modified: HashMap<String, Instant> = HashMap::new();

        loop {
            tokio::select! {
                _ = rx.recv() => break,
                event = watcher_rx.recv() => {
                    let event = match event {
                        Some(Ok(event)) => event,
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "watcher error");
                            continue;
                        }
                        None => break,
                    };
                    let Some(kind) = change_kind(&event.kind) else {
                        continue;
                    };
                    for path in &event.paths {
                        let Some(change) = FileChange::from_path(kind, &root, path) else {
                            continue;
                        };
                        if exclude
                            .as_ref()
                            .is_some_and(|set| set.is_match(Path::new(&change.file_id)))
                        {
                            continue;
                        }
                        // Debounce only modifies; create/remove always pass
                        if kind == ChangeKind::Modified {
                            let now = Instant::now();
                            if last_modified
                                .get(&change.file_id)
                                .is_some_and(|last| now.duration_since(*last) < debounce_window)
                            {
                                continue;
                            }
                            last_modified
                                .retain(|_, last| now.duration_since(*last) < debounce_window);
                            last_modified.insert(change.file_id.clone(), now);
                        }
                        if store.notify(&change) {
                            if let Some(cb) = callback.as_ref() {
                                cb(&change);
                            }
                        } else if touches_folder(&event.kind, path) {
                            store.notify_folder(&change.file_id);
                        }
                    }
                }
            }
        }
        tracing::debug!(root = %root.display(), "folder watcher stopped");
    });

    Ok(FolderWatcherHandle { tx, task })
}
