use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::IndexStore;
use crate::config::MdrSettings;

/// The currently served folder.
///
/// Switching folders swaps in a fresh [`IndexStore`], so every cache of the
/// old folder goes away at once. Callers holding the old store keep a
/// consistent view until they drop it.
#[derive(Debug)]
pub struct Session {
    settings: Arc<MdrSettings>,
    current: RwLock<Arc<IndexStore>>,
}

impl Session {
    /// Session serving `root`.
    pub fn new(root: impl Into<PathBuf>, settings: MdrSettings) -> Self {
        let settings = Arc::new(settings);
        let store = IndexStore::new(root, Arc::clone(&settings));
        Self {
            settings,
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// Store for the active folder.
    pub async fn store(&self) -> Arc<IndexStore> {
        Arc::clone(&*self.current.read().await)
    }

    /// Active folder.
    pub async fn folder(&self) -> PathBuf {
        self.current.read().await.root().to_path_buf()
    }

    /// Serve `root` from now on and return the new store.
    pub async fn switch_folder(&self, root: impl Into<PathBuf>) -> Arc<IndexStore> {
        let store = Arc::new(IndexStore::new(root, Arc::clone(&self.settings)));
        let mut current = self.current.write().await;
        tracing::info!(
            from = %current.root().display(),
            to = %store.root().display(),
            "switching folder"
        );
        *current = Arc::clone(&store);
        store
    }
}
