//! Integration tests for the folder watcher.
//!
//! Filesystem events arrive asynchronously, so assertions poll the store
//! until the expected snapshot shows up or a deadline passes.

#![cfg(feature = "watch")]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use omni_mdr::{FileChange, IndexStore, MdrSettings, WatcherConfig, watch_folder};
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

async fn wait_for_ids(
    store: &IndexStore,
    expected: &[&str],
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut ids = Vec::new();
    for _ in 0..50 {
        ids = store.files().await?.iter().map(|f| f.id.clone()).collect();
        if ids == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Ok(ids)
}

#[tokio::test]
async fn test_renamed_folder_refreshes_catalog() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("sub/a.md"), "# A")?;
    let store = Arc::new(IndexStore::new(tmp.path(), MdrSettings::default()));
    assert_eq!(wait_for_ids(&store, &["sub/a.md"]).await?, vec!["sub/a.md"]);

    let handle = watch_folder(
        Arc::clone(&store),
        &WatcherConfig::default(),
        None::<fn(&FileChange)>,
    )?;
    fs::rename(tmp.path().join("sub"), tmp.path().join("moved"))?;

    let ids = wait_for_ids(&store, &["moved/a.md"]).await?;
    handle.stop().await;
    assert_eq!(ids, vec!["moved/a.md"]);
    Ok(())
}

#[tokio::test]
async fn test_new_note_reaches_callback_and_catalog() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("a.md"), "# A")?;
    let store = Arc::new(IndexStore::new(tmp.path(), MdrSettings::default()));
    assert_eq!(store.files().await?.len(), 1);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = watch_folder(
        Arc::clone(&store),
        &WatcherConfig::default(),
        Some(move |change: &FileChange| {
            let _ = tx.send(change.file_id.clone());
        }),
    )?;
    write_file(&tmp.path().join("b.md"), "# B")?;

    let seen = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await?;
    let ids = wait_for_ids(&store, &["a.md", "b.md"]).await?;
    handle.stop().await;
    assert_eq!(seen.as_deref(), Some("b.md"));
    assert_eq!(ids, vec!["a.md", "b.md"]);
    Ok(())
}
