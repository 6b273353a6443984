//! Integration tests for the index store and folder session.
//!
//! Tests cover:
//! - TTL reuse and expiry
//! - Invalidation through change notifications
//! - Single-flight rebuilds under concurrent queries
//! - Folder switching and single-file mode

use std::fs;
use std::path::Path;
use std::time::Duration;

use futures::future::join_all;
use omni_mdr::{ChangeKind, FileChange, IndexStore, MdrError, MdrSettings, Session};
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn seed_corpus(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&root.join("welcome.md"), "See [[getting-started]] for setup.")?;
    write_file(&root.join("getting-started.md"), "# Getting Started")?;
    Ok(())
}

#[tokio::test]
async fn test_queries_reuse_fresh_snapshots() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path())?;
    let store = IndexStore::new(tmp.path(), MdrSettings::default());

    assert_eq!(store.files().await?.len(), 2);
    store.backlinks("getting-started.md").await?;
    store.backlinks("welcome.md").await?;
    store.search("getting", None).await?;
    store.graph().await?;

    let stats = store.stats();
    assert_eq!(stats.catalog_builds, 1);
    assert_eq!(stats.backlink_builds, 1);
    assert_eq!(stats.search_builds, 1);
    Ok(())
}

#[tokio::test]
async fn test_zero_ttl_rebuilds_every_query() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path())?;
    let settings = MdrSettings {
        cache_ttl: Duration::ZERO,
        ..MdrSettings::default()
    };
    let store = IndexStore::new(tmp.path(), settings);

    store.files().await?;
    store.files().await?;
    assert_eq!(store.stats().catalog_builds, 2);
    Ok(())
}

#[tokio::test]
async fn test_notify_invalidates_and_picks_up_new_links() -> Result<(), Box<dyn std::error::Error>>
{
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path())?;
    let store = IndexStore::new(tmp.path(), MdrSettings::default());

    let before = store.backlinks("getting-started.md").await?;
    assert_eq!(before.linked_from.len(), 1);

    write_file(&tmp.path().join("later.md"), "Also read [[getting-started]].")?;
    // Still cached until someone says the folder changed.
    assert_eq!(
        store.backlinks("getting-started.md").await?.linked_from.len(),
        1
    );

    assert!(store.notify(&FileChange::new(ChangeKind::Added, "later.md")));
    let after = store.backlinks("getting-started.md").await?;
    let sources: Vec<&str> = after
        .linked_from
        .iter()
        .map(|r| r.file_id.as_str())
        .collect();
    assert_eq!(sources, vec!["later.md", "welcome.md"]);
    assert_eq!(store.stats().backlink_builds, 2);
    assert_eq!(store.stats().catalog_builds, 2);
    Ok(())
}

#[tokio::test]
async fn test_non_note_changes_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path())?;
    let store = IndexStore::new(tmp.path(), MdrSettings::default());

    store.files().await?;
    assert!(!store.notify(&FileChange::new(ChangeKind::Modified, "assets/logo.png")));
    store.files().await?;
    assert_eq!(store.stats().catalog_builds, 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_queries_share_one_build() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path())?;
    for n in 0..20 {
        write_file(
            &tmp.path().join(format!("extra/note-{n}.md")),
            "Links to [[welcome]].",
        )?;
    }
    let store = IndexStore::new(tmp.path(), MdrSettings::default());

    let queries = (0..8).map(|_| store.backlinks("welcome.md"));
    for result in join_all(queries).await {
        assert_eq!(result?.linked_from.len(), 20);
    }

    let stats = store.stats();
    assert_eq!(stats.catalog_builds, 1);
    assert_eq!(stats.backlink_builds, 1);
    Ok(())
}

#[tokio::test]
async fn test_single_file_root_serves_only_that_note() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path())?;
    let store = IndexStore::new(tmp.path().join("welcome.md"), MdrSettings::default());

    let ids: Vec<String> = store.files().await?.iter().map(|f| f.id.clone()).collect();
    assert_eq!(ids, vec!["welcome.md".to_string()]);
    assert!(matches!(
        store.read("getting-started.md").await,
        Err(MdrError::NotFound(_))
    ));
    // The target is outside the catalog, so the link does not resolve.
    assert!(store.backlinks("welcome.md").await?.links_to.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_outline_and_preview_read_through_the_store() -> Result<(), Box<dyn std::error::Error>>
{
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("guide.md"),
        "# Guide\n\nSome **intro** text.\n\n## Install\n",
    )?;
    let store = IndexStore::new(tmp.path(), MdrSettings::default());

    let outline = store.outline("guide.md").await?;
    let slugs: Vec<&str> = outline.iter().map(|h| h.slug.as_str()).collect();
    assert_eq!(slugs, vec!["guide", "install"]);
    assert_eq!(store.preview("guide.md", 120).await?, "Guide Some intro text. Install");
    assert!(store.search("   ", None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_switch_folder_replaces_every_cache() -> Result<(), Box<dyn std::error::Error>> {
    let first = TempDir::new()?;
    let second = TempDir::new()?;
    write_file(&first.path().join("a.md"), "# A")?;
    write_file(&second.path().join("b.md"), "# B")?;

    let session = Session::new(first.path(), MdrSettings::default());
    let old = session.store().await;
    assert_eq!(old.files().await?[0].id, "a.md");

    let new = session.switch_folder(second.path()).await;
    assert_eq!(session.folder().await, second.path());
    assert_eq!(new.files().await?[0].id, "b.md");
    assert_eq!(session.store().await.stats().catalog_builds, 1);
    assert_eq!(old.files().await?[0].id, "a.md");
    Ok(())
}
