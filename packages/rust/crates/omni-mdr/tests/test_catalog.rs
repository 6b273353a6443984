//! Integration tests for the file catalog.
//!
//! Tests cover:
//! - Scan filtering (extensions, hidden entries, excluded directories)
//! - Sorting by relative path
//! - Contained reads and their failure modes

use std::fs;
use std::path::Path;

use omni_mdr::{CatalogOptions, FileCatalog, MdrError};
use tempfile::TempDir;

fn write_file(path: &Path, content: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

#[tokio::test]
async fn test_scan_lists_markdown_sorted_and_skips_hidden() -> Result<(), Box<dyn std::error::Error>>
{
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("zeta.md"), b"# Zeta")?;
    write_file(&tmp.path().join("alpha.md"), b"# Alpha")?;
    write_file(&tmp.path().join("guides/setup.md"), b"# Setup")?;
    write_file(&tmp.path().join("guides/diagram.png"), b"\x89PNG")?;
    write_file(&tmp.path().join(".obsidian/workspace.md"), b"hidden")?;
    write_file(&tmp.path().join(".draft.md"), b"hidden")?;
    write_file(&tmp.path().join("node_modules/pkg/README.md"), b"vendored")?;
    write_file(&tmp.path().join("UPPER.MD"), b"# Upper")?;

    let catalog = FileCatalog::new(tmp.path(), CatalogOptions::default());
    let files = catalog.scan().await?;
    let ids: Vec<&str> = files.iter().map(|file| file.id.as_str()).collect();

    assert_eq!(ids, vec!["UPPER.MD", "alpha.md", "guides/setup.md", "zeta.md"]);
    let setup = files
        .iter()
        .find(|file| file.id == "guides/setup.md")
        .ok_or("missing guides/setup.md")?;
    assert_eq!(setup.name, "setup.md");
    assert_eq!(setup.size, 7);
    assert!(setup.absolute_path.ends_with("guides/setup.md"));
    Ok(())
}

#[tokio::test]
async fn test_scan_missing_root_is_empty() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let catalog = FileCatalog::new(tmp.path().join("nope"), CatalogOptions::default());
    assert!(catalog.scan().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_read_returns_content_and_hash() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("hello.md"), b"hello")?;

    let catalog = FileCatalog::new(tmp.path(), CatalogOptions::default());
    let file = catalog.read("hello.md").await?;

    assert_eq!(file.content, "hello");
    assert_eq!(file.metadata.size, 5);
    assert_eq!(
        file.metadata.hash,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    Ok(())
}

#[tokio::test]
async fn test_read_rejects_escape_and_reports_missing() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("notes/a.md"), b"a")?;
    write_file(&tmp.path().join("secret.md"), b"secret")?;

    let catalog = FileCatalog::new(tmp.path().join("notes"), CatalogOptions::default());

    let escaped = catalog.read("../secret.md").await;
    assert!(matches!(escaped, Err(MdrError::PathTraversal(_))));
    let absolute = catalog.read("/etc/passwd").await;
    assert!(matches!(absolute, Err(MdrError::PathTraversal(_))));
    let missing = catalog.read("missing.md").await;
    assert!(matches!(missing, Err(MdrError::NotFound(_))));
    assert_eq!(catalog.read("sub/../a.md").await?.content, "a");
    Ok(())
}

#[tokio::test]
async fn test_read_refuses_binary_and_oversized() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("blob.md"), b"text\0with nul")?;
    write_file(&tmp.path().join("big.md"), &[b'x'; 64])?;

    let options = CatalogOptions {
        max_file_bytes: 32,
        ..CatalogOptions::default()
    };
    let catalog = FileCatalog::new(tmp.path(), options);

    let binary = catalog.read("blob.md").await;
    assert!(matches!(binary, Err(MdrError::BinaryFile(_))));
    let big = catalog.read("big.md").await;
    assert!(matches!(
        big,
        Err(MdrError::TooLarge {
            size: 64,
            limit: 32,
            ..
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_single_file_mode_hides_siblings() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("one.md"), b"one")?;
    write_file(&tmp.path().join("two.md"), b"two")?;

    let options = CatalogOptions {
        single_file: Some("one.md".to_string()),
        ..CatalogOptions::default()
    };
    let catalog = FileCatalog::new(tmp.path(), options);

    let ids: Vec<String> = catalog.scan().await?.into_iter().map(|f| f.id).collect();
    assert_eq!(ids, vec!["one.md".to_string()]);
    assert!(matches!(
        catalog.read("two.md").await,
        Err(MdrError::NotFound(_))
    ));
    Ok(())
}
