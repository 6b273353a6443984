use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::error::{MdrError, Result};

pub(crate) fn normalize_slashes(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Forward-slash path of `path` relative to `root`, or `None` for the root itself.
#[must_use]
pub fn file_id_for(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Last segment of a forward-slash id.
#[must_use]
pub fn file_name_of(file_id: &str) -> &str {
    file_id.rsplit('/').next().unwrap_or(file_id)
}

/// Directory part of a forward-slash id (empty for top-level files).
#[must_use]
pub fn parent_dir_of(file_id: &str) -> &str {
    file_id.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Lexically collapse `.` and `..` segments of a forward-slash path.
///
/// Returns `None` when `..` would climb above the starting point.
#[must_use]
pub fn collapse_segments(raw: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    Some(stack.join("/"))
}

/// Validate a caller-supplied file id and turn it into a path under `root`.
///
/// Absolute ids, drive prefixes and `..` escapes are rejected with
/// [`MdrError::PathTraversal`]. The check is lexical; [`ensure_contained`]
/// repeats it on the canonical path once the file is known to exist.
///
/// # Errors
/// Returns `MdrError::PathTraversal` when the id leaves the root and
/// `MdrError::NotFound` when it is empty.
pub fn resolve_within_root(root: &Path, file_id: &str) -> Result<PathBuf> {
    let normalized = normalize_slashes(file_id);
    if normalized.starts_with('/') || Path::new(file_id).has_root() || has_drive_prefix(&normalized)
    {
        return Err(traversal(file_id));
    }
    let Some(collapsed) = collapse_segments(&normalized) else {
        return Err(traversal(file_id));
    };
    if collapsed.is_empty() {
        return Err(MdrError::NotFound(file_id.to_string()));
    }
    Ok(collapsed
        .split('/')
        .fold(root.to_path_buf(), |acc, part| acc.join(part)))
}

/// Confirm that the canonical form of `candidate` stays inside `root`.
///
/// # Errors
/// Returns `MdrError::PathTraversal` when a symlink leads outside the root.
pub async fn ensure_contained(root: &Path, candidate: &Path, file_id: &str) -> Result<PathBuf> {
    let canonical_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|_| MdrError::NotFound(file_id.to_string()))?;
    let canonical = match tokio::fs::canonicalize(candidate).await {
        Ok(path) => path,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(MdrError::NotFound(file_id.to_string()));
        }
        Err(err) => return Err(MdrError::io(candidate, err)),
    };
    if canonical == canonical_root || canonical.starts_with(&canonical_root) {
        Ok(canonical)
    } else {
        Err(traversal(file_id))
    }
}

fn traversal(file_id: &str) -> MdrError {
    tracing::warn!(
        target: "omni_mdr::security",
        file_id,
        "rejected file id outside root"
    );
    MdrError::PathTraversal(file_id.to_string())
}

fn has_drive_prefix(normalized: &str) -> bool {
    let bytes = normalized.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Whether a directory entry should be pruned from the scan.
pub(super) fn should_skip_dir(
    path: &Path,
    root: &Path,
    excluded_dirs: &HashSet<String>,
) -> bool {
    let Some(relative) = file_id_for(path, root) else {
        return false;
    };
    relative.split('/').any(|component| {
        component.starts_with('.') || excluded_dirs.contains(component.to_lowercase().as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_handles_dots_and_rejects_escape() {
        assert_eq!(collapse_segments("a/./b/../c.md").as_deref(), Some("a/c.md"));
        assert_eq!(collapse_segments("../x.md"), None);
        assert_eq!(collapse_segments("a/../../x.md"), None);
    }

    #[test]
    fn resolve_rejects_absolute_and_parent_ids() {
        let root = Path::new("/notes");
        assert!(matches!(
            resolve_within_root(root, "/etc/passwd"),
            Err(MdrError::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_within_root(root, "../../etc/passwd"),
            Err(MdrError::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_within_root(root, "C:\\Windows\\win.ini"),
            Err(MdrError::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_within_root(root, "sub/../b.md"),
            Ok(path) if path == Path::new("/notes/b.md")
        ));
    }

    #[test]
    fn name_and_parent_split_on_last_slash() {
        assert_eq!(file_name_of("guides/intro.md"), "intro.md");
        assert_eq!(file_name_of("intro.md"), "intro.md");
        assert_eq!(parent_dir_of("guides/deep/intro.md"), "guides/deep");
        assert_eq!(parent_dir_of("intro.md"), "");
    }
}
