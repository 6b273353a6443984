use std::collections::{HashMap, HashSet};

use crate::catalog::{FileEntry, collapse_segments, normalize_slashes, parent_dir_of};

const NOTE_SUFFIX: &str = ".md";

/// Maps raw link targets onto catalog ids.
///
/// Resolution order: exact id, then bare file name (first catalog entry
/// wins on duplicates), then relative to the linking note's directory.
/// Targets without `.md` get one retry with the suffix appended.
pub(crate) struct LinkResolver<'a> {
    ids: HashSet<&'a str>,
    by_name: HashMap<&'a str, &'a str>,
}

impl<'a> LinkResolver<'a> {
    pub(crate) fn new(files: &'a [FileEntry]) -> Self {
        let mut by_name: HashMap<&'a str, &'a str> = HashMap::new();
        for file in files {
            by_name.entry(file.name.as_str()).or_insert(file.id.as_str());
        }
        Self {
            ids: files.iter().map(|file| file.id.as_str()).collect(),
            by_name,
        }
    }

    pub(crate) fn resolve(&self, target_raw: &str, from_id: &str) -> Option<&'a str> {
        let target = normalize_slashes(target_raw.trim());
        if target.is_empty() {
            return None;
        }
        if let Some(found) = self.resolve_exact(&target, from_id) {
            return Some(found);
        }
        if target.ends_with(NOTE_SUFFIX) {
            None
        } else {
            self.resolve_exact(&format!("{target}{NOTE_SUFFIX}"), from_id)
        }
    }

    fn resolve_exact(&self, target: &str, from_id: &str) -> Option<&'a str> {
        if let Some(id) = self.ids.get(target) {
            return Some(*id);
        }
        let file_name = target.rsplit('/').next().unwrap_or(target);
        if let Some(id) = self.by_name.get(file_name) {
            return Some(*id);
        }
        let dir = parent_dir_of(from_id);
        let joined = if dir.is_empty() {
            target.to_string()
        } else {
            format!("{dir}/{target}")
        };
        let relative = collapse_segments(&joined)?;
        self.ids.get(relative.as_str()).copied()
    }
}
