//! Backlink index: resolved link edges between notes of one folder.
//!
//! Built from a catalog snapshot by extracting every note's references and
//! resolving them onto catalog ids. Unresolved targets are dropped.

mod graph;
mod resolve;

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::catalog::{FileCatalog, FileEntry};
use crate::links::{ExtractOptions, LinkKind, extract_links_with};

pub use graph::{Connection, GraphData, NoteNode};
pub(crate) use resolve::LinkResolver;

/// One resolved reference between two catalog files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinkEdge {
    /// Linking note.
    pub from: String,
    /// Linked note.
    pub to: String,
    /// Visible link text.
    pub link_text: String,
    /// 1-based line in the linking note.
    pub line_number: u32,
    /// Trimmed source line.
    pub context: String,
    /// Syntax used.
    pub kind: LinkKind,
}

/// A note on the other side of an edge, as shown in the backlinks panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinkReference {
    /// Other note id.
    pub file_id: String,
    /// Other note name.
    pub file_name: String,
    /// Text of the first link between the pair.
    pub link_text: String,
    /// Line of the first link between the pair.
    pub line_number: u32,
    /// Context of the first link between the pair.
    pub context: String,
}

/// Incoming and outgoing neighbors of one note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinkInfo {
    /// Notes linking here, one entry per source note.
    pub linked_from: Vec<BacklinkReference>,
    /// Notes linked from here, one entry per target note.
    pub links_to: Vec<BacklinkReference>,
}

/// Resolved link edges for a catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct BacklinkIndex {
    edges: Vec<BacklinkEdge>,
    incoming: HashMap<String, Vec<usize>>,
    outgoing: HashMap<String, Vec<usize>>,
    files: Vec<(String, String)>,
}

impl BacklinkIndex {
    /// Build from already-loaded note bodies. Notes absent from `documents`
    /// contribute no outgoing edges but can still be link targets.
    #[must_use]
    pub fn from_documents<'d>(
        files: &[FileEntry],
        documents: impl IntoIterator<Item = (&'d str, &'d str)>,
        options: ExtractOptions,
    ) -> Self {
        let resolver = LinkResolver::new(files);
        let mut index = Self {
            files: files
                .iter()
                .map(|file| (file.id.clone(), file.name.clone()))
                .collect(),
            ..Self::default()
        };
        for (from_id, content) in documents {
            for reference in extract_links_with(content, options) {
                let Some(to_id) = resolver.resolve(&reference.target_raw, from_id) else {
                    tracing::trace!(from = from_id, target = %reference.target_raw, "unresolved link");
                    continue;
                };
                index.push(BacklinkEdge {
                    from: from_id.to_string(),
                    to: to_id.to_string(),
                    link_text: reference.text,
                    line_number: reference.line_number,
                    context: reference.context_line,
                    kind: reference.kind,
                });
            }
        }
        index
    }

    /// Read every catalog file (at most `concurrency` at once) and build.
    ///
    /// Unreadable notes are logged and skipped.
    pub async fn build(
        catalog: &FileCatalog,
        files: &[FileEntry],
        options: ExtractOptions,
        concurrency: usize,
    ) -> Self {
        let loaded: Vec<(String, String)> = stream::iter(files)
            .map(|file| async move { (file.id.clone(), catalog.read(&file.id).await) })
            .buffered(concurrency.max(1))
            .filter_map(|(id, read)| async move {
                match read {
                    Ok(body) => Some((id, body.content)),
                    Err(err) => {
                        tracing::warn!(file_id = %id, error = %err, "skipping unreadable note");
                        None
                    }
                }
            })
            .collect()
            .await;
        let index = Self::from_documents(
            files,
            loaded.iter().map(|(id, body)| (id.as_str(), body.as_str())),
            options,
        );
        tracing::debug!(
            files = files.len(),
            edges = index.edges.len(),
            "backlink index built"
        );
        index
    }

    fn push(&mut self, edge: BacklinkEdge) {
        let slot = self.edges.len();
        self.incoming.entry(edge.to.clone()).or_default().push(slot);
        self.outgoing.entry(edge.from.clone()).or_default().push(slot);
        self.edges.push(edge);
    }

    /// All edges in discovery order.
    #[must_use]
    pub fn edges(&self) -> &[BacklinkEdge] {
        &self.edges
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether no edge resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Incoming edges of a note, in discovery order.
    pub fn incoming(&self, file_id: &str) -> impl Iterator<Item = &BacklinkEdge> {
        self.slots(&self.incoming, file_id)
    }

    /// Outgoing edges of a note, in discovery order.
    pub fn outgoing(&self, file_id: &str) -> impl Iterator<Item = &BacklinkEdge> {
        self.slots(&self.outgoing, file_id)
    }

    fn slots<'s>(
        &'s self,
        map: &'s HashMap<String, Vec<usize>>,
        file_id: &str,
    ) -> impl Iterator<Item = &'s BacklinkEdge> + 's {
        map.get(file_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|slot| self.edges.get(*slot))
    }

    /// Neighbors of `file_id`, one entry per distinct counterpart.
    ///
    /// The first edge between a pair supplies text, line and context.
    #[must_use]
    pub fn query(&self, file_id: &str) -> BacklinkInfo {
        BacklinkInfo {
            linked_from: self.references(self.incoming(file_id), |edge| &edge.from),
            links_to: self.references(self.outgoing(file_id), |edge| &edge.to),
        }
    }

    fn references<'e>(
        &self,
        edges: impl Iterator<Item = &'e BacklinkEdge>,
        counterpart: impl Fn(&'e BacklinkEdge) -> &'e String,
    ) -> Vec<BacklinkReference> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for edge in edges {
            let other = counterpart(edge);
            if !seen.insert(other.as_str()) {
                continue;
            }
            out.push(BacklinkReference {
                file_id: other.clone(),
                file_name: self.name_of(other),
                link_text: edge.link_text.clone(),
                line_number: edge.line_number,
                context: edge.context.clone(),
            });
        }
        out
    }

    fn name_of(&self, file_id: &str) -> String {
        self.files
            .iter()
            .find(|(id, _)| id == file_id)
            .map_or_else(
                || crate::catalog::file_name_of(file_id).to_string(),
                |(_, name)| name.clone(),
            )
    }

    /// Whole-folder graph: every catalog note as a node, one edge per linked pair.
    #[must_use]
    pub fn graph(&self) -> GraphData {
        GraphData::from_index(&self.files, &self.edges)
    }
}
