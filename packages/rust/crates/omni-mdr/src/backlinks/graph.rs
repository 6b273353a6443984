use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::BacklinkEdge;
use crate::layout::GraphEdge;

/// A note on the whiteboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteNode {
    /// Note id.
    pub id: String,
    /// Display label (file name).
    pub label: String,
}

/// One directed connection between two notes, merged over all links between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// `source->target`
    pub id: String,
    /// Linking note.
    pub source: String,
    /// Linked note.
    pub target: String,
    /// Text of the first link.
    pub label: String,
    /// Line of the first link.
    pub line_number: u32,
    /// How many links the source has to the target.
    pub weight: usize,
}

/// Folder graph for the whiteboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    /// Every catalog note, catalog order.
    pub nodes: Vec<NoteNode>,
    /// Distinct connections, discovery order.
    pub edges: Vec<Connection>,
}

impl GraphData {
    pub(super) fn from_index(files: &[(String, String)], edges: &[BacklinkEdge]) -> Self {
        let nodes = files
            .iter()
            .map(|(id, name)| NoteNode {
                id: id.clone(),
                label: name.clone(),
            })
            .collect();
        let mut slots: HashMap<(&str, &str), usize> = HashMap::new();
        let mut connections: Vec<Connection> = Vec::new();
        for edge in edges {
            let key = (edge.from.as_str(), edge.to.as_str());
            if let Some(slot) = slots.get(&key) {
                if let Some(existing) = connections.get_mut(*slot) {
                    existing.weight += 1;
                }
                continue;
            }
            slots.insert(key, connections.len());
            connections.push(Connection {
                id: format!("{}->{}", edge.from, edge.to),
                source: edge.from.clone(),
                target: edge.to.clone(),
                label: edge.link_text.clone(),
                line_number: edge.line_number,
                weight: 1,
            });
        }
        Self {
            nodes,
            edges: connections,
        }
    }

    /// Notes connected to `file_id` in either direction, first-seen order.
    #[must_use]
    pub fn connected_files(&self, file_id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for connection in self.connections_of(file_id) {
            let other = if connection.source == file_id {
                connection.target.as_str()
            } else {
                connection.source.as_str()
            };
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }

    /// Connections touching `file_id`.
    #[must_use]
    pub fn connections_of(&self, file_id: &str) -> Vec<&Connection> {
        self.edges
            .iter()
            .filter(|connection| connection.source == file_id || connection.target == file_id)
            .collect()
    }

    /// Total links between two notes, both directions.
    #[must_use]
    pub fn connection_strength(&self, a: &str, b: &str) -> usize {
        self.edges
            .iter()
            .filter(|connection| {
                (connection.source == a && connection.target == b)
                    || (connection.source == b && connection.target == a)
            })
            .map(|connection| connection.weight)
            .sum()
    }

    /// Node ids in catalog order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    /// Edges in the shape the layout engine consumes.
    #[must_use]
    pub fn layout_edges(&self) -> Vec<GraphEdge> {
        self.edges
            .iter()
            .map(|connection| GraphEdge {
                source: connection.source.clone(),
                target: connection.target.clone(),
            })
            .collect()
    }
}
