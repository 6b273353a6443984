//! Force-directed whiteboard layout.
//!
//! [`LayoutState`] is plain data. [`LayoutState::simulate`] returns a new
//! state and never mutates the input, so a resize or rebuild can reuse a
//! snapshot safely.

mod positions;

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use positions::{PositionStore, folder_key};

/// Pairs closer than this get the full inverse-square push.
pub const MIN_DISTANCE: f64 = 250.0;
/// Repulsion is ignored beyond `MIN_DISTANCE * REPULSION_CUTOFF_FACTOR`.
pub const REPULSION_CUTOFF_FACTOR: f64 = 3.0;
/// Rest length of an edge spring.
pub const TARGET_LINK_DISTANCE: f64 = 200.0;
/// Nodes are clamped to `[BOUNDS_PADDING, dimension - BOUNDS_PADDING]`.
pub const BOUNDS_PADDING: f64 = 50.0;
/// Margin for random initial placement.
pub const SPAWN_PADDING: f64 = 100.0;
/// Canvases smaller than this in either dimension get the grid layout.
pub const GRID_MIN_CANVAS: f64 = 100.0;
/// Grid cell width (card width plus gap).
pub const GRID_CELL_WIDTH: f64 = 320.0;
/// Grid cell height (card height plus gap).
pub const GRID_CELL_HEIGHT: f64 = 200.0;
/// Offset of the first grid cell.
pub const GRID_ORIGIN: f64 = 100.0;
/// Steps run once edges are known.
pub const DEFAULT_ITERATIONS: usize = 100;

const WHITEBOARD_MIN_WIDTH: f64 = 800.0;
const WHITEBOARD_MIN_HEIGHT: f64 = 600.0;

/// Simulation constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceParams {
    /// Spring constant for edges.
    pub link_strength: f64,
    /// Repulsion strength between node pairs.
    pub repulsion: f64,
    /// Pull toward the canvas center.
    pub center_gravity: f64,
    /// Velocity multiplier per step, below 1.
    pub damping: f64,
    /// Speed cap per step.
    pub max_velocity: f64,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            link_strength: 0.1,
            repulsion: 400.0,
            center_gravity: 0.02,
            damping: 0.8,
            max_velocity: 5.0,
        }
    }
}

impl ForceParams {
    /// Softer springs and slower motion used by the whiteboard view.
    #[must_use]
    pub fn whiteboard() -> Self {
        Self {
            link_strength: 0.08,
            damping: 0.85,
            max_velocity: 4.0,
            ..Self::default()
        }
    }
}

/// Drawing surface size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    /// Width in layout units.
    pub width: f64,
    /// Height in layout units.
    pub height: f64,
}

impl Canvas {
    /// Canvas of the given size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Canvas for a viewport, never smaller than 800x600.
    #[must_use]
    pub fn for_viewport(width: f64, height: f64) -> Self {
        Self::new(width.max(WHITEBOARD_MIN_WIDTH), height.max(WHITEBOARD_MIN_HEIGHT))
    }

    fn uses_grid(self) -> bool {
        self.width < GRID_MIN_CANVAS || self.height < GRID_MIN_CANVAS
    }

    fn center(self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

/// Saved or reported coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// `FileId -> {x, y}`, serialized as a JSON object.
pub type PositionMap = BTreeMap<String, Position>;

/// One simulated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Note id.
    pub id: String,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Horizontal velocity.
    pub vx: f64,
    /// Vertical velocity.
    pub vy: f64,
}

/// Spring between two nodes; physics treats it as undirected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Linking note.
    pub source: String,
    /// Linked note.
    pub target: String,
}

/// Nodes, edges and constants of one layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutState {
    canvas: Canvas,
    params: ForceParams,
    nodes: Vec<GraphNode>,
    pinned: Vec<bool>,
    index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
}

impl LayoutState {
    /// Seed positions with the thread RNG. See [`LayoutState::init_with_rng`].
    #[must_use]
    pub fn init(node_ids: &[String], canvas: Canvas, saved: Option<&PositionMap>) -> Self {
        Self::init_with_rng(node_ids, canvas, saved, &mut rand::thread_rng())
    }

    /// Seed one node per distinct id.
    ///
    /// Saved positions win and stay anchored through simulation. Otherwise
    /// a degenerate canvas gets a grid and a normal one gets uniform random
    /// placement inside the spawn margin.
    #[must_use]
    pub fn init_with_rng<R: Rng>(
        node_ids: &[String],
        canvas: Canvas,
        saved: Option<&PositionMap>,
        rng: &mut R,
    ) -> Self {
        let mut state = Self {
            canvas,
            params: ForceParams::default(),
            nodes: Vec::with_capacity(node_ids.len()),
            pinned: Vec::with_capacity(node_ids.len()),
            index: HashMap::with_capacity(node_ids.len()),
            edges: Vec::new(),
        };
        let columns = grid_columns(node_ids.len());
        for (slot, id) in node_ids.iter().enumerate() {
            if state.index.contains_key(id) {
                continue;
            }
            let saved_position = saved.and_then(|positions| positions.get(id));
            let (x, y) = match saved_position {
                Some(position) => (position.x, position.y),
                None if canvas.uses_grid() => grid_position(slot, columns),
                None => random_position(canvas, rng),
            };
            state.index.insert(id.clone(), state.nodes.len());
            state.pinned.push(saved_position.is_some());
            state.nodes.push(GraphNode {
                id: id.clone(),
                x,
                y,
                vx: 0.0,
                vy: 0.0,
            });
        }
        state
    }

    /// Replace the force constants.
    #[must_use]
    pub fn with_params(mut self, params: ForceParams) -> Self {
        self.params = params;
        self
    }

    /// Replace the edge set.
    pub fn set_edges(&mut self, edges: Vec<GraphEdge>) {
        self.edges = edges;
    }

    /// Run `iterations` physics steps on a copy. Anchored nodes keep their place.
    ///
    /// Every node ends inside `[padding, dimension - padding]`, anchored ones
    /// included: a saved or dragged position off the canvas is pulled onto its
    /// edge. [`LayoutState::init`] itself never clamps.
    #[must_use]
    pub fn simulate(&self, iterations: usize) -> Self {
        let mut next = self.clone();
        for _ in 0..iterations {
            let moved = step(
                &next.nodes,
                &next.edges,
                &next.index,
                next.canvas,
                &next.params,
            );
            next.nodes = moved
                .into_iter()
                .zip(next.nodes.iter().zip(&next.pinned))
                .map(|(moved, (before, pinned))| {
                    if *pinned {
                        GraphNode {
                            id: before.id.clone(),
                            x: clamp_axis(before.x, next.canvas.width),
                            y: clamp_axis(before.y, next.canvas.height),
                            vx: 0.0,
                            vy: 0.0,
                        }
                    } else {
                        moved
                    }
                })
                .collect();
        }
        next
    }

    /// Current coordinates of every node.
    #[must_use]
    pub fn positions(&self) -> PositionMap {
        self.nodes
            .iter()
            .map(|node| (node.id.clone(), Position { x: node.x, y: node.y }))
            .collect()
    }

    /// Move one node by hand and anchor it. Returns `false` for unknown ids.
    pub fn set_node_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        let Some(&slot) = self.index.get(id) else {
            return false;
        };
        let Some(node) = self.nodes.get_mut(slot) else {
            return false;
        };
        node.x = x;
        node.y = y;
        node.vx = 0.0;
        node.vy = 0.0;
        if let Some(pinned) = self.pinned.get_mut(slot) {
            *pinned = true;
        }
        true
    }

    /// Whether a node is anchored (saved or dragged).
    #[must_use]
    pub fn is_pinned(&self, id: &str) -> bool {
        self.index
            .get(id)
            .and_then(|slot| self.pinned.get(*slot))
            .copied()
            .unwrap_or(false)
    }

    /// Fresh state at a new size keeping every position, velocities reset.
    #[must_use]
    pub fn resize(&self, canvas: Canvas) -> Self {
        let ids: Vec<String> = self.nodes.iter().map(|node| node.id.clone()).collect();
        let mut next = Self::init(&ids, canvas, Some(&self.positions())).with_params(self.params);
        next.pinned.clone_from(&self.pinned);
        next.set_edges(self.edges.clone());
        next
    }

    /// Nodes in seeding order.
    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Active edges.
    #[must_use]
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Canvas size.
    #[must_use]
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Force constants.
    #[must_use]
    pub fn params(&self) -> ForceParams {
        self.params
    }
}

/// Seed, settle and report positions in one call.
///
/// Simulation only runs when there are edges to pull on; saved positions
/// are applied at seeding.
#[must_use]
pub fn compute_layout(
    node_ids: &[String],
    edges: Vec<GraphEdge>,
    canvas: Canvas,
    saved: Option<&PositionMap>,
    iterations: usize,
) -> PositionMap {
    let mut state = LayoutState::init(node_ids, canvas, saved).with_params(ForceParams::whiteboard());
    let has_edges = !edges.is_empty();
    state.set_edges(edges);
    if has_edges {
        state = state.simulate(iterations);
    }
    state.positions()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn grid_columns(count: usize) -> usize {
    ((count as f64).sqrt().ceil() as usize).max(1)
}

#[allow(clippy::cast_precision_loss)]
fn grid_position(slot: usize, columns: usize) -> (f64, f64) {
    let column = slot % columns;
    let row = slot / columns;
    (
        column as f64 * GRID_CELL_WIDTH + GRID_ORIGIN,
        row as f64 * GRID_CELL_HEIGHT + GRID_ORIGIN,
    )
}

fn random_position<R: Rng>(canvas: Canvas, rng: &mut R) -> (f64, f64) {
    let ux: f64 = rng.gen_range(0.0..1.0);
    let uy: f64 = rng.gen_range(0.0..1.0);
    (
        ux * (canvas.width - 2.0 * SPAWN_PADDING) + SPAWN_PADDING,
        uy * (canvas.height - 2.0 * SPAWN_PADDING) + SPAWN_PADDING,
    )
}

/// One physics step: repulsion, springs, centering, then damped integration.
#[must_use]
pub fn step(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    index: &HashMap<String, usize>,
    canvas: Canvas,
    params: &ForceParams,
) -> Vec<GraphNode> {
    let mut forces = vec![(0.0_f64, 0.0_f64); nodes.len()];
    let cutoff = MIN_DISTANCE * REPULSION_CUTOFF_FACTOR;

    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let dx = nodes[j].x - nodes[i].x;
            let dy = nodes[j].y - nodes[i].y;
            let distance = dx.hypot(dy).max(1.0);
            if distance < cutoff {
                let proximity = (MIN_DISTANCE / distance).min(1.0);
                let force = params.repulsion / (distance * distance) * proximity;
                let fx = dx / distance * force;
                let fy = dy / distance * force;
                forces[i].0 -= fx;
                forces[i].1 -= fy;
                forces[j].0 += fx;
                forces[j].1 += fy;
            }
        }
    }

    for edge in edges {
        let (Some(&a), Some(&b)) = (index.get(&edge.source), index.get(&edge.target)) else {
            continue;
        };
        if a == b {
            continue;
        }
        let dx = nodes[b].x - nodes[a].x;
        let dy = nodes[b].y - nodes[a].y;
        let distance = dx.hypot(dy).max(1.0);
        let force = params.link_strength * (distance - TARGET_LINK_DISTANCE);
        let fx = dx / distance * force;
        let fy = dy / distance * force;
        forces[a].0 += fx;
        forces[a].1 += fy;
        forces[b].0 -= fx;
        forces[b].1 -= fy;
    }

    let (cx, cy) = canvas.center();
    nodes
        .iter()
        .zip(forces)
        .map(|(node, (fx, fy))| {
            let fx = fx + (cx - node.x) * params.center_gravity;
            let fy = fy + (cy - node.y) * params.center_gravity;
            let mut vx = (node.vx + fx) * params.damping;
            let mut vy = (node.vy + fy) * params.damping;
            let speed = vx.hypot(vy);
            if speed > params.max_velocity {
                vx = vx / speed * params.max_velocity;
                vy = vy / speed * params.max_velocity;
            }
            GraphNode {
                id: node.id.clone(),
                x: clamp_axis(node.x + vx, canvas.width),
                y: clamp_axis(node.y + vy, canvas.height),
                vx,
                vy,
            }
        })
        .collect()
}

fn clamp_axis(value: f64, dimension: f64) -> f64 {
    value.min(dimension - BOUNDS_PADDING).max(BOUNDS_PADDING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("n{i}.md")).collect()
    }

    #[test]
    fn tiny_canvas_uses_grid() {
        let state = LayoutState::init(&ids(5), Canvas::new(50.0, 400.0), None);
        let positions = state.positions();
        assert_eq!(positions["n0.md"], Position { x: 100.0, y: 100.0 });
        assert_eq!(positions["n2.md"], Position { x: 740.0, y: 100.0 });
        assert_eq!(positions["n3.md"], Position { x: 100.0, y: 300.0 });
        assert_eq!(positions["n4.md"], Position { x: 420.0, y: 300.0 });
    }

    #[test]
    fn duplicate_ids_seed_one_node() {
        let mut list = ids(2);
        list.push("n0.md".to_string());
        let state = LayoutState::init(&list, Canvas::new(800.0, 600.0), None);
        assert_eq!(state.nodes().len(), 2);
    }

    #[test]
    fn coincident_pair_does_not_produce_nan() {
        let index: HashMap<String, usize> = ids(2)
            .into_iter()
            .enumerate()
            .map(|(slot, id)| (id, slot))
            .collect();
        let nodes: Vec<GraphNode> = ids(2)
            .into_iter()
            .map(|id| GraphNode { id, x: 300.0, y: 300.0, vx: 0.0, vy: 0.0 })
            .collect();
        let next = step(&nodes, &[], &index, Canvas::new(800.0, 600.0), &ForceParams::default());
        assert!(next.iter().all(|node| node.x.is_finite() && node.y.is_finite()));
    }
}
