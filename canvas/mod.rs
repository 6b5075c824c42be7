/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Framework-agnostic canvas: scene derivation, hit testing, the
//! drag-to-task payload codec, and intent application.
//!
//! Nothing here draws. [`derive_scene`] projects the graph through the
//! viewport into screen-space sprites plus minimap data; a rendering host
//! consumes the `Scene` however it likes.

pub mod spatial_index;

use euclid::default::{Box2D, Point2D, Size2D, Vector2D};
use uuid::Uuid;

use crate::graph::{MemoryGraph, NodeKind, NodePatch};
use crate::input::{CanvasIntent, HitTarget, Selection};
use crate::persistence::{GraphRepository, KeyValueStore};
use crate::viewport::Viewport;
use spatial_index::CardSpatialIndex;

/// Fixed card footprint in world units. Hit testing and fit-to-view use
/// this same extent, so what you see is exactly what you can grab.
pub const NODE_CARD_SIZE: Size2D<f32> = Size2D::new(200.0, 150.0);

/// Side of the square attach grip in the card's top-right corner,
/// world units.
pub const GRIP_SIZE: f32 = 24.0;

/// Edge pick tolerance in screen pixels.
const EDGE_HIT_TOLERANCE_PX: f32 = 8.0;

/// MIME type of the drag payload carrying a node reference.
pub const NODE_REF_MIME: &str = "application/x-node-ref";

/// World-space card rectangle for a node at `position` (its top-left).
pub fn node_card_rect(position: Point2D<f32>) -> Box2D<f32> {
    Box2D::new(
        position,
        position + Vector2D::new(NODE_CARD_SIZE.width, NODE_CARD_SIZE.height),
    )
}

/// World-space attach grip inside a card rectangle.
pub fn grip_rect(card: Box2D<f32>) -> Box2D<f32> {
    Box2D::new(
        Point2D::new(card.max.x - GRIP_SIZE, card.min.y),
        Point2D::new(card.max.x, card.min.y + GRIP_SIZE),
    )
}

/// A node card projected to screen space, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSprite {
    pub id: Uuid,
    pub rect: Box2D<f32>,
    pub grip: Box2D<f32>,
    pub title: String,
    pub kind: NodeKind,
    pub pinned: bool,
    pub collapsed: bool,
    pub selected: bool,
    pub file_count: usize,
}

/// An edge projected to screen space, drawn center to center.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSprite {
    pub id: Uuid,
    pub from: Point2D<f32>,
    pub to: Point2D<f32>,
    pub label: Option<String>,
    pub selected: bool,
}

/// Minimap data in world space; the host scales it into its corner
/// widget. `view` is the world rectangle the main viewport shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimap {
    pub bounds: Box2D<f32>,
    pub view: Box2D<f32>,
    pub cards: Vec<Box2D<f32>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub nodes: Vec<NodeSprite>,
    pub edges: Vec<EdgeSprite>,
    /// None when the graph has no visible nodes.
    pub minimap: Option<Minimap>,
}

/// Node ids currently visible: everything not hidden by a collapsed
/// ancestor, in stable graph order.
fn visible_nodes(graph: &MemoryGraph) -> Vec<Uuid> {
    graph
        .node_ids()
        .filter(|id| !graph.hidden_by_collapse(*id))
        .collect()
}

/// Project the graph into screen-space sprites. Nodes hidden by a
/// collapsed ancestor are dropped along with their incident edges.
pub fn derive_scene(
    graph: &MemoryGraph,
    viewport: &Viewport,
    selection: Selection,
    size: Size2D<f32>,
) -> Scene {
    let visible = visible_nodes(graph);

    let mut world_cards = Vec::with_capacity(visible.len());
    let mut nodes = Vec::with_capacity(visible.len());
    for id in &visible {
        let Some(node) = graph.node(*id) else {
            continue;
        };
        let world = node_card_rect(node.position);
        world_cards.push(world);

        let rect = Box2D::new(
            viewport.world_to_screen(world.min),
            viewport.world_to_screen(world.max),
        );
        let world_grip = grip_rect(world);
        nodes.push(NodeSprite {
            id: node.id,
            rect,
            grip: Box2D::new(
                viewport.world_to_screen(world_grip.min),
                viewport.world_to_screen(world_grip.max),
            ),
            title: node.title.clone(),
            kind: node.kind,
            pinned: node.pinned,
            collapsed: node.collapsed,
            selected: selection == Selection::Node(node.id),
            file_count: node.files.len(),
        });
    }

    let edges = graph
        .edges()
        .filter(|edge| visible.contains(&edge.source) && visible.contains(&edge.target))
        .filter_map(|edge| {
            let from = graph.node(edge.source)?;
            let to = graph.node(edge.target)?;
            Some(EdgeSprite {
                id: edge.id,
                from: viewport.world_to_screen(node_card_rect(from.position).center()),
                to: viewport.world_to_screen(node_card_rect(to.position).center()),
                label: edge.label.clone(),
                selected: selection == Selection::Edge(edge.id),
            })
        })
        .collect();

    let minimap = world_cards.split_first().map(|(first, rest)| {
        let bounds = rest.iter().fold(*first, |acc, rect| acc.union(rect));
        Minimap {
            bounds,
            view: viewport.visible_world_rect(size),
            cards: world_cards.clone(),
        }
    });

    Scene {
        nodes,
        edges,
        minimap,
    }
}

/// Distance from `point` to the segment `a`-`b`.
fn segment_distance(point: Point2D<f32>, a: Point2D<f32>, b: Point2D<f32>) -> f32 {
    let ab = b - a;
    let len_sq = ab.square_length();
    if len_sq <= f32::EPSILON {
        return (point - a).length();
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).length()
}

/// Resolve what a screen point is over. Priority: attach grip, then card
/// body, then edge line (within a pixel tolerance), then background.
/// Hidden nodes are never hit.
pub fn hit_test(graph: &MemoryGraph, viewport: &Viewport, screen: Point2D<f32>) -> HitTarget {
    let world = viewport.screen_to_world(screen);
    let visible = visible_nodes(graph);

    let index = CardSpatialIndex::build(visible.iter().filter_map(|id| {
        let node = graph.node(*id)?;
        Some((*id, node_card_rect(node.position)))
    }));
    if let Some(id) = index.card_at_point(world) {
        if let Some(node) = graph.node(id) {
            let card = node_card_rect(node.position);
            if grip_rect(card).contains(world) {
                return HitTarget::NodeGrip(id);
            }
        }
        return HitTarget::Node(id);
    }

    let tolerance = EDGE_HIT_TOLERANCE_PX / viewport.scale;
    let mut best: Option<(Uuid, f32)> = None;
    for edge in graph.edges() {
        if !visible.contains(&edge.source) || !visible.contains(&edge.target) {
            continue;
        }
        let (Some(from), Some(to)) = (graph.node(edge.source), graph.node(edge.target)) else {
            continue;
        };
        let distance = segment_distance(
            world,
            node_card_rect(from.position).center(),
            node_card_rect(to.position).center(),
        );
        if distance <= tolerance && best.is_none_or(|(_, d)| distance < d) {
            best = Some((edge.id, distance));
        }
    }
    match best {
        Some((edge, _)) => HitTarget::Edge(edge),
        None => HitTarget::Background,
    }
}

/// Encode a node reference for a native drag, as `(mime, value)`.
pub fn encode_drag_payload(node: Uuid) -> (&'static str, String) {
    (NODE_REF_MIME, node.to_string())
}

/// Decode a dropped payload. None unless the MIME type matches and the
/// value parses.
pub fn decode_drag_payload(mime: &str, value: &str) -> Option<Uuid> {
    if mime != NODE_REF_MIME {
        return None;
    }
    Uuid::parse_str(value).ok()
}

/// Result of dropping a canvas payload onto a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Attached,
    /// Valid drop, ref already present; surfaces as a transient notice.
    AlreadyAttached,
    /// Foreign or malformed payload, or an unknown task/node. Silent.
    Ignored,
}

/// Accept (or reject) a drop of a dragged payload onto a task.
pub fn accept_task_drop<S: KeyValueStore>(
    repo: &mut GraphRepository<S>,
    project: Uuid,
    task_id: Uuid,
    mime: &str,
    value: &str,
) -> DropOutcome {
    let Some(node_id) = decode_drag_payload(mime, value) else {
        return DropOutcome::Ignored;
    };
    if !repo.graph(project).contains_node(node_id) {
        return DropOutcome::Ignored;
    }
    if !repo.tasks(project).iter().any(|task| task.id == task_id) {
        return DropOutcome::Ignored;
    }
    if repo.attach_memory(project, task_id, node_id) {
        DropOutcome::Attached
    } else {
        DropOutcome::AlreadyAttached
    }
}

/// Apply one intent produced by the interaction FSM.
pub fn apply_intent<S: KeyValueStore>(
    repo: &mut GraphRepository<S>,
    project: Uuid,
    viewport: &mut Viewport,
    selection: &mut Selection,
    intent: CanvasIntent,
) {
    match intent {
        CanvasIntent::MoveNode { node, position } => {
            // None (node vanished mid-drag) is deliberately ignored.
            let _ = repo.update_node(project, node, NodePatch::position(position));
        },
        CanvasIntent::PanTo { offset } => viewport.set_offset(offset),
        CanvasIntent::CreateEdge { source, target } => {
            if !repo.has_edge(project, source, target) {
                let _ = repo.add_edge(project, source, target, None);
            }
        },
        CanvasIntent::Select(next) => *selection = next,
        CanvasIntent::ClearSelection => *selection = Selection::None,
    }
}
