/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Graph data structures for the project memory workspace.
//!
//! Core structures:
//! - `MemoryGraph`: graph container backed by petgraph::StableGraph
//! - `MemoryNode`: knowledge item with world-space position and metadata
//! - `EdgeLabel`: optional label payload on a directed association
//!
//! Boundary: `GraphRepository` is the sole mutator of persisted state; the
//! mutation methods here are the in-memory half of its write path.

use euclid::default::Point2D;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::persistence::types::{PersistedEdge, PersistedFile, PersistedGraph, PersistedNode};

/// Stable node handle (petgraph NodeIndex — survives other deletions)
pub type NodeKey = NodeIndex;

/// Stable edge handle (petgraph EdgeIndex)
pub type EdgeKey = EdgeIndex;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Kind of knowledge item a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Fact,
    Decision,
    Preference,
    Risk,
    #[default]
    Note,
    Link,
    File,
}

/// Descriptor of an uploaded file attached to a node.
///
/// The blob itself lives in `BlobStore`, keyed by `id`; this is a weak,
/// by-id association with no back-pointer and no ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub id: Uuid,
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub created_at_ms: u64,
}

/// A knowledge item in the memory graph.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryNode {
    /// Stable node identity.
    pub id: Uuid,

    pub title: String,

    /// Free-form body text (may be empty).
    pub content: String,

    pub kind: NodeKind,

    pub tags: BTreeSet<String>,

    pub pinned: bool,

    /// Position in world (graph) space.
    pub position: Point2D<f32>,

    /// Ordered file attachments.
    pub files: Vec<FileRef>,

    /// Nesting back-reference to another node. Not ownership: the parent
    /// does not cascade into its children on deletion.
    pub parent: Option<Uuid>,

    /// Collapsed parents hide their descendants on the canvas.
    pub collapsed: bool,

    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Label payload carried on an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabel {
    pub id: Uuid,
    pub label: Option<String>,
}

/// Read-only view of an edge, resolved to stable node ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEdgeView {
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    pub label: Option<String>,
}

/// Attributes for creating a node. Everything not set falls back to a
/// sensible default; id and timestamps are allocated by the graph.
#[derive(Debug, Clone, Default)]
pub struct NodeDraft {
    pub title: String,
    pub content: String,
    pub kind: NodeKind,
    pub tags: BTreeSet<String>,
    pub pinned: bool,
    pub position: Point2D<f32>,
    pub files: Vec<FileRef>,
    pub parent: Option<Uuid>,
    pub collapsed: bool,
}

/// Partial update merged into an existing node. `None` fields are left
/// untouched; `parent` uses a nested Option so it can be cleared.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub kind: Option<NodeKind>,
    pub tags: Option<BTreeSet<String>>,
    pub pinned: Option<bool>,
    pub position: Option<Point2D<f32>>,
    pub files: Option<Vec<FileRef>>,
    pub parent: Option<Option<Uuid>>,
    pub collapsed: Option<bool>,
}

impl NodePatch {
    pub fn position(position: Point2D<f32>) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }
}

/// In-memory graph backed by petgraph::StableGraph.
#[derive(Clone, Default)]
pub struct MemoryGraph {
    inner: StableGraph<MemoryNode, EdgeLabel, Directed>,

    /// Stable UUID to node mapping.
    id_to_node: HashMap<Uuid, NodeKey>,

    /// Stable UUID to edge mapping.
    id_to_edge: HashMap<Uuid, EdgeKey>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new node from a draft, allocating id and timestamps.
    pub(crate) fn add_node(&mut self, draft: NodeDraft) -> Uuid {
        let now = now_ms();
        self.add_node_inner(Uuid::new_v4(), draft, now, now)
    }

    /// Add a node with pre-existing identity and timestamps (restore path).
    pub(crate) fn add_node_with_id(
        &mut self,
        id: Uuid,
        draft: NodeDraft,
        created_at_ms: u64,
        updated_at_ms: u64,
    ) -> Uuid {
        self.add_node_inner(id, draft, created_at_ms, updated_at_ms)
    }

    fn add_node_inner(
        &mut self,
        id: Uuid,
        draft: NodeDraft,
        created_at_ms: u64,
        updated_at_ms: u64,
    ) -> Uuid {
        let key = self.inner.add_node(MemoryNode {
            id,
            title: draft.title,
            content: draft.content,
            kind: draft.kind,
            tags: draft.tags,
            pinned: draft.pinned,
            position: draft.position,
            files: draft.files,
            parent: draft.parent,
            collapsed: draft.collapsed,
            created_at_ms,
            updated_at_ms,
        });
        self.id_to_node.insert(id, key);
        id
    }

    /// Remove a node, every incident edge, and any child `parent`
    /// back-references pointing at it. Returns false when missing.
    pub(crate) fn remove_node(&mut self, id: Uuid) -> bool {
        let Some(key) = self.id_to_node.get(&id).copied() else {
            return false;
        };

        let incident: Vec<Uuid> = self
            .inner
            .edges_directed(key, Direction::Outgoing)
            .chain(self.inner.edges_directed(key, Direction::Incoming))
            .map(|edge| edge.weight().id)
            .collect();
        for edge_id in incident {
            self.id_to_edge.remove(&edge_id);
        }

        // petgraph drops the incident edges together with the node.
        let removed = self.inner.remove_node(key).is_some();
        if removed {
            self.id_to_node.remove(&id);
            self.clear_parent_references(id);
        }
        removed
    }

    /// Null out `parent` on nodes nested under a deleted node.
    fn clear_parent_references(&mut self, deleted: Uuid) {
        let now = now_ms();
        let orphaned: Vec<NodeKey> = self
            .inner
            .node_indices()
            .filter(|key| self.inner[*key].parent == Some(deleted))
            .collect();
        for key in orphaned {
            let node = &mut self.inner[key];
            node.parent = None;
            node.updated_at_ms = now;
        }
    }

    /// Merge a partial update into a node, stamping `updated_at_ms`.
    /// Returns None when the node does not exist (non-fatal).
    pub(crate) fn update_node(&mut self, id: Uuid, patch: NodePatch) -> Option<&MemoryNode> {
        let key = self.id_to_node.get(&id).copied()?;
        let node = self.inner.node_weight_mut(key)?;

        if let Some(title) = patch.title {
            node.title = title;
        }
        if let Some(content) = patch.content {
            node.content = content;
        }
        if let Some(kind) = patch.kind {
            node.kind = kind;
        }
        if let Some(tags) = patch.tags {
            node.tags = tags;
        }
        if let Some(pinned) = patch.pinned {
            node.pinned = pinned;
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(files) = patch.files {
            node.files = files;
        }
        if let Some(parent) = patch.parent {
            node.parent = parent;
        }
        if let Some(collapsed) = patch.collapsed {
            node.collapsed = collapsed;
        }
        node.updated_at_ms = now_ms();

        self.inner.node_weight(key)
    }

    /// Create an edge between two existing nodes. Duplicate (source, target)
    /// pairs are the caller's responsibility to pre-check with [`has_edge`];
    /// self-loops are permitted here.
    ///
    /// [`has_edge`]: MemoryGraph::has_edge
    pub(crate) fn add_edge(
        &mut self,
        source: Uuid,
        target: Uuid,
        label: Option<String>,
    ) -> Option<MemoryEdgeView> {
        self.add_edge_with_id(Uuid::new_v4(), source, target, label)
    }

    pub(crate) fn add_edge_with_id(
        &mut self,
        id: Uuid,
        source: Uuid,
        target: Uuid,
        label: Option<String>,
    ) -> Option<MemoryEdgeView> {
        let from = self.id_to_node.get(&source).copied()?;
        let to = self.id_to_node.get(&target).copied()?;
        let key = self.inner.add_edge(
            from,
            to,
            EdgeLabel {
                id,
                label: label.clone(),
            },
        );
        self.id_to_edge.insert(id, key);
        Some(MemoryEdgeView {
            id,
            source,
            target,
            label,
        })
    }

    /// Whether a directed edge with the exact (source, target) pair exists.
    pub fn has_edge(&self, source: Uuid, target: Uuid) -> bool {
        let (Some(from), Some(to)) = (
            self.id_to_node.get(&source).copied(),
            self.id_to_node.get(&target).copied(),
        ) else {
            return false;
        };
        self.inner.find_edge(from, to).is_some()
    }

    pub fn edge(&self, id: Uuid) -> Option<MemoryEdgeView> {
        let key = self.id_to_edge.get(&id).copied()?;
        self.edge_view(key)
    }

    /// Replace an edge's label. Returns None when missing.
    pub(crate) fn update_edge(
        &mut self,
        id: Uuid,
        label: Option<String>,
    ) -> Option<MemoryEdgeView> {
        let key = self.id_to_edge.get(&id).copied()?;
        self.inner.edge_weight_mut(key)?.label = label;
        self.edge_view(key)
    }

    pub(crate) fn remove_edge(&mut self, id: Uuid) -> bool {
        let Some(key) = self.id_to_edge.remove(&id) else {
            return false;
        };
        self.inner.remove_edge(key).is_some()
    }

    pub fn node(&self, id: Uuid) -> Option<&MemoryNode> {
        let key = self.id_to_node.get(&id).copied()?;
        self.inner.node_weight(key)
    }

    pub(crate) fn node_mut(&mut self, id: Uuid) -> Option<&mut MemoryNode> {
        let key = self.id_to_node.get(&id).copied()?;
        self.inner.node_weight_mut(key)
    }

    pub fn contains_node(&self, id: Uuid) -> bool {
        self.id_to_node.contains_key(&id)
    }

    /// Iterate nodes in stable index order.
    pub fn nodes(&self) -> impl Iterator<Item = &MemoryNode> {
        self.inner.node_indices().map(|key| &self.inner[key])
    }

    pub fn node_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.nodes().map(|node| node.id)
    }

    pub fn edges(&self) -> impl Iterator<Item = MemoryEdgeView> + '_ {
        self.inner.edge_references().map(|edge| MemoryEdgeView {
            id: edge.weight().id,
            source: self.inner[edge.source()].id,
            target: self.inner[edge.target()].id,
            label: edge.weight().label.clone(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Whether a node is hidden because some ancestor is collapsed.
    /// Tolerates dangling and cyclic parent chains.
    pub fn hidden_by_collapse(&self, id: Uuid) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = self.node(id).and_then(|node| node.parent);
        while let Some(parent_id) = cursor {
            if !visited.insert(parent_id) {
                return false;
            }
            let Some(parent) = self.node(parent_id) else {
                return false;
            };
            if parent.collapsed {
                return true;
            }
            cursor = parent.parent;
        }
        false
    }

    fn edge_view(&self, key: EdgeKey) -> Option<MemoryEdgeView> {
        let (from, to) = self.inner.edge_endpoints(key)?;
        let payload = self.inner.edge_weight(key)?;
        Some(MemoryEdgeView {
            id: payload.id,
            source: self.inner[from].id,
            target: self.inner[to].id,
            label: payload.label.clone(),
        })
    }

    /// Serialize the graph to a persistable aggregate.
    pub fn to_snapshot(&self) -> PersistedGraph {
        let nodes = self
            .nodes()
            .map(|node| PersistedNode {
                node_id: node.id.to_string(),
                title: node.title.clone(),
                content: node.content.clone(),
                kind: node.kind,
                tags: node.tags.iter().cloned().collect(),
                pinned: node.pinned,
                position_x: node.position.x,
                position_y: node.position.y,
                files: node
                    .files
                    .iter()
                    .map(|file| PersistedFile {
                        file_id: file.id.to_string(),
                        name: file.name.clone(),
                        mime: file.mime.clone(),
                        size: file.size,
                        created_at_ms: file.created_at_ms,
                    })
                    .collect(),
                parent_id: node.parent.map(|parent| parent.to_string()),
                collapsed: node.collapsed,
                created_at_ms: node.created_at_ms,
                updated_at_ms: node.updated_at_ms,
            })
            .collect();

        let edges = self
            .edges()
            .map(|edge| PersistedEdge {
                edge_id: edge.id.to_string(),
                source: edge.source.to_string(),
                target: edge.target.to_string(),
                label: edge.label,
            })
            .collect();

        PersistedGraph { nodes, edges }
    }

    /// Rebuild a graph from a persisted aggregate. Records that fail to
    /// parse, and edges whose endpoints are gone, are silently dropped.
    pub fn from_snapshot(snapshot: &PersistedGraph) -> Self {
        let mut graph = MemoryGraph::new();

        for pnode in &snapshot.nodes {
            let Ok(node_id) = Uuid::parse_str(&pnode.node_id) else {
                continue;
            };
            let files = pnode
                .files
                .iter()
                .filter_map(|file| {
                    let id = Uuid::parse_str(&file.file_id).ok()?;
                    Some(FileRef {
                        id,
                        name: file.name.clone(),
                        mime: file.mime.clone(),
                        size: file.size,
                        created_at_ms: file.created_at_ms,
                    })
                })
                .collect();
            let parent = pnode
                .parent_id
                .as_deref()
                .and_then(|raw| Uuid::parse_str(raw).ok());
            graph.add_node_with_id(
                node_id,
                NodeDraft {
                    title: pnode.title.clone(),
                    content: pnode.content.clone(),
                    kind: pnode.kind,
                    tags: pnode.tags.iter().cloned().collect(),
                    pinned: pnode.pinned,
                    position: Point2D::new(pnode.position_x, pnode.position_y),
                    files,
                    parent,
                    collapsed: pnode.collapsed,
                },
                pnode.created_at_ms,
                pnode.updated_at_ms,
            );
        }

        for pedge in &snapshot.edges {
            let Ok(edge_id) = Uuid::parse_str(&pedge.edge_id) else {
                continue;
            };
            let source = Uuid::parse_str(&pedge.source).ok();
            let target = Uuid::parse_str(&pedge.target).ok();
            if let (Some(source), Some(target)) = (source, target) {
                let _ = graph.add_edge_with_id(edge_id, source, target, pedge.label.clone());
            }
        }

        graph
    }
}
