/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Persisted record types for the store layer.
//!
//! These are serde mirrors of the runtime structures, serialized as JSON
//! values under per-project keys. Every field carries `#[serde(default)]`
//! so records written by older builds keep loading; unknown fields are
//! ignored by serde's default behavior.

use serde::{Deserialize, Serialize};

use crate::graph::NodeKind;
use crate::tasks::{TaskPriority, TaskStatus};

/// Whole-graph aggregate for one project. Written as a single unit on
/// every mutation; load order is nodes first, then edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedGraph {
    #[serde(default)]
    pub nodes: Vec<PersistedNode>,
    #[serde(default)]
    pub edges: Vec<PersistedEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedNode {
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub position_x: f32,
    #[serde(default)]
    pub position_y: f32,
    #[serde(default)]
    pub files: Vec<PersistedFile>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedFile {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedEdge {
    #[serde(default)]
    pub edge_id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Task board records, persisted per project alongside the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedTask {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub acceptance: Vec<String>,
    /// Node ids this task cites. Dangling ids are tolerated on load and
    /// filtered at read time.
    #[serde(default)]
    pub memory_refs: Vec<String>,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedTeamMember {
    #[serde(default)]
    pub member_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}
