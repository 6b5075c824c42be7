/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Task board items and their links into the memory graph.
//!
//! Tasks live beside the graph, not inside it: a task cites nodes through
//! `memory_refs`, a soft by-id association. Deleting a node does NOT touch
//! the tasks that cite it; dangling refs are filtered at read time by
//! [`Task::live_memory_refs`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::{MemoryGraph, now_ms};
use crate::persistence::types::{PersistedTask, PersistedTeamMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A unit of project work. Attach order of `memory_refs` is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub owner: Option<String>,
    /// Free-form pipeline stage label, dashboard-defined.
    pub stage: String,
    pub blocked: bool,
    pub acceptance: Vec<String>,
    pub memory_refs: Vec<Uuid>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            owner: None,
            stage: String::new(),
            blocked: false,
            acceptance: Vec::new(),
            memory_refs: Vec::new(),
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    /// Cite a node from this task. Idempotent: returns false when the ref
    /// is already present and changes nothing.
    pub fn attach_memory(&mut self, node_id: Uuid) -> bool {
        if self.memory_refs.contains(&node_id) {
            return false;
        }
        self.memory_refs.push(node_id);
        self.updated_at_ms = now_ms();
        true
    }

    /// Drop a citation. Returns false when it was not present.
    pub fn detach_memory(&mut self, node_id: Uuid) -> bool {
        let before = self.memory_refs.len();
        self.memory_refs.retain(|id| *id != node_id);
        if self.memory_refs.len() == before {
            return false;
        }
        self.updated_at_ms = now_ms();
        true
    }

    /// Refs that still resolve against the project's graph, in attach
    /// order. Dangling ids are skipped, never surfaced.
    pub fn live_memory_refs<'a>(
        &'a self,
        graph: &'a MemoryGraph,
    ) -> impl Iterator<Item = Uuid> + 'a {
        self.memory_refs
            .iter()
            .copied()
            .filter(|id| graph.contains_node(*id))
    }

    pub(crate) fn to_persisted(&self) -> PersistedTask {
        PersistedTask {
            task_id: self.id.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
            owner: self.owner.clone(),
            stage: self.stage.clone(),
            blocked: self.blocked,
            acceptance: self.acceptance.clone(),
            memory_refs: self.memory_refs.iter().map(Uuid::to_string).collect(),
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms,
        }
    }

    /// Restore from a persisted record. A task whose own id fails to parse
    /// is dropped; individual malformed refs are skipped.
    pub(crate) fn from_persisted(record: &PersistedTask) -> Option<Self> {
        let id = Uuid::parse_str(&record.task_id).ok()?;
        Some(Self {
            id,
            title: record.title.clone(),
            description: record.description.clone(),
            status: record.status,
            priority: record.priority,
            owner: record.owner.clone(),
            stage: record.stage.clone(),
            blocked: record.blocked,
            acceptance: record.acceptance.clone(),
            memory_refs: record
                .memory_refs
                .iter()
                .filter_map(|raw| Uuid::parse_str(raw).ok())
                .collect(),
            created_at_ms: record.created_at_ms,
            updated_at_ms: record.updated_at_ms,
        })
    }
}

/// A person on the project roster. Stored per project, referenced from
/// tasks by display name through `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub role: String,
}

impl TeamMember {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role: role.into(),
        }
    }

    pub(crate) fn to_persisted(&self) -> PersistedTeamMember {
        PersistedTeamMember {
            member_id: self.id.to_string(),
            name: self.name.clone(),
            role: self.role.clone(),
        }
    }

    pub(crate) fn from_persisted(record: &PersistedTeamMember) -> Option<Self> {
        let id = Uuid::parse_str(&record.member_id).ok()?;
        Some(Self {
            id,
            name: record.name.clone(),
            role: record.role.clone(),
        })
    }
}
