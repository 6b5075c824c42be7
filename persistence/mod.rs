/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Project persistence over a pluggable key-value store.
//!
//! Architecture:
//! - `KeyValueStore`: byte-record store keyed by string; `RedbStore` is the
//!   durable backend, `EphemeralStore` the in-memory one for tests
//! - `GraphRepository`: the sole mutator of project state. Each mutation
//!   updates the in-memory graph first, then writes the whole JSON
//!   aggregate through to the store under the project's key
//!
//! Load failures never panic the workspace: a missing or malformed record
//! is logged and treated as an empty graph / empty task list.

pub mod types;

use log::{debug, warn};
use redb::{ReadableDatabase, ReadableTable};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::graph::{MemoryEdgeView, MemoryGraph, MemoryNode, NodeDraft, NodePatch};
use crate::layout;
use crate::tasks::{Task, TeamMember};
use types::{PersistedGraph, PersistedTask, PersistedTeamMember};

const PROJECT_TABLE: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("projects");

const GRAPH_KEY_PREFIX: &str = "graph:";
const TASKS_KEY_PREFIX: &str = "tasks:";
const TEAM_KEY_PREFIX: &str = "team:";

#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {e}"),
            StoreError::Database(e) => write!(f, "Database error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// String-keyed byte-record store. Implementations are passive: all
/// encoding and cache policy lives in [`GraphRepository`].
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn put(&mut self, key: &str, value: &[u8]);
    fn delete(&mut self, key: &str);
}

/// Durable store over a single redb database file.
pub struct RedbStore {
    db: redb::Database,
}

impl RedbStore {
    /// Open (or create) the store under `base_dir`.
    pub fn open(base_dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&base_dir)
            .map_err(|e| StoreError::Io(format!("Failed to create store dir: {e}")))?;
        let db_path = base_dir.join("memoboard.redb");
        let db = redb::Database::create(&db_path)
            .map_err(|e| StoreError::Database(format!("Failed to open database: {e}")))?;

        // Ensure the table exists so first reads see an empty table
        // instead of a TableDoesNotExist error.
        let txn = db
            .begin_write()
            .map_err(|e| StoreError::Database(format!("Failed to begin write: {e}")))?;
        txn.open_table(PROJECT_TABLE)
            .map_err(|e| StoreError::Database(format!("Failed to open table: {e}")))?;
        txn.commit()
            .map_err(|e| StoreError::Database(format!("Failed to commit: {e}")))?;

        Ok(Self { db })
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let txn = self.db.begin_read().ok()?;
        let table = txn.open_table(PROJECT_TABLE).ok()?;
        let value = table.get(key).ok()??;
        Some(value.value().to_vec())
    }

    fn put(&mut self, key: &str, value: &[u8]) {
        let result = (|| -> Result<(), redb::Error> {
            let txn = self.db.begin_write()?;
            {
                let mut table = txn.open_table(PROJECT_TABLE)?;
                table.insert(key, value)?;
            }
            txn.commit()?;
            Ok(())
        })();
        if let Err(e) = result {
            warn!("Failed to persist record {key}: {e}");
        }
    }

    fn delete(&mut self, key: &str) {
        let result = (|| -> Result<(), redb::Error> {
            let txn = self.db.begin_write()?;
            {
                let mut table = txn.open_table(PROJECT_TABLE)?;
                table.remove(key)?;
            }
            txn.commit()?;
            Ok(())
        })();
        if let Err(e) = result {
            warn!("Failed to delete record {key}: {e}");
        }
    }
}

/// In-memory store for tests and throwaway sessions.
#[derive(Default)]
pub struct EphemeralStore {
    entries: HashMap<String, Vec<u8>>,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for EphemeralStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &[u8]) {
        self.entries.insert(key.to_string(), value.to_vec());
    }

    fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Default on-disk location for the store.
pub fn default_data_dir() -> PathBuf {
    let base = dirs::data_dir().expect("No data directory available");
    base.join("memoboard")
}

fn graph_key(project: Uuid) -> String {
    format!("{GRAPH_KEY_PREFIX}{project}")
}

fn tasks_key(project: Uuid) -> String {
    format!("{TASKS_KEY_PREFIX}{project}")
}

fn team_key(project: Uuid) -> String {
    format!("{TEAM_KEY_PREFIX}{project}")
}

/// Sole mutator of project state.
///
/// Holds one in-memory [`MemoryGraph`] (and task list) per project,
/// populated lazily from the store. Every mutation goes through here:
/// cache first, then the whole aggregate is written through as one JSON
/// record, so the persisted write is always ordered after the in-memory
/// update.
pub struct GraphRepository<S: KeyValueStore> {
    store: S,
    graphs: HashMap<Uuid, MemoryGraph>,
    tasks: HashMap<Uuid, Vec<Task>>,
}

impl<S: KeyValueStore> GraphRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            graphs: HashMap::new(),
            tasks: HashMap::new(),
        }
    }

    /// Load (or return the cached) graph for a project. Malformed records
    /// degrade to an empty graph.
    pub fn graph(&mut self, project: Uuid) -> &MemoryGraph {
        self.ensure_graph(project);
        &self.graphs[&project]
    }

    fn ensure_graph(&mut self, project: Uuid) {
        if self.graphs.contains_key(&project) {
            return;
        }
        let snapshot = self
            .store
            .get(&graph_key(project))
            .and_then(|bytes| match serde_json::from_slice::<PersistedGraph>(&bytes) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    debug!("Discarding malformed graph record for {project}: {e}");
                    None
                },
            })
            .unwrap_or_default();
        self.graphs
            .insert(project, MemoryGraph::from_snapshot(&snapshot));
    }

    fn persist_graph(&mut self, project: Uuid) {
        let Some(graph) = self.graphs.get(&project) else {
            return;
        };
        match serde_json::to_vec(&graph.to_snapshot()) {
            Ok(bytes) => self.store.put(&graph_key(project), &bytes),
            Err(e) => warn!("Failed to encode graph for {project}: {e}"),
        }
    }

    /// Create a node and persist the aggregate. Returns the stored node.
    pub fn add_node(&mut self, project: Uuid, draft: NodeDraft) -> MemoryNode {
        self.ensure_graph(project);
        let node = {
            let graph = self
                .graphs
                .get_mut(&project)
                .expect("graph cache populated by ensure_graph");
            let id = graph.add_node(draft);
            graph.node(id).cloned().expect("node just inserted")
        };
        self.persist_graph(project);
        node
    }

    /// Merge a patch into a node. None when the node does not exist;
    /// nothing is written in that case.
    pub fn update_node(
        &mut self,
        project: Uuid,
        node_id: Uuid,
        patch: NodePatch,
    ) -> Option<MemoryNode> {
        self.ensure_graph(project);
        let updated = self
            .graphs
            .get_mut(&project)?
            .update_node(node_id, patch)
            .cloned();
        if updated.is_some() {
            self.persist_graph(project);
        }
        updated
    }

    /// Delete a node with full cascade (incident edges, child parent
    /// refs). Returns false, writing nothing, when it was already gone.
    pub fn delete_node(&mut self, project: Uuid, node_id: Uuid) -> bool {
        self.ensure_graph(project);
        let removed = self
            .graphs
            .get_mut(&project)
            .is_some_and(|graph| graph.remove_node(node_id));
        if removed {
            self.persist_graph(project);
        }
        removed
    }

    /// Create a directed edge. None when either endpoint is missing.
    /// Duplicate (source, target) pairs are allowed here; interactive
    /// callers pre-check with [`has_edge`].
    ///
    /// [`has_edge`]: GraphRepository::has_edge
    pub fn add_edge(
        &mut self,
        project: Uuid,
        source: Uuid,
        target: Uuid,
        label: Option<String>,
    ) -> Option<MemoryEdgeView> {
        self.ensure_graph(project);
        let edge = self.graphs.get_mut(&project)?.add_edge(source, target, label);
        if edge.is_some() {
            self.persist_graph(project);
        }
        edge
    }

    pub fn has_edge(&mut self, project: Uuid, source: Uuid, target: Uuid) -> bool {
        self.ensure_graph(project);
        self.graphs[&project].has_edge(source, target)
    }

    pub fn update_edge(
        &mut self,
        project: Uuid,
        edge_id: Uuid,
        label: Option<String>,
    ) -> Option<MemoryEdgeView> {
        self.ensure_graph(project);
        let edge = self.graphs.get_mut(&project)?.update_edge(edge_id, label);
        if edge.is_some() {
            self.persist_graph(project);
        }
        edge
    }

    pub fn delete_edge(&mut self, project: Uuid, edge_id: Uuid) -> bool {
        self.ensure_graph(project);
        let removed = self
            .graphs
            .get_mut(&project)
            .is_some_and(|graph| graph.remove_edge(edge_id));
        if removed {
            self.persist_graph(project);
        }
        removed
    }

    /// Reposition every node on a square grid, persisted as one write.
    pub fn auto_layout(&mut self, project: Uuid, spacing: f32) {
        self.ensure_graph(project);
        if let Some(graph) = self.graphs.get_mut(&project) {
            let ids: Vec<Uuid> = graph.node_ids().collect();
            let positions = layout::grid_positions(ids.len(), spacing);
            for (id, position) in ids.into_iter().zip(positions) {
                if let Some(node) = graph.node_mut(id) {
                    node.position = position;
                }
            }
        }
        self.persist_graph(project);
    }

    // --- tasks ---

    fn ensure_tasks(&mut self, project: Uuid) {
        if self.tasks.contains_key(&project) {
            return;
        }
        let records = self
            .store
            .get(&tasks_key(project))
            .and_then(
                |bytes| match serde_json::from_slice::<Vec<PersistedTask>>(&bytes) {
                    Ok(records) => Some(records),
                    Err(e) => {
                        debug!("Discarding malformed task records for {project}: {e}");
                        None
                    },
                },
            )
            .unwrap_or_default();
        let tasks = records.iter().filter_map(Task::from_persisted).collect();
        self.tasks.insert(project, tasks);
    }

    fn persist_tasks(&mut self, project: Uuid) {
        let Some(tasks) = self.tasks.get(&project) else {
            return;
        };
        let records: Vec<PersistedTask> = tasks.iter().map(Task::to_persisted).collect();
        match serde_json::to_vec(&records) {
            Ok(bytes) => self.store.put(&tasks_key(project), &bytes),
            Err(e) => warn!("Failed to encode tasks for {project}: {e}"),
        }
    }

    pub fn tasks(&mut self, project: Uuid) -> &[Task] {
        self.ensure_tasks(project);
        &self.tasks[&project]
    }

    /// Replace the project's task list wholesale.
    pub fn save_tasks(&mut self, project: Uuid, tasks: Vec<Task>) {
        self.tasks.insert(project, tasks);
        self.persist_tasks(project);
    }

    /// Cite a node from a task. False (no write) when the task is missing
    /// or the ref is already attached. The node id is not validated here:
    /// refs are soft, and dangling ones are filtered at read time.
    pub fn attach_memory(&mut self, project: Uuid, task_id: Uuid, node_id: Uuid) -> bool {
        self.ensure_tasks(project);
        let attached = self
            .tasks
            .get_mut(&project)
            .and_then(|tasks| tasks.iter_mut().find(|task| task.id == task_id))
            .is_some_and(|task| task.attach_memory(node_id));
        if attached {
            self.persist_tasks(project);
        }
        attached
    }

    pub fn detach_memory(&mut self, project: Uuid, task_id: Uuid, node_id: Uuid) -> bool {
        self.ensure_tasks(project);
        let detached = self
            .tasks
            .get_mut(&project)
            .and_then(|tasks| tasks.iter_mut().find(|task| task.id == task_id))
            .is_some_and(|task| task.detach_memory(node_id));
        if detached {
            self.persist_tasks(project);
        }
        detached
    }

    pub fn delete_task(&mut self, project: Uuid, task_id: Uuid) -> bool {
        self.ensure_tasks(project);
        let removed = self
            .tasks
            .get_mut(&project)
            .is_some_and(|tasks| {
                let before = tasks.len();
                tasks.retain(|task| task.id != task_id);
                tasks.len() != before
            });
        if removed {
            self.persist_tasks(project);
        }
        removed
    }

    // --- team ---

    pub fn team(&mut self, project: Uuid) -> Vec<TeamMember> {
        self.store
            .get(&team_key(project))
            .and_then(|bytes| {
                match serde_json::from_slice::<Vec<PersistedTeamMember>>(&bytes) {
                    Ok(records) => Some(records),
                    Err(e) => {
                        debug!("Discarding malformed team records for {project}: {e}");
                        None
                    },
                }
            })
            .unwrap_or_default()
            .iter()
            .filter_map(TeamMember::from_persisted)
            .collect()
    }

    pub fn save_team(&mut self, project: Uuid, team: &[TeamMember]) {
        let records: Vec<PersistedTeamMember> =
            team.iter().map(TeamMember::to_persisted).collect();
        match serde_json::to_vec(&records) {
            Ok(bytes) => self.store.put(&team_key(project), &bytes),
            Err(e) => warn!("Failed to encode team for {project}: {e}"),
        }
    }
}
