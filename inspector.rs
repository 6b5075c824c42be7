/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Node inspector: read-modify-write editing of the selected node.
//!
//! Opening a node snapshots its editable fields into a draft and acquires
//! one blob handle per attachment so previews stay valid while the panel
//! is up. Closing, switching nodes, or dropping the inspector releases
//! the handles; detaching a file releases that file's handles eagerly.
//! Edits only reach the repository through [`Inspector::apply`].

use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::blobstore::{BlobStore, HandleSet};
use crate::graph::{FileRef, MemoryNode, NodeKind, NodePatch};
use crate::persistence::{GraphRepository, KeyValueStore};

/// Editable fields staged in the panel before apply.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    pub title: String,
    pub content: String,
    pub kind: NodeKind,
    pub tags: BTreeSet<String>,
    pub pinned: bool,
}

struct OpenNode {
    node_id: Uuid,
    draft: EditDraft,
    files: Vec<FileRef>,
    handles: HandleSet,
}

pub struct Inspector {
    store: Arc<BlobStore>,
    open: Option<OpenNode>,
}

impl Inspector {
    pub fn new(store: Arc<BlobStore>) -> Self {
        Self { store, open: None }
    }

    /// Open a node for editing. Any previously open node's handles are
    /// released first. False when the node does not exist.
    pub fn open_node<S: KeyValueStore>(
        &mut self,
        repo: &mut GraphRepository<S>,
        project: Uuid,
        node_id: Uuid,
    ) -> bool {
        self.close();
        let Some(node) = repo.graph(project).node(node_id).cloned() else {
            return false;
        };

        let mut handles = HandleSet::new(self.store.clone());
        for file in &node.files {
            handles.acquire(file.id);
        }

        self.open = Some(OpenNode {
            node_id,
            draft: EditDraft {
                title: node.title,
                content: node.content,
                kind: node.kind,
                tags: node.tags,
                pinned: node.pinned,
            },
            files: node.files,
            handles,
        });
        true
    }

    pub fn open_node_id(&self) -> Option<Uuid> {
        self.open.as_ref().map(|open| open.node_id)
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.open.as_ref().map(|open| &open.draft)
    }

    pub fn draft_mut(&mut self) -> Option<&mut EditDraft> {
        self.open.as_mut().map(|open| &mut open.draft)
    }

    /// Attachments of the open node, as staged (apply not required).
    pub fn files(&self) -> &[FileRef] {
        self.open.as_ref().map(|open| open.files.as_slice()).unwrap_or(&[])
    }

    /// Write the staged draft back through the repository. None when
    /// nothing is open or the node vanished underneath the panel.
    pub fn apply<S: KeyValueStore>(
        &mut self,
        repo: &mut GraphRepository<S>,
        project: Uuid,
    ) -> Option<MemoryNode> {
        let open = self.open.as_ref()?;
        repo.update_node(
            project,
            open.node_id,
            NodePatch {
                title: Some(open.draft.title.clone()),
                content: Some(open.draft.content.clone()),
                kind: Some(open.draft.kind),
                tags: Some(open.draft.tags.clone()),
                pinned: Some(open.draft.pinned),
                ..NodePatch::default()
            },
        )
    }

    /// Attach an already-stored file to the open node. Written through
    /// immediately; a handle is acquired for the new attachment.
    pub fn attach_file<S: KeyValueStore>(
        &mut self,
        repo: &mut GraphRepository<S>,
        project: Uuid,
        file: FileRef,
    ) -> bool {
        let Some(open) = self.open.as_mut() else {
            return false;
        };
        if open.files.iter().any(|existing| existing.id == file.id) {
            return false;
        }
        open.handles.acquire(file.id);
        open.files.push(file);

        repo.update_node(
            project,
            open.node_id,
            NodePatch {
                files: Some(open.files.clone()),
                ..NodePatch::default()
            },
        )
        .is_some()
    }

    /// Detach a file from the open node, releasing its handles. The blob
    /// itself is untouched.
    pub fn remove_file<S: KeyValueStore>(
        &mut self,
        repo: &mut GraphRepository<S>,
        project: Uuid,
        file_id: Uuid,
    ) -> bool {
        let Some(open) = self.open.as_mut() else {
            return false;
        };
        let before = open.files.len();
        open.files.retain(|file| file.id != file_id);
        if open.files.len() == before {
            return false;
        }
        open.handles.release_for(file_id);

        repo.update_node(
            project,
            open.node_id,
            NodePatch {
                files: Some(open.files.clone()),
                ..NodePatch::default()
            },
        )
        .is_some()
    }

    /// Relabel an edge. Edge editing is stateless: no draft, no handles.
    pub fn set_edge_label<S: KeyValueStore>(
        &mut self,
        repo: &mut GraphRepository<S>,
        project: Uuid,
        edge_id: Uuid,
        label: Option<String>,
    ) -> bool {
        repo.update_edge(project, edge_id, label).is_some()
    }

    /// Close the panel, releasing all handles.
    pub fn close(&mut self) {
        self.open = None;
    }
}
