/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Workspace state management.
//!
//! `Workspace` wires one project's repository, viewport, interaction FSM,
//! selection, and inspector together behind the surface a rendering host
//! calls into. Hosts feed it pointer events and drops, pull a `Scene`
//! each frame, and drain notices for transient UI feedback.

use euclid::default::{Point2D, Size2D};
use std::sync::Arc;
use uuid::Uuid;

use crate::blobstore::BlobStore;
use crate::canvas::{self, DropOutcome, NODE_CARD_SIZE, Scene, node_card_rect};
use crate::graph::{FileRef, MemoryNode, NodeDraft, NodeKind};
use crate::input::{CanvasIntent, HitTarget, InteractionController, PointerEvent, Selection};
use crate::inspector::Inspector;
use crate::layout;
use crate::persistence::{EphemeralStore, GraphRepository, KeyValueStore};
use crate::viewport::Viewport;

/// Step applied by the zoom buttons and wheel ticks.
pub const ZOOM_STEP: f32 = 1.2;

/// Padding around content for fit-to-view, world units.
const FIT_PADDING: f32 = 40.0;

/// Transient, non-blocking feedback for the host to toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    MemoryAttached,
    MemoryAlreadyAttached,
    LinkCreated,
    DuplicateLink,
    SelfLinkRejected,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::MemoryAttached => "Memory attached to task",
            Notice::MemoryAlreadyAttached => "Already attached",
            Notice::LinkCreated => "Nodes linked",
            Notice::DuplicateLink => "Already linked",
            Notice::SelfLinkRejected => "Cannot link a node to itself",
        }
    }
}

pub struct Workspace<S: KeyValueStore> {
    repo: GraphRepository<S>,
    project: Uuid,
    viewport: Viewport,
    controller: InteractionController,
    selection: Selection,
    inspector: Inspector,
    notices: Vec<Notice>,
}

impl Workspace<EphemeralStore> {
    /// Throwaway workspace over in-memory stores, for tests.
    pub fn new_for_testing() -> Self {
        let blob_root = std::env::temp_dir().join(format!("memoboard-test-{}", Uuid::new_v4()));
        let blobs =
            Arc::new(BlobStore::open(blob_root).expect("temp dir must be writable in tests"));
        Self::new(EphemeralStore::new(), blobs, Uuid::new_v4())
    }
}

impl<S: KeyValueStore> Workspace<S> {
    pub fn new(store: S, blobs: Arc<BlobStore>, project: Uuid) -> Self {
        Self {
            repo: GraphRepository::new(store),
            project,
            viewport: Viewport::new(),
            controller: InteractionController::new(),
            selection: Selection::None,
            inspector: Inspector::new(blobs),
            notices: Vec::new(),
        }
    }

    pub fn project(&self) -> Uuid {
        self.project
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn repo(&mut self) -> &mut GraphRepository<S> {
        &mut self.repo
    }

    pub fn inspector(&mut self) -> &mut Inspector {
        &mut self.inspector
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Feed one pointer event through the FSM and apply what comes out.
    pub fn pointer_event(&mut self, event: PointerEvent) {
        let intents = {
            let graph = self.repo.graph(self.project);
            self.controller.handle(&event, &self.viewport, graph)
        };
        self.apply_intents(intents);
    }

    pub fn apply_intents(&mut self, intents: Vec<CanvasIntent>) {
        for intent in intents {
            if matches!(intent, CanvasIntent::CreateEdge { .. }) {
                self.notices.push(Notice::LinkCreated);
            }
            canvas::apply_intent(
                &mut self.repo,
                self.project,
                &mut self.viewport,
                &mut self.selection,
                intent,
            );
        }
    }

    /// Derive the current frame's scene.
    pub fn scene(&mut self, size: Size2D<f32>) -> Scene {
        let graph = self.repo.graph(self.project);
        canvas::derive_scene(graph, &self.viewport, self.selection, size)
    }

    /// Resolve what a screen point is over.
    pub fn hit_test(&mut self, screen: Point2D<f32>) -> HitTarget {
        let graph = self.repo.graph(self.project);
        canvas::hit_test(graph, &self.viewport, screen)
    }

    pub fn arm_link_mode(&mut self) {
        self.controller.arm_link_mode();
    }

    pub fn link_mode(&self) -> bool {
        self.controller.link_mode()
    }

    /// Create a node under a screen point (e.g. a double-click) and
    /// select it.
    pub fn create_node_at(&mut self, screen: Point2D<f32>, kind: NodeKind) -> MemoryNode {
        let position = self.viewport.screen_to_world(screen);
        let node = self.repo.add_node(
            self.project,
            NodeDraft {
                title: "Untitled".to_string(),
                kind,
                position,
                ..NodeDraft::default()
            },
        );
        self.selection = Selection::Node(node.id);
        node
    }

    /// Create a file node from an uploaded blob, titled after the file.
    pub fn create_node_from_file(&mut self, screen: Point2D<f32>, file: FileRef) -> MemoryNode {
        let position = self.viewport.screen_to_world(screen);
        let node = self.repo.add_node(
            self.project,
            NodeDraft {
                title: file.name.clone(),
                kind: NodeKind::File,
                position,
                files: vec![file],
                ..NodeDraft::default()
            },
        );
        self.selection = Selection::Node(node.id);
        node
    }

    /// Link two nodes directly (menu path, not the click gesture).
    /// Duplicates and self-links are rejected.
    pub fn link_nodes(&mut self, source: Uuid, target: Uuid) -> bool {
        if source == target {
            self.notices.push(Notice::SelfLinkRejected);
            return false;
        }
        if self.repo.has_edge(self.project, source, target) {
            self.notices.push(Notice::DuplicateLink);
            return false;
        }
        let created = self
            .repo
            .add_edge(self.project, source, target, None)
            .is_some();
        if created {
            self.notices.push(Notice::LinkCreated);
        }
        created
    }

    /// Delete whatever is selected. Node deletion cascades in the
    /// repository; the inspector closes if it was showing the casualty.
    pub fn delete_selection(&mut self) -> bool {
        let deleted = match self.selection {
            Selection::Node(node) => {
                if self.inspector.open_node_id() == Some(node) {
                    self.inspector.close();
                }
                self.repo.delete_node(self.project, node)
            },
            Selection::Edge(edge) => self.repo.delete_edge(self.project, edge),
            Selection::None => false,
        };
        if deleted {
            self.selection = Selection::None;
        }
        deleted
    }

    /// Accept a native drop of a dragged node onto a task.
    pub fn handle_task_drop(&mut self, task_id: Uuid, mime: &str, value: &str) -> DropOutcome {
        let outcome = canvas::accept_task_drop(&mut self.repo, self.project, task_id, mime, value);
        match outcome {
            DropOutcome::Attached => self.notices.push(Notice::MemoryAttached),
            DropOutcome::AlreadyAttached => self.notices.push(Notice::MemoryAlreadyAttached),
            DropOutcome::Ignored => {},
        }
        outcome
    }

    /// Snap every node onto the default grid.
    pub fn auto_layout(&mut self) {
        self.repo.auto_layout(self.project, layout::DEFAULT_SPACING);
    }

    /// Frame all content in a viewport of `size`.
    pub fn fit_to_view(&mut self, size: Size2D<f32>) {
        let bounds: Vec<_> = self
            .repo
            .graph(self.project)
            .nodes()
            .map(|node| node_card_rect(node.position))
            .collect();
        self.viewport.fit_to_bounds(&bounds, size, FIT_PADDING);
    }

    /// Zoom in one step around the viewport center.
    pub fn zoom_in(&mut self, size: Size2D<f32>) {
        self.viewport
            .zoom_at(Point2D::new(size.width / 2.0, size.height / 2.0), ZOOM_STEP);
    }

    pub fn zoom_out(&mut self, size: Size2D<f32>) {
        self.viewport.zoom_at(
            Point2D::new(size.width / 2.0, size.height / 2.0),
            1.0 / ZOOM_STEP,
        );
    }

    pub fn zoom_reset(&mut self) {
        self.viewport.reset();
    }

    /// Escape: cancel the active gesture, clear selection, drop link mode.
    pub fn escape(&mut self) {
        self.pointer_event(PointerEvent::Escape);
    }

    /// World footprint of one card, exposed for host-side layout chrome.
    pub fn card_size() -> Size2D<f32> {
        NODE_CARD_SIZE
    }
}
