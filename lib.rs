/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Memoboard: an interactive memory-graph workspace for project
//! dashboards.
//!
//! Knowledge items live as positioned cards on a pannable, zoomable
//! canvas; tasks cite them by id; everything persists as per-project JSON
//! aggregates behind a pluggable key-value store. Rendering is left to
//! the host: this crate derives scenes, it does not draw them.

pub mod app;
pub mod blobstore;
pub mod canvas;
pub mod graph;
pub mod input;
pub mod inspector;
pub mod layout;
pub mod persistence;
pub mod tasks;
pub mod viewport;

pub use app::{Notice, Workspace};
pub use blobstore::{BlobStore, HandleSet};
pub use canvas::{DropOutcome, NODE_CARD_SIZE, NODE_REF_MIME, Scene};
pub use graph::{
    EdgeLabel, FileRef, MemoryEdgeView, MemoryGraph, MemoryNode, NodeDraft, NodeKind, NodePatch,
};
pub use input::{CanvasIntent, HitTarget, InteractionController, PointerEvent, Selection};
pub use inspector::Inspector;
pub use persistence::{EphemeralStore, GraphRepository, KeyValueStore, RedbStore};
pub use tasks::{Task, TaskPriority, TaskStatus, TeamMember};
pub use viewport::Viewport;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
