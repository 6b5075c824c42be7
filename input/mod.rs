/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pointer interaction for the canvas.
//!
//! Detection and application are split: [`transition`] is a pure function
//! from (state, event) to (next state, intents), and the produced
//! [`CanvasIntent`]s are applied elsewhere against the repository and
//! viewport. Nothing in here mutates the graph.
//!
//! At most one gesture is active at a time. Pointer-up and pointer-leave
//! always return to `Idle`, whatever was in flight.

use euclid::default::{Point2D, Vector2D};
use uuid::Uuid;

use crate::graph::MemoryGraph;
use crate::viewport::Viewport;

/// What the pointer is over, resolved by canvas hit testing before the
/// event reaches the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Background,
    /// Card body: drag target for repositioning.
    Node(Uuid),
    /// Attach grip in the card's top-right corner: reserved for the
    /// native drag-to-task gesture, never starts a reposition drag.
    NodeGrip(Uuid),
    Edge(Uuid),
}

/// Normalized pointer events, screen-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { hit: HitTarget, screen: Point2D<f32> },
    Move { screen: Point2D<f32> },
    Up,
    Leave,
    /// Down+up without significant movement, delivered after `Up`.
    Click { hit: HitTarget },
    Escape,
}

/// Single-slot selection. Selecting an edge deselects any node and
/// vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Node(Uuid),
    Edge(Uuid),
}

/// Requested side effects of a transition, applied by the workspace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasIntent {
    MoveNode { node: Uuid, position: Point2D<f32> },
    PanTo { offset: Vector2D<f32> },
    CreateEdge { source: Uuid, target: Uuid },
    Select(Selection),
    ClearSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PointerState {
    #[default]
    Idle,
    /// Background drag. Offsets are captured at gesture start so the pan
    /// is an absolute function of pointer travel, immune to event loss.
    Panning {
        start_offset: Vector2D<f32>,
        start_pointer: Point2D<f32>,
    },
    /// Card-body drag. `grab_offset` is the world-space vector from the
    /// node's origin to the grab point, so the card never snaps to the
    /// cursor.
    DraggingNode {
        node: Uuid,
        grab_offset: Vector2D<f32>,
    },
    /// Link mode with a source chosen; the next node click completes or
    /// cancels the link.
    Linking { source: Uuid },
}

/// Read-only context a transition may consult.
pub struct TransitionContext<'a> {
    pub viewport: &'a Viewport,
    /// Link-mode toggle is owned by the controller; the FSM only reads it.
    pub link_mode: bool,
    pub node_position: &'a dyn Fn(Uuid) -> Option<Point2D<f32>>,
    pub edge_exists: &'a dyn Fn(Uuid, Uuid) -> bool,
}

/// Pure transition: no mutation, all effects returned as intents.
pub fn transition(
    state: PointerState,
    event: &PointerEvent,
    ctx: &TransitionContext<'_>,
) -> (PointerState, Vec<CanvasIntent>) {
    match (state, event) {
        // Gesture teardown always wins.
        (_, PointerEvent::Up) | (_, PointerEvent::Leave) => {
            // A pending link source survives pointer-up; everything else
            // resets.
            if let PointerState::Linking { source } = state {
                (PointerState::Linking { source }, Vec::new())
            } else {
                (PointerState::Idle, Vec::new())
            }
        },

        (_, PointerEvent::Escape) => (PointerState::Idle, vec![CanvasIntent::ClearSelection]),

        (PointerState::Idle, PointerEvent::Down { hit, screen }) => match hit {
            HitTarget::Background => (
                PointerState::Panning {
                    start_offset: ctx.viewport.offset,
                    start_pointer: *screen,
                },
                Vec::new(),
            ),
            // In link mode a press on a node must stay put so the
            // follow-up click can pick it as an endpoint.
            HitTarget::Node(node) if !ctx.link_mode => {
                match (ctx.node_position)(*node) {
                    Some(position) => {
                        let world = ctx.viewport.screen_to_world(*screen);
                        (
                            PointerState::DraggingNode {
                                node: *node,
                                grab_offset: world - position,
                            },
                            Vec::new(),
                        )
                    },
                    // Node vanished between hit test and event delivery.
                    None => (PointerState::Idle, Vec::new()),
                }
            },
            _ => (PointerState::Idle, Vec::new()),
        },

        (
            PointerState::Panning {
                start_offset,
                start_pointer,
            },
            PointerEvent::Move { screen },
        ) => (
            state,
            vec![CanvasIntent::PanTo {
                offset: start_offset + (*screen - start_pointer),
            }],
        ),

        (PointerState::DraggingNode { node, grab_offset }, PointerEvent::Move { screen }) => (
            state,
            vec![CanvasIntent::MoveNode {
                node,
                position: ctx.viewport.screen_to_world(*screen) - grab_offset,
            }],
        ),

        (PointerState::Idle, PointerEvent::Click { hit }) => match hit {
            HitTarget::Background => (PointerState::Idle, vec![CanvasIntent::ClearSelection]),
            HitTarget::Node(node) | HitTarget::NodeGrip(node) => {
                if ctx.link_mode {
                    (
                        PointerState::Linking { source: *node },
                        vec![CanvasIntent::Select(Selection::Node(*node))],
                    )
                } else {
                    (
                        PointerState::Idle,
                        vec![CanvasIntent::Select(Selection::Node(*node))],
                    )
                }
            },
            HitTarget::Edge(edge) => (
                PointerState::Idle,
                vec![CanvasIntent::Select(Selection::Edge(*edge))],
            ),
        },

        (PointerState::Linking { source }, PointerEvent::Click { hit }) => match hit {
            // Clicking the source again cancels without creating anything;
            // self-links are never produced by this gesture.
            HitTarget::Node(target) | HitTarget::NodeGrip(target) if *target == source => {
                (PointerState::Idle, Vec::new())
            },
            HitTarget::Node(target) | HitTarget::NodeGrip(target) => {
                let intents = if (ctx.edge_exists)(source, *target) {
                    Vec::new()
                } else {
                    vec![CanvasIntent::CreateEdge {
                        source,
                        target: *target,
                    }]
                };
                (PointerState::Idle, intents)
            },
            HitTarget::Background => (PointerState::Idle, vec![CanvasIntent::ClearSelection]),
            HitTarget::Edge(edge) => (
                PointerState::Idle,
                vec![CanvasIntent::Select(Selection::Edge(*edge))],
            ),
        },

        // Moves and downs in any other combination change nothing.
        _ => (state, Vec::new()),
    }
}

/// Owns the FSM state and the link-mode flag, and resolves the context
/// probes against the live graph.
#[derive(Default)]
pub struct InteractionController {
    state: PointerState,
    link_mode: bool,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PointerState {
        self.state
    }

    pub fn link_mode(&self) -> bool {
        self.link_mode
    }

    /// Arm the link gesture; the next node click picks the source.
    pub fn arm_link_mode(&mut self) {
        self.link_mode = true;
    }

    pub fn disarm_link_mode(&mut self) {
        self.link_mode = false;
        if matches!(self.state, PointerState::Linking { .. }) {
            self.state = PointerState::Idle;
        }
    }

    /// Run one event through the FSM. Escape also disarms link mode.
    pub fn handle(
        &mut self,
        event: &PointerEvent,
        viewport: &Viewport,
        graph: &MemoryGraph,
    ) -> Vec<CanvasIntent> {
        let node_position = |id: Uuid| graph.node(id).map(|node| node.position);
        let edge_exists = |source: Uuid, target: Uuid| graph.has_edge(source, target);
        let ctx = TransitionContext {
            viewport,
            link_mode: self.link_mode,
            node_position: &node_position,
            edge_exists: &edge_exists,
        };
        let (next, intents) = transition(self.state, event, &ctx);
        self.state = next;
        if matches!(event, PointerEvent::Escape) {
            self.link_mode = false;
        }
        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ctx_with<'a>(
        viewport: &'a Viewport,
        link_mode: bool,
        node_position: &'a dyn Fn(Uuid) -> Option<Point2D<f32>>,
        edge_exists: &'a dyn Fn(Uuid, Uuid) -> bool,
    ) -> TransitionContext<'a> {
        TransitionContext {
            viewport,
            link_mode,
            node_position,
            edge_exists,
        }
    }

    fn always_at_origin(_: Uuid) -> Option<Point2D<f32>> {
        Some(Point2D::zero())
    }

    fn no_edges(_: Uuid, _: Uuid) -> bool {
        false
    }

    #[test]
    fn test_background_down_starts_pan() {
        let mut vp = Viewport::new();
        vp.set_offset(Vector2D::new(10.0, 20.0));
        let ctx = ctx_with(&vp, false, &always_at_origin, &no_edges);

        let (state, intents) = transition(
            PointerState::Idle,
            &PointerEvent::Down {
                hit: HitTarget::Background,
                screen: Point2D::new(100.0, 100.0),
            },
            &ctx,
        );

        assert!(intents.is_empty());
        assert_eq!(
            state,
            PointerState::Panning {
                start_offset: Vector2D::new(10.0, 20.0),
                start_pointer: Point2D::new(100.0, 100.0),
            }
        );
    }

    #[test]
    fn test_pan_move_emits_absolute_offset() {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, false, &always_at_origin, &no_edges);
        let state = PointerState::Panning {
            start_offset: Vector2D::new(10.0, 20.0),
            start_pointer: Point2D::new(100.0, 100.0),
        };

        let (_, intents) = transition(
            state,
            &PointerEvent::Move {
                screen: Point2D::new(130.0, 90.0),
            },
            &ctx,
        );

        assert_eq!(
            intents,
            vec![CanvasIntent::PanTo {
                offset: Vector2D::new(40.0, 10.0),
            }]
        );
    }

    #[test]
    fn test_node_drag_keeps_grab_offset() {
        // Node at (0,0), scale 1: press at (50,50), move to (120,80)
        // must land the node at (70,30).
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, false, &always_at_origin, &no_edges);
        let node = Uuid::new_v4();

        let (state, _) = transition(
            PointerState::Idle,
            &PointerEvent::Down {
                hit: HitTarget::Node(node),
                screen: Point2D::new(50.0, 50.0),
            },
            &ctx,
        );
        let (_, intents) = transition(
            state,
            &PointerEvent::Move {
                screen: Point2D::new(120.0, 80.0),
            },
            &ctx,
        );

        assert_eq!(
            intents,
            vec![CanvasIntent::MoveNode {
                node,
                position: Point2D::new(70.0, 30.0),
            }]
        );
    }

    #[test]
    fn test_node_drag_respects_zoom() {
        let mut vp = Viewport::new();
        vp.zoom_at(Point2D::zero(), 2.0);
        let position = |_: Uuid| Some(Point2D::new(0.0, 0.0));
        let ctx = ctx_with(&vp, false, &position, &no_edges);
        let node = Uuid::new_v4();

        let (state, _) = transition(
            PointerState::Idle,
            &PointerEvent::Down {
                hit: HitTarget::Node(node),
                screen: Point2D::new(100.0, 100.0),
            },
            &ctx,
        );
        let (_, intents) = transition(
            state,
            &PointerEvent::Move {
                screen: Point2D::new(140.0, 100.0),
            },
            &ctx,
        );

        // 40 screen px at scale 2 is 20 world units.
        assert_eq!(
            intents,
            vec![CanvasIntent::MoveNode {
                node,
                position: Point2D::new(20.0, 0.0),
            }]
        );
    }

    #[test]
    fn test_vanished_node_down_is_noop() {
        let vp = Viewport::new();
        let gone = |_: Uuid| None;
        let ctx = ctx_with(&vp, false, &gone, &no_edges);

        let (state, intents) = transition(
            PointerState::Idle,
            &PointerEvent::Down {
                hit: HitTarget::Node(Uuid::new_v4()),
                screen: Point2D::zero(),
            },
            &ctx,
        );

        assert_eq!(state, PointerState::Idle);
        assert!(intents.is_empty());
    }

    #[test]
    fn test_grip_down_never_starts_reposition() {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, false, &always_at_origin, &no_edges);

        let (state, intents) = transition(
            PointerState::Idle,
            &PointerEvent::Down {
                hit: HitTarget::NodeGrip(Uuid::new_v4()),
                screen: Point2D::zero(),
            },
            &ctx,
        );

        assert_eq!(state, PointerState::Idle);
        assert!(intents.is_empty());
    }

    #[rstest]
    #[case::panning(PointerState::Panning {
        start_offset: Vector2D::zero(),
        start_pointer: Point2D::zero(),
    })]
    #[case::dragging(PointerState::DraggingNode {
        node: Uuid::nil(),
        grab_offset: Vector2D::zero(),
    })]
    fn test_up_and_leave_return_to_idle(#[case] active: PointerState) {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, false, &always_at_origin, &no_edges);

        for event in [PointerEvent::Up, PointerEvent::Leave] {
            let (state, intents) = transition(active, &event, &ctx);
            assert_eq!(state, PointerState::Idle);
            assert!(intents.is_empty());
        }
    }

    #[test]
    fn test_click_selects_node_and_edge() {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, false, &always_at_origin, &no_edges);
        let node = Uuid::new_v4();
        let edge = Uuid::new_v4();

        let (_, intents) = transition(
            PointerState::Idle,
            &PointerEvent::Click {
                hit: HitTarget::Node(node),
            },
            &ctx,
        );
        assert_eq!(intents, vec![CanvasIntent::Select(Selection::Node(node))]);

        let (_, intents) = transition(
            PointerState::Idle,
            &PointerEvent::Click {
                hit: HitTarget::Edge(edge),
            },
            &ctx,
        );
        assert_eq!(intents, vec![CanvasIntent::Select(Selection::Edge(edge))]);
    }

    #[test]
    fn test_background_click_clears_selection() {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, false, &always_at_origin, &no_edges);

        let (_, intents) = transition(
            PointerState::Idle,
            &PointerEvent::Click {
                hit: HitTarget::Background,
            },
            &ctx,
        );
        assert_eq!(intents, vec![CanvasIntent::ClearSelection]);
    }

    #[test]
    fn test_link_mode_two_clicks_create_edge() {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, true, &always_at_origin, &no_edges);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let (state, _) = transition(
            PointerState::Idle,
            &PointerEvent::Click {
                hit: HitTarget::Node(a),
            },
            &ctx,
        );
        assert_eq!(state, PointerState::Linking { source: a });

        let (state, intents) = transition(
            state,
            &PointerEvent::Click {
                hit: HitTarget::Node(b),
            },
            &ctx,
        );
        assert_eq!(state, PointerState::Idle);
        assert_eq!(
            intents,
            vec![CanvasIntent::CreateEdge {
                source: a,
                target: b,
            }]
        );
    }

    #[test]
    fn test_link_mode_duplicate_edge_is_suppressed() {
        let vp = Viewport::new();
        let exists = |_: Uuid, _: Uuid| true;
        let ctx = ctx_with(&vp, true, &always_at_origin, &exists);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let (state, intents) = transition(
            PointerState::Linking { source: a },
            &PointerEvent::Click {
                hit: HitTarget::Node(b),
            },
            &ctx,
        );
        assert_eq!(state, PointerState::Idle);
        assert!(intents.is_empty());
    }

    #[test]
    fn test_link_mode_self_click_cancels() {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, true, &always_at_origin, &no_edges);
        let a = Uuid::new_v4();

        let (state, intents) = transition(
            PointerState::Linking { source: a },
            &PointerEvent::Click {
                hit: HitTarget::Node(a),
            },
            &ctx,
        );
        assert_eq!(state, PointerState::Idle);
        assert!(intents.is_empty());
    }

    #[test]
    fn test_link_source_survives_pointer_up() {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, true, &always_at_origin, &no_edges);
        let a = Uuid::new_v4();

        let (state, _) = transition(PointerState::Linking { source: a }, &PointerEvent::Up, &ctx);
        assert_eq!(state, PointerState::Linking { source: a });
    }

    #[test]
    fn test_escape_resets_and_clears_selection() {
        let vp = Viewport::new();
        let ctx = ctx_with(&vp, true, &always_at_origin, &no_edges);

        let (state, intents) = transition(
            PointerState::Linking {
                source: Uuid::new_v4(),
            },
            &PointerEvent::Escape,
            &ctx,
        );
        assert_eq!(state, PointerState::Idle);
        assert_eq!(intents, vec![CanvasIntent::ClearSelection]);
    }

    #[test]
    fn test_controller_escape_disarms_link_mode() {
        use crate::graph::MemoryGraph;
        let mut controller = InteractionController::new();
        controller.arm_link_mode();

        let graph = MemoryGraph::new();
        let vp = Viewport::new();
        controller.handle(&PointerEvent::Escape, &vp, &graph);

        assert!(!controller.link_mode());
        assert_eq!(controller.state(), PointerState::Idle);
    }

    #[test]
    fn test_controller_drag_against_live_graph() {
        use crate::graph::{MemoryGraph, NodeDraft};
        let mut graph = MemoryGraph::new();
        let node = graph.add_node(NodeDraft::default());

        let mut controller = InteractionController::new();
        let vp = Viewport::new();

        controller.handle(
            &PointerEvent::Down {
                hit: HitTarget::Node(node),
                screen: Point2D::new(50.0, 50.0),
            },
            &vp,
            &graph,
        );
        let intents = controller.handle(
            &PointerEvent::Move {
                screen: Point2D::new(120.0, 80.0),
            },
            &vp,
            &graph,
        );

        assert_eq!(
            intents,
            vec![CanvasIntent::MoveNode {
                node,
                position: Point2D::new(70.0, 30.0),
            }]
        );
    }
}
