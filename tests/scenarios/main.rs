//! End-to-end workspace scenarios, driven through the public surface the
//! way a rendering host would.

use euclid::default::{Point2D, Size2D, Vector2D};
use uuid::Uuid;

use memoboard::canvas::encode_drag_payload;
use memoboard::graph::NodeDraft;
use memoboard::persistence::RedbStore;
use memoboard::{
    CanvasIntent, DropOutcome, GraphRepository, HitTarget, NodeKind, PointerEvent, Selection,
    Task, VERSION, Workspace,
};

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

/// Create two nodes, link them, delete one: the edge goes with it and
/// nothing dangles.
#[test]
fn create_link_delete_cascade_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();

    let a = ws.create_node_at(Point2D::new(100.0, 100.0), NodeKind::Fact).id;
    let b = ws
        .create_node_at(Point2D::new(600.0, 100.0), NodeKind::Decision)
        .id;
    assert!(ws.link_nodes(a, b));

    ws.apply_intents(vec![CanvasIntent::Select(Selection::Node(a))]);
    assert!(ws.delete_selection());

    let graph = ws.repo().graph(project);
    assert!(!graph.contains_node(a));
    assert!(graph.contains_node(b));
    assert_eq!(graph.edge_count(), 0);

    let scene = ws.scene(Size2D::new(800.0, 600.0));
    assert_eq!(scene.nodes.len(), 1);
    assert!(scene.edges.is_empty());
}

/// Drag a card: pointer travel in screen space becomes the same world
/// displacement at identity scale, offset by the grab point.
#[test]
fn drag_repositions_node_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();
    let node = ws.repo().add_node(project, NodeDraft::default()).id; // position (0, 0)

    ws.pointer_event(PointerEvent::Down {
        hit: HitTarget::Node(node),
        screen: Point2D::new(50.0, 50.0),
    });
    ws.pointer_event(PointerEvent::Move {
        screen: Point2D::new(120.0, 80.0),
    });
    ws.pointer_event(PointerEvent::Up);

    assert_eq!(
        ws.repo().graph(project).node(node).unwrap().position,
        Point2D::new(70.0, 30.0)
    );
}

/// Background drag pans; the pan is absolute against the gesture start.
#[test]
fn background_drag_pans_scenario() {
    let mut ws = Workspace::new_for_testing();

    ws.pointer_event(PointerEvent::Down {
        hit: HitTarget::Background,
        screen: Point2D::new(400.0, 300.0),
    });
    ws.pointer_event(PointerEvent::Move {
        screen: Point2D::new(430.0, 280.0),
    });
    ws.pointer_event(PointerEvent::Up);

    assert_eq!(ws.viewport().offset, Vector2D::new(30.0, -20.0));
}

/// Five nodes on the grid: ceil(sqrt(5)) = 3 columns, so index 3 wraps
/// to the second row at (50, 300).
#[test]
fn auto_layout_five_nodes_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();
    let ids: Vec<Uuid> = (0..5)
        .map(|_| ws.repo().add_node(project, NodeDraft::default()).id)
        .collect();

    ws.auto_layout();

    let graph = ws.repo().graph(project);
    assert_eq!(
        graph.node(ids[0]).unwrap().position,
        Point2D::new(50.0, 50.0)
    );
    assert_eq!(
        graph.node(ids[2]).unwrap().position,
        Point2D::new(550.0, 50.0)
    );
    assert_eq!(
        graph.node(ids[3]).unwrap().position,
        Point2D::new(50.0, 300.0)
    );
}

/// Link-mode click-click creates exactly one edge; repeated attempts
/// change nothing.
#[test]
fn link_mode_click_click_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();
    let a = ws.create_node_at(Point2D::new(0.0, 0.0), NodeKind::Note).id;
    let b = ws.create_node_at(Point2D::new(600.0, 0.0), NodeKind::Note).id;

    ws.arm_link_mode();
    ws.pointer_event(PointerEvent::Click {
        hit: HitTarget::Node(a),
    });
    ws.pointer_event(PointerEvent::Click {
        hit: HitTarget::Node(b),
    });

    assert!(ws.repo().has_edge(project, a, b));
    assert_eq!(ws.repo().graph(project).edge_count(), 1);

    // Second pass over the same pair is silently suppressed.
    ws.pointer_event(PointerEvent::Click {
        hit: HitTarget::Node(a),
    });
    ws.pointer_event(PointerEvent::Click {
        hit: HitTarget::Node(b),
    });
    assert_eq!(ws.repo().graph(project).edge_count(), 1);
}

/// Drag a card onto a task: first drop attaches, second reports the
/// duplicate, a foreign payload is ignored outright.
#[test]
fn drag_to_task_attach_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();
    let node = ws.create_node_at(Point2D::new(10.0, 10.0), NodeKind::Fact).id;

    let task = Task::new("review rollout plan");
    let task_id = task.id;
    ws.repo().save_tasks(project, vec![task]);

    let (mime, value) = encode_drag_payload(node);
    assert_eq!(
        ws.handle_task_drop(task_id, mime, &value),
        DropOutcome::Attached
    );
    assert_eq!(
        ws.handle_task_drop(task_id, mime, &value),
        DropOutcome::AlreadyAttached
    );
    assert_eq!(
        ws.handle_task_drop(task_id, "text/plain", "hello"),
        DropOutcome::Ignored
    );

    let tasks = ws.repo().tasks(project);
    assert_eq!(tasks[0].memory_refs, vec![node]);
}

/// Deleting a cited node leaves the task's ref dangling but filtered.
#[test]
fn dangling_memory_ref_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();
    let node = ws.create_node_at(Point2D::zero(), NodeKind::Note).id;

    let mut task = Task::new("t");
    task.attach_memory(node);
    let task_id = task.id;
    ws.repo().save_tasks(project, vec![task]);

    ws.apply_intents(vec![CanvasIntent::Select(Selection::Node(node))]);
    ws.delete_selection();

    let repo = ws.repo();
    let stored = repo.tasks(project).to_vec();
    assert_eq!(stored[0].id, task_id);
    assert_eq!(stored[0].memory_refs, vec![node]);
    assert_eq!(stored[0].live_memory_refs(repo.graph(project)).count(), 0);
}

/// Fit-to-view frames every card inside the viewport at a contained,
/// never-magnifying scale.
#[test]
fn fit_to_view_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();
    ws.repo().add_node(
        project,
        NodeDraft {
            position: Point2D::new(-500.0, -200.0),
            ..NodeDraft::default()
        },
    );
    ws.repo().add_node(
        project,
        NodeDraft {
            position: Point2D::new(1500.0, 900.0),
            ..NodeDraft::default()
        },
    );

    let size = Size2D::new(800.0, 600.0);
    ws.fit_to_view(size);

    let scene = ws.scene(size);
    for sprite in &scene.nodes {
        assert!(sprite.rect.min.x >= -1e-3 && sprite.rect.min.y >= -1e-3);
        assert!(sprite.rect.max.x <= size.width + 1e-3);
        assert!(sprite.rect.max.y <= size.height + 1e-3);
    }
    assert!(ws.viewport().scale <= 1.0);
}

/// Full durability pass over redb: graph, tasks, and edge labels survive
/// a store reopen.
#[test]
fn durability_across_reopen_scenario() {
    let dir = tempfile::TempDir::new().unwrap();
    let project = Uuid::new_v4();

    let (a, b, edge_id, task_id) = {
        let store = RedbStore::open(dir.path().to_path_buf()).unwrap();
        let mut repo = GraphRepository::new(store);
        let a = repo
            .add_node(
                project,
                NodeDraft {
                    title: "decision: ship fridays".to_string(),
                    kind: NodeKind::Decision,
                    position: Point2D::new(70.0, 30.0),
                    ..NodeDraft::default()
                },
            )
            .id;
        let b = repo
            .add_node(
                project,
                NodeDraft {
                    title: "risk: deploy window".to_string(),
                    kind: NodeKind::Risk,
                    ..NodeDraft::default()
                },
            )
            .id;
        let edge = repo
            .add_edge(project, b, a, Some("challenges".to_string()))
            .unwrap();

        let mut task = Task::new("write postmortem");
        task.attach_memory(a);
        let task_id = task.id;
        repo.save_tasks(project, vec![task]);

        (a, b, edge.id, task_id)
    };

    let store = RedbStore::open(dir.path().to_path_buf()).unwrap();
    let mut repo = GraphRepository::new(store);

    let graph = repo.graph(project);
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.node(a).unwrap().kind, NodeKind::Decision);
    assert_eq!(graph.node(a).unwrap().position, Point2D::new(70.0, 30.0));
    assert_eq!(graph.node(b).unwrap().title, "risk: deploy window");
    let edge = graph.edge(edge_id).unwrap();
    assert_eq!((edge.source, edge.target), (b, a));
    assert_eq!(edge.label.as_deref(), Some("challenges"));

    let tasks = repo.tasks(project);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task_id);
    assert_eq!(tasks[0].memory_refs, vec![a]);
}

/// Hit testing through the workspace: grip beats card body beats
/// background.
#[test]
fn hit_test_grip_and_body_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();
    let node = ws.repo().add_node(project, NodeDraft::default()).id; // card [0,200]x[0,150]

    assert_eq!(
        ws.hit_test(Point2D::new(190.0, 10.0)),
        HitTarget::NodeGrip(node)
    );
    assert_eq!(ws.hit_test(Point2D::new(100.0, 75.0)), HitTarget::Node(node));
    assert_eq!(
        ws.hit_test(Point2D::new(400.0, 400.0)),
        HitTarget::Background
    );
}

/// Collapsing a parent hides its subtree from both the scene and hit
/// testing, without deleting anything.
#[test]
fn collapse_hides_subtree_scenario() {
    let mut ws = Workspace::new_for_testing();
    let project = ws.project();
    let parent = ws
        .repo()
        .add_node(
            project,
            NodeDraft {
                title: "epic".to_string(),
                position: Point2D::new(1000.0, 1000.0),
                ..NodeDraft::default()
            },
        )
        .id;
    let child = ws
        .repo()
        .add_node(
            project,
            NodeDraft {
                parent: Some(parent),
                ..NodeDraft::default()
            },
        )
        .id;

    ws.repo().update_node(
        project,
        parent,
        memoboard::NodePatch {
            collapsed: Some(true),
            ..memoboard::NodePatch::default()
        },
    );

    let scene = ws.scene(Size2D::new(800.0, 600.0));
    assert!(scene.nodes.iter().all(|sprite| sprite.id != child));
    assert_eq!(ws.hit_test(Point2D::new(100.0, 75.0)), HitTarget::Background);
    assert!(ws.repo().graph(project).contains_node(child));
}
