use super::*;
use crate::foundation::core::BlendMode;
use crate::graph::dag::TaskGraph;
use crate::graph::surface::BackendKind;
use crate::graph::task::TaskId;

fn size() -> SurfaceSize {
    SurfaceSize::new(8, 8).unwrap()
}

fn draw(affinity: BackendAffinity) -> TaskNode {
    TaskNode::new(
        TaskOp::Draw {
            path: kurbo::BezPath::new(),
        },
        affinity,
        size(),
    )
}

fn blend(affinity: BackendAffinity) -> TaskNode {
    TaskNode::new(
        TaskOp::Blend {
            mode: BlendMode::Normal,
        },
        affinity,
        size(),
    )
}

fn run(
    graph: &mut TaskGraph,
    task: TaskId,
    parent: Option<TaskId>,
) -> CelgraphResult<RewriteOutcome> {
    OptimizerSurfaceConvert::new().run_task(graph, TaskContext { task, parent })
}

#[test]
fn node_without_target_is_ignored() {
    let mut g = TaskGraph::new();
    let id = g.publish(draw(BackendAffinity::SOFTWARE)).unwrap();
    assert_eq!(run(&mut g, id, None).unwrap(), RewriteOutcome::Unchanged);
}

#[test]
fn elides_redundant_conversion() {
    let mut g = TaskGraph::new();
    let a = g
        .create_surface(BackendKind::Software, size(), false)
        .unwrap();
    let b = g
        .create_surface(BackendKind::Software, size(), true)
        .unwrap();
    let leaf = g
        .publish(draw(BackendAffinity::SOFTWARE).with_target(a))
        .unwrap();
    let convert = g
        .publish(
            TaskNode::new(TaskOp::SurfaceConvert, BackendAffinity::ANY, size())
                .with_target(b)
                .with_sub_tasks([leaf]),
        )
        .unwrap();

    assert_eq!(
        run(&mut g, convert, None).unwrap(),
        RewriteOutcome::ReplacedStable(leaf)
    );
}

#[test]
fn keeps_conversion_that_still_crosses_families() {
    let mut g = TaskGraph::new();
    let sw = g
        .create_surface(BackendKind::Software, size(), true)
        .unwrap();
    let gpu = g.create_surface(BackendKind::Gpu, size(), false).unwrap();
    let leaf = g
        .publish(draw(BackendAffinity::SOFTWARE).with_target(sw))
        .unwrap();
    let convert = g
        .publish(
            TaskNode::new(TaskOp::SurfaceConvert, BackendAffinity::ANY, size())
                .with_target(gpu)
                .with_sub_tasks([leaf]),
        )
        .unwrap();

    assert_eq!(run(&mut g, convert, None).unwrap(), RewriteOutcome::Unchanged);
}

#[test]
fn wraps_native_backend_conflict() {
    let mut g = TaskGraph::new();
    let gpu = g.create_surface(BackendKind::Gpu, size(), false).unwrap();
    let id = g
        .publish(draw(BackendAffinity::SOFTWARE).with_target(gpu))
        .unwrap();

    let outcome = run(&mut g, id, None).unwrap();
    let RewriteOutcome::ReplacedStable(convert) = outcome else {
        panic!("expected stable replacement, got {outcome:?}");
    };

    let convert_node = g.task(convert);
    assert!(convert_node.op.is_surface_convert());
    // The conversion fills the surface originally assigned to the node.
    assert_eq!(convert_node.target, Some(gpu));

    let clone = convert_node.sub_tasks[0];
    assert_ne!(clone, id);
    let clone_target = g.task(clone).target.unwrap();
    let tmp = g.surface(clone_target);
    assert_eq!(tmp.backend(), BackendKind::Software);
    assert!(tmp.is_temporary());
    assert_eq!(tmp.size(), Some(size()));

    // Original node untouched: still pointing at the foreign surface.
    assert_eq!(g.task(id).target, Some(gpu));
}

#[test]
fn agnostic_node_is_never_forced() {
    let mut g = TaskGraph::new();
    let gpu = g.create_surface(BackendKind::Gpu, size(), false).unwrap();
    let id = g
        .publish(draw(BackendAffinity::ANY).with_target(gpu))
        .unwrap();
    assert_eq!(run(&mut g, id, None).unwrap(), RewriteOutcome::Unchanged);
}

#[test]
fn parent_mismatch_inserts_parent_facing_conversion() {
    let mut g = TaskGraph::new();
    let gpu = g.create_surface(BackendKind::Gpu, size(), false).unwrap();
    let child = g
        .publish(draw(BackendAffinity::GPU).with_target(gpu))
        .unwrap();
    let parent = g
        .publish(blend(BackendAffinity::SOFTWARE).with_sub_tasks([child]))
        .unwrap();

    let outcome = run(&mut g, child, Some(parent)).unwrap();
    let RewriteOutcome::ReplacedStable(convert) = outcome else {
        panic!("expected stable replacement, got {outcome:?}");
    };

    let convert_node = g.task(convert);
    assert!(convert_node.op.is_surface_convert());
    // The child itself was compatible with its own target: no clone, just a
    // wrapper the parent can read.
    assert_eq!(convert_node.sub_tasks, vec![child]);
    let facing = g.surface(convert_node.target.unwrap());
    assert_eq!(facing.backend(), BackendKind::Software);
    assert!(facing.is_temporary());
}

#[test]
fn conflicting_node_under_conflicting_parent_chains_conversions() {
    let mut g = TaskGraph::new();
    let gpu = g.create_surface(BackendKind::Gpu, size(), false).unwrap();
    let child = g
        .publish(draw(BackendAffinity::SOFTWARE).with_target(gpu))
        .unwrap();
    let parent = g
        .publish(blend(BackendAffinity::SOFTWARE).with_sub_tasks([child]))
        .unwrap();

    let outcome = run(&mut g, child, Some(parent)).unwrap();
    let RewriteOutcome::ReplacedStable(outer) = outcome else {
        panic!("expected stable replacement, got {outcome:?}");
    };

    // Outer conversion faces the software parent; inner conversion fills the
    // original GPU surface from the software clone.
    let outer_node = g.task(outer);
    assert!(outer_node.op.is_surface_convert());
    assert_eq!(
        g.surface(outer_node.target.unwrap()).backend(),
        BackendKind::Software
    );
    let inner = outer_node.sub_tasks[0];
    let inner_node = g.task(inner);
    assert!(inner_node.op.is_surface_convert());
    assert_eq!(inner_node.target, Some(gpu));
}

#[test]
fn empty_capability_set_is_unsupported() {
    let mut g = TaskGraph::new();
    let sw = g
        .create_surface(BackendKind::Software, size(), false)
        .unwrap();
    let id = g
        .publish(draw(BackendAffinity::NONE).with_target(sw))
        .unwrap();
    assert!(matches!(
        run(&mut g, id, None),
        Err(CelgraphError::Unsupported(_))
    ));
}
