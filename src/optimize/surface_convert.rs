use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{CelgraphError, CelgraphResult};
use crate::graph::dag::TaskGraph;
use crate::graph::surface::SurfaceId;
use crate::graph::task::{BackendAffinity, TaskNode, TaskOp};
use crate::optimize::rule::{Optimizer, PassCategory, RewriteOutcome, RuleScope, TaskContext};

#[derive(Debug, Default)]
/// Structural rule: make every producer/consumer edge backend-consistent
/// with the minimum number of pixel conversions.
///
/// Three independent moves per node with an assigned target surface:
///
/// 1. A conversion node whose two ends landed in the same broad backend
///    family is redundant; it is replaced by its operand directly. This
///    undoes speculative conversions once both ends agree.
/// 2. A node whose exclusive native backend conflicts with its assigned
///    target renders into a fresh native temporary instead, and a new
///    conversion node fills the original target.
/// 3. If the parent's exclusive native backend differs from the node's
///    parent-facing target backend, a second-level conversion is inserted so
///    the parent always observes a target of its own backend.
///
/// Backend-agnostic nodes never trigger move 2; only a parent mismatch can
/// still wrap them. Replacements are reported stable: the rewritten shape
/// cannot be improved further within the same pass.
pub struct OptimizerSurfaceConvert;

impl OptimizerSurfaceConvert {
    pub fn new() -> Self {
        Self
    }

    /// Temporaries stand in for an existing surface and match its size;
    /// an unsized (deferred) surface falls back to the node's own extent.
    fn stand_in_size(graph: &TaskGraph, surface: SurfaceId, node: &TaskNode) -> SurfaceSize {
        graph.surface(surface).size().unwrap_or(node.extent)
    }
}

impl Optimizer for OptimizerSurfaceConvert {
    fn name(&self) -> &'static str {
        "surface-convert"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Task
    }

    fn category(&self) -> PassCategory {
        PassCategory::Structural
    }

    fn run_task(
        &mut self,
        graph: &mut TaskGraph,
        ctx: TaskContext,
    ) -> CelgraphResult<RewriteOutcome> {
        let id = ctx.task;
        let node = graph.task(id);
        let Some(target) = node.target else {
            return Ok(RewriteOutcome::Unchanged);
        };

        if node.op.is_surface_convert() {
            // Arity is validated at publish time.
            let sub = node.sub_tasks[0];
            if let Some(sub_target) = graph.task(sub).target {
                let own = graph.surface(target).backend();
                let theirs = graph.surface(sub_target).backend();
                if own.same_family(theirs) {
                    return Ok(RewriteOutcome::ReplacedStable(sub));
                }
            }
            return Ok(RewriteOutcome::Unchanged);
        }

        if node.affinity.is_empty() {
            return Err(CelgraphError::unsupported(format!(
                "{} task {:?} has an empty backend capability set",
                node.op.name(),
                id
            )));
        }

        let mut current = id;
        let target_backend = graph.surface(target).backend();

        if let Some(native) = node.affinity.sole_backend()
            && !native.same_family(target_backend)
        {
            // Detach the producer from the foreign target: the clone renders
            // into a native temporary, the conversion fills the original.
            let size = Self::stand_in_size(graph, target, node);
            let mut clone = node.clone();
            let tmp = graph.create_surface(native, size, true)?;
            clone.target = Some(tmp);
            let clone_id = graph.publish(clone)?;

            let convert = TaskNode::new(TaskOp::SurfaceConvert, BackendAffinity::ANY, size)
                .with_target(target)
                .with_sub_tasks([clone_id]);
            current = graph.publish(convert)?;
        }

        if let Some(parent) = ctx.parent
            && let Some(parent_native) = graph.task(parent).affinity.sole_backend()
        {
            let node = graph.task(current);
            // `current` always has a target here: either the original node's,
            // or the conversion just built around it.
            if let Some(facing) = node.target
                && !parent_native.same_family(graph.surface(facing).backend())
            {
                let size = Self::stand_in_size(graph, facing, node);
                let tmp = graph.create_surface(parent_native, size, true)?;
                let convert = TaskNode::new(TaskOp::SurfaceConvert, BackendAffinity::ANY, size)
                    .with_target(tmp)
                    .with_sub_tasks([current]);
                current = graph.publish(convert)?;
            }
        }

        if current != id {
            return Ok(RewriteOutcome::ReplacedStable(current));
        }
        Ok(RewriteOutcome::Unchanged)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/optimize/surface_convert.rs"]
mod tests;
