use std::collections::HashSet;

use crate::foundation::error::{CelgraphError, CelgraphResult};
use crate::graph::dag::TaskGraph;
use crate::graph::surface::{BackendKind, SurfaceId};
use crate::graph::task::{TaskId, TaskNode};
use crate::optimize::rule::{Optimizer, PassCategory, RuleScope};

#[derive(Debug, Default)]
/// Allocation rule: every task ends up with exactly one materialized output
/// surface, and surfaces already assigned upstream are never recreated.
///
/// List-scope, and in a later ordering class than the structural rewrites,
/// so it always sees the final, conversion-stable shape of each sibling list
/// before deciding what to allocate. An identity-keyed set of surfaces this
/// rule has materialized makes repeated encounters no-ops.
pub struct OptimizerSurfaceCreate {
    created: HashSet<SurfaceId>,
}

impl OptimizerSurfaceCreate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surfaces this rule has materialized or adopted so far, identity-keyed.
    pub fn created_surfaces(&self) -> &HashSet<SurfaceId> {
        &self.created
    }

    /// Backend for a surface this rule must invent. Exclusive tasks get
    /// their sole backend; agnostic tasks get the renderer's default
    /// software backend.
    fn backend_for(task: &TaskNode) -> BackendKind {
        task.affinity
            .sole_backend()
            .unwrap_or(BackendKind::Software)
    }
}

impl Optimizer for OptimizerSurfaceCreate {
    fn name(&self) -> &'static str {
        "surface-create"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::List
    }

    fn category(&self) -> PassCategory {
        PassCategory::Allocation
    }

    fn run_list(
        &mut self,
        graph: &mut TaskGraph,
        _parent: Option<TaskId>,
        list: &mut Vec<TaskId>,
    ) -> CelgraphResult<bool> {
        let mut changed = false;

        for slot in 0..list.len() {
            let id = list[slot];
            let node = graph.task(id);
            if node.affinity.is_empty() {
                return Err(CelgraphError::unsupported(format!(
                    "{} task {:?} has an empty backend capability set",
                    node.op.name(),
                    id
                )));
            }

            let extent = node.extent;
            let usable_target = node
                .target
                .filter(|&t| node.affinity.supports(graph.surface(t).backend()));

            match usable_target {
                Some(target) => {
                    if graph.surface(target).size().is_none() {
                        graph.set_surface_size(target, extent)?;
                        changed = true;
                    }
                    // Re-encountering a known surface is a no-op.
                    self.created.insert(target);
                }
                None => {
                    // Missing target, or one outside the task's capability
                    // set: materialize the correct one and repoint a clone.
                    let backend = Self::backend_for(node);
                    let mut replacement = node.clone();
                    let surface = graph.create_surface(backend, extent, true)?;
                    replacement.target = Some(surface);
                    let new_id = graph.publish(replacement)?;
                    self.created.insert(surface);
                    list[slot] = new_id;
                    changed = true;
                }
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/optimize/surface_create.rs"]
mod tests;
