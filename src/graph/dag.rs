use std::collections::HashSet;

use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{CelgraphError, CelgraphResult};
use crate::graph::surface::{BackendKind, Surface, SurfaceId};
use crate::graph::task::{TaskId, TaskNode};

/// Resource limits for surface creation.
#[derive(Clone, Copy, Debug)]
pub struct AllocLimits {
    /// Maximum total bytes of declared surface storage across the graph.
    pub max_surface_bytes: u64,
}

impl Default for AllocLimits {
    fn default() -> Self {
        Self {
            // Conservative default: enough for hundreds of 4K RGBA8 layers
            // while still catching runaway allocation before the executors do.
            max_surface_bytes: 4 * 1024 * 1024 * 1024,
        }
    }
}

/// Arena holding the render operation DAG and its surfaces.
///
/// Nodes and surfaces are published append-only and addressed by stable
/// identifiers. A published node's payload is never mutated in place: rewrites
/// clone the node ([`TaskGraph::clone_task`]), publish the modified clone, and
/// the driver redirects the relevant parent edge. Parents that still hold the
/// old id keep observing the pre-rewrite node. Sub-task references can only
/// point at already-published nodes, so the graph is acyclic by construction.
#[derive(Clone, Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<TaskNode>,
    surfaces: Vec<Surface>,
    limits: AllocLimits,
    declared_surface_bytes: u64,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: AllocLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Publish a node into the arena, freezing its payload.
    ///
    /// Fails with a structural error if the node references unknown sub-tasks
    /// or surfaces, or if a conversion node does not have exactly one operand.
    pub fn publish(&mut self, node: TaskNode) -> CelgraphResult<TaskId> {
        for &sub in &node.sub_tasks {
            if sub.0 as usize >= self.tasks.len() {
                return Err(CelgraphError::structural(format!(
                    "task references unpublished sub-task {:?}",
                    sub
                )));
            }
        }
        if let Some(target) = node.target
            && target.0 as usize >= self.surfaces.len()
        {
            return Err(CelgraphError::structural(format!(
                "task references unknown surface {:?}",
                target
            )));
        }
        if node.op.is_surface_convert() && node.sub_tasks.len() != 1 {
            return Err(CelgraphError::structural(format!(
                "surface-convert task must have exactly one operand, got {}",
                node.sub_tasks.len()
            )));
        }

        let id = TaskId(self.tasks.len() as u32);
        self.tasks.push(node);
        Ok(id)
    }

    /// Clone-then-modify entry point: publish a copy of an existing node and
    /// return the copy's id. The original stays untouched for any other
    /// parent that still references it.
    pub fn clone_task(&mut self, id: TaskId) -> CelgraphResult<TaskId> {
        let node = self.get_task(id)?.clone();
        self.publish(node)
    }

    pub fn task(&self, id: TaskId) -> &TaskNode {
        &self.tasks[id.0 as usize]
    }

    pub fn get_task(&self, id: TaskId) -> CelgraphResult<&TaskNode> {
        self.tasks
            .get(id.0 as usize)
            .ok_or_else(|| CelgraphError::structural(format!("unknown task id {:?}", id)))
    }

    /// Create a sized surface. `temporary` marks optimizer-owned
    /// intermediates, as opposed to caller-visible outputs.
    pub fn create_surface(
        &mut self,
        backend: BackendKind,
        size: SurfaceSize,
        temporary: bool,
    ) -> CelgraphResult<SurfaceId> {
        self.charge_surface_bytes(size)?;
        let id = SurfaceId(self.surfaces.len() as u32);
        self.surfaces.push(Surface::new(backend, size, temporary));
        Ok(id)
    }

    /// Create a caller-owned surface whose size will be assigned later, once,
    /// via [`TaskGraph::set_surface_size`].
    pub fn create_deferred_surface(&mut self, backend: BackendKind) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len() as u32);
        self.surfaces.push(Surface::new_deferred(backend));
        id
    }

    pub fn surface(&self, id: SurfaceId) -> &Surface {
        &self.surfaces[id.0 as usize]
    }

    pub fn get_surface(&self, id: SurfaceId) -> CelgraphResult<&Surface> {
        self.surfaces
            .get(id.0 as usize)
            .ok_or_else(|| CelgraphError::structural(format!("unknown surface id {:?}", id)))
    }

    /// Assign the size of a deferred surface. Sizes are set exactly once;
    /// a second assignment is a structural fault.
    pub fn set_surface_size(&mut self, id: SurfaceId, size: SurfaceSize) -> CelgraphResult<()> {
        self.charge_surface_bytes(size)?;
        let surface = self
            .surfaces
            .get_mut(id.0 as usize)
            .ok_or_else(|| CelgraphError::structural(format!("unknown surface id {:?}", id)))?;
        surface.set_size(size)
    }

    fn charge_surface_bytes(&mut self, size: SurfaceSize) -> CelgraphResult<()> {
        let next = self.declared_surface_bytes.saturating_add(size.byte_len());
        if next > self.limits.max_surface_bytes {
            return Err(CelgraphError::allocation(format!(
                "surface budget exceeded: {} + {} bytes > {} byte limit",
                self.declared_surface_bytes,
                size.byte_len(),
                self.limits.max_surface_bytes
            )));
        }
        self.declared_surface_bytes = next;
        Ok(())
    }

    /// Total bytes of declared surface storage so far.
    pub fn declared_surface_bytes(&self) -> u64 {
        self.declared_surface_bytes
    }

    /// Detach a node's operand list for the duration of a driver visit.
    ///
    /// Edge redirection happens on the detached list and lands back via
    /// [`TaskGraph::put_sub_tasks`]: the driver, as the single writer,
    /// replaces pointers while published payload semantics stay frozen.
    pub(crate) fn take_sub_tasks(&mut self, id: TaskId) -> Vec<TaskId> {
        std::mem::take(&mut self.tasks[id.0 as usize].sub_tasks)
    }

    pub(crate) fn put_sub_tasks(&mut self, id: TaskId, sub_tasks: Vec<TaskId>) {
        self.tasks[id.0 as usize].sub_tasks = sub_tasks;
    }

    /// Structural validation of the DAG reachable from `roots`: known ids,
    /// no cyclic sub-task references, conversion arity.
    pub fn validate(&self, roots: &[TaskId]) -> CelgraphResult<()> {
        let mut done = HashSet::new();
        let mut on_path = HashSet::new();
        for &root in roots {
            self.validate_from(root, &mut done, &mut on_path)?;
        }
        Ok(())
    }

    fn validate_from(
        &self,
        id: TaskId,
        done: &mut HashSet<TaskId>,
        on_path: &mut HashSet<TaskId>,
    ) -> CelgraphResult<()> {
        if done.contains(&id) {
            return Ok(());
        }
        if !on_path.insert(id) {
            return Err(CelgraphError::structural(format!(
                "cyclic sub-task reference through {:?}",
                id
            )));
        }
        let node = self.get_task(id)?;
        if node.op.is_surface_convert() && node.sub_tasks.len() != 1 {
            return Err(CelgraphError::structural(format!(
                "surface-convert {:?} must have exactly one operand",
                id
            )));
        }
        if let Some(target) = node.target {
            self.get_surface(target)?;
        }
        for &sub in &node.sub_tasks {
            self.validate_from(sub, done, on_path)?;
        }
        on_path.remove(&id);
        done.insert(id);
        Ok(())
    }

    /// Depth-first, post-order traversal of the DAG reachable from `roots`,
    /// visiting each node exactly once with operands before consumers.
    ///
    /// This is the hand-off surface for per-backend executors: by the time a
    /// node is yielded, everything it reads has already been yielded.
    pub fn visit_depth_first(
        &self,
        roots: &[TaskId],
        mut visit: impl FnMut(TaskId, &TaskNode),
    ) -> CelgraphResult<()> {
        let mut done = HashSet::new();
        let mut on_path = HashSet::new();
        for &root in roots {
            self.visit_from(root, &mut done, &mut on_path, &mut visit)?;
        }
        Ok(())
    }

    fn visit_from(
        &self,
        id: TaskId,
        done: &mut HashSet<TaskId>,
        on_path: &mut HashSet<TaskId>,
        visit: &mut impl FnMut(TaskId, &TaskNode),
    ) -> CelgraphResult<()> {
        if done.contains(&id) {
            return Ok(());
        }
        if !on_path.insert(id) {
            return Err(CelgraphError::structural(format!(
                "cyclic sub-task reference through {:?}",
                id
            )));
        }
        let node = self.get_task(id)?;
        for &sub in &node.sub_tasks {
            self.visit_from(sub, done, on_path, visit)?;
        }
        on_path.remove(&id);
        done.insert(id);
        visit(id, node);
        Ok(())
    }

    /// Verify the guarantees an optimized graph owes its executors:
    ///
    /// - every node has exactly one assigned, sized target surface;
    /// - the target's backend is within the node's own capability set;
    /// - every operand's target backend is within the consumer's capability
    ///   set, so executors never need conversion logic of their own;
    /// - no conversion node is redundant (its two ends are in different
    ///   backend families).
    pub fn check_consistency(&self, roots: &[TaskId]) -> CelgraphResult<()> {
        self.validate(roots)?;
        let mut result = Ok(());
        self.visit_depth_first(roots, |id, node| {
            if result.is_err() {
                return;
            }
            result = self.check_node_consistency(id, node);
        })?;
        result
    }

    fn check_node_consistency(&self, id: TaskId, node: &TaskNode) -> CelgraphResult<()> {
        let Some(target) = node.target else {
            return Err(CelgraphError::structural(format!(
                "{} task {:?} has no target surface",
                node.op.name(),
                id
            )));
        };
        let surface = self.surface(target);
        if surface.size().is_none() {
            return Err(CelgraphError::structural(format!(
                "target surface {:?} of {:?} was never sized",
                target, id
            )));
        }
        if !node.affinity.supports(surface.backend()) {
            return Err(CelgraphError::unsupported(format!(
                "{} task {:?} cannot run on {:?} target",
                node.op.name(),
                id,
                surface.backend()
            )));
        }
        for &sub in &node.sub_tasks {
            let sub_node = self.task(sub);
            let Some(sub_target) = sub_node.target else {
                return Err(CelgraphError::structural(format!(
                    "operand {:?} of {:?} has no target surface",
                    sub, id
                )));
            };
            let sub_backend = self.surface(sub_target).backend();
            if !node.affinity.supports(sub_backend) {
                return Err(CelgraphError::unsupported(format!(
                    "{} task {:?} consumes {:?} operand {:?} outside its capability set",
                    node.op.name(),
                    id,
                    sub_backend,
                    sub
                )));
            }
        }
        if node.op.is_surface_convert()
            && let (Some(&sub), Some(target)) = (node.sub_tasks.first(), node.target)
            && let Some(sub_target) = self.task(sub).target
            && self
                .surface(sub_target)
                .backend()
                .same_family(self.surface(target).backend())
        {
            return Err(CelgraphError::structural(format!(
                "redundant surface-convert {:?}: both ends are {:?}",
                id,
                self.surface(target).backend()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/dag.rs"]
mod tests;
