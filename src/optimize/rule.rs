use crate::foundation::error::CelgraphResult;
use crate::graph::dag::TaskGraph;
use crate::graph::task::TaskId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Ordering class of a rewrite rule.
///
/// Classes impose a strict global barrier: every rule of an earlier class
/// reaches fixpoint over the whole tree before any rule of a later class
/// runs. Allocation rules therefore always see the final, conversion-stable
/// structure.
pub enum PassCategory {
    /// Inserts, removes or replaces nodes.
    Structural,
    /// Materializes output surfaces; depends on final structure.
    Allocation,
}

impl PassCategory {
    /// All categories, in execution order.
    pub const ORDER: [Self; 2] = [Self::Structural, Self::Allocation];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// What a rule examines per invocation.
pub enum RuleScope {
    /// A single node (plus its parent context).
    Task,
    /// An entire sibling list at once; the rule may reorder, insert or
    /// remove entries.
    List,
}

#[derive(Clone, Copy, Debug)]
/// Transient per-node run context handed to task-scope rules.
///
/// Recreated per node per pass; never persisted.
pub struct TaskContext {
    /// The node under consideration.
    pub task: TaskId,
    /// Its direct parent at this point in the traversal, if any.
    pub parent: Option<TaskId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Result of one task-scope rule invocation.
pub enum RewriteOutcome {
    /// No change; the driver moves on.
    Unchanged,
    /// The node was replaced; the driver redirects the parent edge and
    /// re-runs the active rules against the replacement before moving on.
    ReplacedRecurse(TaskId),
    /// The node was replaced and the rule guarantees the replacement is
    /// already stable: no further reprocessing of this node in the current
    /// pass.
    ReplacedStable(TaskId),
}

impl RewriteOutcome {
    pub fn replacement(self) -> Option<TaskId> {
        match self {
            Self::Unchanged => None,
            Self::ReplacedRecurse(id) | Self::ReplacedStable(id) => Some(id),
        }
    }
}

/// A pure graph-rewrite rule applied by the [`Pipeline`](crate::Pipeline).
///
/// Rules declare their scope and ordering class up front; the driver owns an
/// explicit ordered list of rules and consults these descriptors when
/// sequencing passes — there is no global registry. `run_*` must be
/// synchronous, terminating, and must never mutate a published node in
/// place: replacements go through clone-then-publish, with the driver
/// redirecting edges.
pub trait Optimizer {
    /// Stable rule name for logs and diagnostics.
    fn name(&self) -> &'static str;

    fn scope(&self) -> RuleScope;

    fn category(&self) -> PassCategory;

    /// Examine one node. Only called for [`RuleScope::Task`] rules.
    fn run_task(
        &mut self,
        graph: &mut TaskGraph,
        ctx: TaskContext,
    ) -> CelgraphResult<RewriteOutcome> {
        let _ = (graph, ctx);
        Ok(RewriteOutcome::Unchanged)
    }

    /// Examine one sibling list. Only called for [`RuleScope::List`] rules.
    /// `parent` is `None` for the root list. Returns whether the list or any
    /// entry was changed.
    fn run_list(
        &mut self,
        graph: &mut TaskGraph,
        parent: Option<TaskId>,
        list: &mut Vec<TaskId>,
    ) -> CelgraphResult<bool> {
        let _ = (graph, parent, list);
        Ok(false)
    }
}
