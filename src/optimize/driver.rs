use std::collections::HashSet;

use crate::foundation::error::{CelgraphError, CelgraphResult};
use crate::graph::dag::TaskGraph;
use crate::graph::task::TaskId;
use crate::optimize::rule::{Optimizer, PassCategory, RewriteOutcome, RuleScope, TaskContext};
use crate::optimize::surface_convert::OptimizerSurfaceConvert;
use crate::optimize::surface_create::OptimizerSurfaceCreate;

/// Upper bound on consecutive `ReplacedRecurse` rewrites of a single node
/// within one pass. A well-formed rule set settles in a handful; hitting the
/// bound means a rule pair is oscillating.
const NODE_REPROCESS_LIMIT: usize = 1024;

#[derive(Clone, Debug)]
/// Driver configuration.
pub struct PipelineOpts {
    /// Maximum full-tree passes per ordering class before the driver gives
    /// up and reports non-convergence as a structural fault. Convergence is
    /// normally proportional to tree depth; the default leaves generous
    /// headroom.
    pub max_passes_per_category: usize,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            max_passes_per_category: 64,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Counters accumulated over one [`Pipeline::optimize`] run.
pub struct OptimizeStats {
    /// Full-tree traversals performed, across all ordering classes.
    pub passes: u64,
    /// Node replacements reported by task-scope rules.
    pub task_rewrites: u64,
    /// Sibling-list edits reported by list-scope rules.
    pub list_rewrites: u64,
}

#[derive(Debug)]
/// A successfully optimized DAG, ready for per-backend executors.
pub struct OptimizedGraph {
    pub graph: TaskGraph,
    /// Root tasks, post-rewrite. Parent edges inside the graph and entries
    /// here both point at the final nodes.
    pub roots: Vec<TaskId>,
    pub stats: OptimizeStats,
}

/// Orchestrates repeated application of an ordered rewrite-rule list over a
/// task DAG until fixpoint.
///
/// Rules are grouped by [`PassCategory`]; all rules of an earlier class reach
/// fixpoint over the whole tree before any rule of a later class begins.
/// Within a class, each sibling list is first offered to list-scope rules,
/// then every node is offered to task-scope rules, in declaration order; the
/// first reported change wins and the node is reprocessed per the
/// [`RewriteOutcome`] contract.
pub struct Pipeline {
    rules: Vec<Box<dyn Optimizer>>,
    opts: PipelineOpts,
}

impl Pipeline {
    pub fn new(rules: Vec<Box<dyn Optimizer>>, opts: PipelineOpts) -> Self {
        Self { rules, opts }
    }

    /// The stock rule set: surface-conversion insertion/elision (structural
    /// class) followed by surface allocation (allocation class).
    pub fn standard() -> Self {
        Self::new(
            vec![
                Box::new(OptimizerSurfaceConvert::new()),
                Box::new(OptimizerSurfaceCreate::new()),
            ],
            PipelineOpts::default(),
        )
    }

    /// Run the rule set to fixpoint and hand back an executor-ready DAG.
    ///
    /// Consumes the graph: on any fault the partially rewritten arena is
    /// dropped with the error, so a half-rewritten DAG is never caller
    /// visible. The result is re-validated and consistency-checked before
    /// being returned.
    #[tracing::instrument(skip(self, graph, roots))]
    pub fn optimize(
        &mut self,
        graph: TaskGraph,
        roots: Vec<TaskId>,
    ) -> CelgraphResult<OptimizedGraph> {
        let mut graph = graph;
        let mut roots = roots;
        graph.validate(&roots)?;

        let mut stats = OptimizeStats::default();
        for category in PassCategory::ORDER {
            if !self.rules.iter().any(|r| r.category() == category) {
                continue;
            }
            let mut passes_in_category = 0usize;
            loop {
                let mut on_path = HashSet::new();
                let changed = process_list(
                    &mut self.rules,
                    category,
                    &mut graph,
                    None,
                    &mut roots,
                    &mut on_path,
                    &mut stats,
                )?;
                stats.passes += 1;
                passes_in_category += 1;
                tracing::debug!(?category, pass = passes_in_category, changed, "pass done");
                if !changed {
                    break;
                }
                if passes_in_category >= self.opts.max_passes_per_category {
                    return Err(CelgraphError::structural(format!(
                        "{:?} rewrites did not converge within {} passes",
                        category, self.opts.max_passes_per_category
                    )));
                }
            }
        }

        graph.check_consistency(&roots)?;
        Ok(OptimizedGraph {
            graph,
            roots,
            stats,
        })
    }
}

/// One pass over a sibling list: list-scope rules on the list itself, then
/// task-scope rules and recursion for each entry.
fn process_list(
    rules: &mut [Box<dyn Optimizer>],
    category: PassCategory,
    graph: &mut TaskGraph,
    parent: Option<TaskId>,
    list: &mut Vec<TaskId>,
    on_path: &mut HashSet<TaskId>,
    stats: &mut OptimizeStats,
) -> CelgraphResult<bool> {
    let mut changed = false;

    for rule in rules.iter_mut() {
        if rule.category() != category || rule.scope() != RuleScope::List {
            continue;
        }
        if rule.run_list(graph, parent, list)? {
            stats.list_rewrites += 1;
            changed = true;
        }
    }

    for index in 0..list.len() {
        let id = list[index];
        if on_path.contains(&id) {
            return Err(CelgraphError::structural(format!(
                "cyclic sub-task reference through {:?}",
                id
            )));
        }

        let (settled, node_changed) =
            process_task(rules, category, graph, id, parent, stats)?;
        if node_changed {
            list[index] = settled;
            changed = true;
        }

        // Descend into the (possibly replaced) node. Its operand list is
        // taken out for the duration so rules below never alias it.
        on_path.insert(settled);
        let mut sub_tasks = graph.take_sub_tasks(settled);
        let result = process_list(
            rules,
            category,
            graph,
            Some(settled),
            &mut sub_tasks,
            on_path,
            stats,
        );
        graph.put_sub_tasks(settled, sub_tasks);
        on_path.remove(&settled);
        changed |= result?;
    }

    Ok(changed)
}

/// Run the active task-scope rules against one node until it settles:
/// `ReplacedRecurse` restarts the rule list against the replacement,
/// `ReplacedStable` ends reprocessing for this pass.
fn process_task(
    rules: &mut [Box<dyn Optimizer>],
    category: PassCategory,
    graph: &mut TaskGraph,
    task: TaskId,
    parent: Option<TaskId>,
    stats: &mut OptimizeStats,
) -> CelgraphResult<(TaskId, bool)> {
    let mut current = task;
    let mut changed = false;
    let mut reprocesses = 0usize;

    'reprocess: loop {
        for rule in rules.iter_mut() {
            if rule.category() != category || rule.scope() != RuleScope::Task {
                continue;
            }
            let ctx = TaskContext {
                task: current,
                parent,
            };
            match rule.run_task(graph, ctx)? {
                RewriteOutcome::Unchanged => {}
                RewriteOutcome::ReplacedRecurse(next) => {
                    tracing::trace!(rule = rule.name(), from = ?current, to = ?next, "rewrite");
                    current = next;
                    changed = true;
                    stats.task_rewrites += 1;
                    reprocesses += 1;
                    if reprocesses >= NODE_REPROCESS_LIMIT {
                        return Err(CelgraphError::structural(format!(
                            "rule '{}' kept rewriting {:?} without settling",
                            rule.name(),
                            task
                        )));
                    }
                    continue 'reprocess;
                }
                RewriteOutcome::ReplacedStable(next) => {
                    tracing::trace!(rule = rule.name(), from = ?current, to = ?next, "rewrite (stable)");
                    current = next;
                    changed = true;
                    stats.task_rewrites += 1;
                    break 'reprocess;
                }
            }
        }
        break;
    }

    Ok((current, changed))
}

#[cfg(test)]
#[path = "../../tests/unit/optimize/driver.rs"]
mod tests;
