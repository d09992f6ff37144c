//! Near-critical classification by float distance to the critical set.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::warn;

use crate::config::TraversalLimits;
use crate::interner::TaskIdx;
use crate::{log_changes, log_checks};

use super::graph::TaskGraph;
use super::state::AnalysisState;

/// Counts from one near-critical pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NearCriticalSummary {
    pub near_critical: usize,
    /// Walks cut short by the iteration bound.
    pub truncated_walks: usize,
}

/// Smallest float accumulated on any forward path from `start` to a
/// critical task, if one is reachable within `threshold`.
///
/// Every hop adds the relationship float clamped to zero. Paths that rejoin
/// are explored separately; a path is dropped only once it exceeds the
/// threshold or cannot beat a cheaper path already seen through the same
/// task.
fn float_to_critical(
    graph: &TaskGraph,
    state: &AnalysisState,
    critical: &[bool],
    start: TaskIdx,
    threshold: f64,
    limits: &TraversalLimits,
) -> (Option<f64>, bool) {
    let mut best: Option<f64> = None;
    let mut cheapest: FxHashMap<TaskIdx, f64> = FxHashMap::default();
    cheapest.insert(start, 0.0);
    let mut queue: VecDeque<(TaskIdx, f64)> = VecDeque::from([(start, 0.0)]);
    let mut iterations = 0usize;

    while let Some((task, accumulated)) = queue.pop_front() {
        iterations += 1;
        if iterations > limits.max_iterations {
            return (best, true);
        }
        if cheapest.get(&task).is_some_and(|&seen| accumulated > seen) {
            continue;
        }

        for &rel in graph.outgoing(task) {
            let next = accumulated + state.relationship(rel).float.max(0.0);
            // Also rejects infinite floats
            if !(next <= threshold) || best.is_some_and(|b| next >= b) {
                continue;
            }
            let succ = graph.edge(rel).successor;
            if critical[succ as usize] {
                best = Some(next);
                continue;
            }
            if cheapest.get(&succ).is_some_and(|&seen| seen <= next) {
                continue;
            }
            cheapest.insert(succ, next);
            queue.push_back((succ, next));
        }
    }

    (best, false)
}

/// Flag non-critical tasks whose float distance to the critical set is
/// within `threshold`.
///
/// A flagged task gets that distance as its total float. A threshold of
/// zero disables the pass.
pub fn classify_near_critical(
    graph: &TaskGraph,
    state: &mut AnalysisState,
    threshold: f64,
    limits: &TraversalLimits,
    verbosity: u8,
) -> NearCriticalSummary {
    let mut summary = NearCriticalSummary::default();
    if !(threshold > 0.0) || graph.is_empty() {
        return summary;
    }

    let critical: Vec<bool> = state.tasks.iter().map(|t| t.is_critical).collect();
    if !critical.iter().any(|&c| c) {
        return summary;
    }

    for task in graph.real_task_indices() {
        if critical[task as usize] {
            continue;
        }
        let (distance, truncated) =
            float_to_critical(graph, state, &critical, task, threshold, limits);
        if truncated {
            summary.truncated_walks += 1;
            warn!(
                task_id = graph.id_of(task),
                max_iterations = limits.max_iterations,
                "near-critical walk hit the iteration bound"
            );
        }
        if let Some(distance) = distance {
            let task_state = state.task_mut(task);
            task_state.is_near_critical = true;
            task_state.total_float = distance;
            summary.near_critical += 1;
            log_checks!(
                verbosity,
                "near-critical: {} ({} days from critical set)",
                graph.id_of(task),
                distance
            );
        }
    }

    log_changes!(
        verbosity,
        "near-critical pass: {} tasks within {} days",
        summary.near_critical,
        threshold
    );
    summary
}
