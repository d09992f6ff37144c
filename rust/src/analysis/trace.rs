//! Forward/backward tracing from a selected task.
//!
//! Two breadth-first walks (driving-only for longest-path mode, full index
//! for float-based mode) and a depth-first search for the single best
//! driving chain through the selection. The best-chain search is not the
//! chain enumeration: it keeps only one candidate, and going forward it
//! shares one visited set across all branches.

use chrono::NaiveDate;
use std::collections::VecDeque;
use tracing::warn;

use crate::config::{TraceDirection, TraversalLimits};
use crate::interner::TaskIdx;
use crate::log_debug;

use super::driving::FLOAT_TOLERANCE;
use super::graph::{RelIdx, TaskGraph};
use super::state::AnalysisState;

/// Tasks and relationships reached by a trace.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceResult {
    pub origin: TaskIdx,
    pub direction: TraceDirection,
    /// Visit order, origin first.
    pub tasks: Vec<TaskIdx>,
    pub relationships: Vec<RelIdx>,
    /// A traversal bound cut the walk short.
    pub truncated: bool,
}

impl TraceResult {
    fn new(origin: TaskIdx, direction: TraceDirection) -> Self {
        Self {
            origin,
            direction,
            tasks: vec![origin],
            relationships: Vec::new(),
            truncated: false,
        }
    }

    pub fn contains(&self, idx: TaskIdx) -> bool {
        self.tasks.contains(&idx)
    }

    /// Flag traced tasks and relationships.
    pub fn apply(&self, state: &mut AnalysisState) {
        for &idx in &self.tasks {
            state.task_mut(idx).is_in_trace = true;
        }
        for &rel in &self.relationships {
            state.relationship_mut(rel).is_in_trace = true;
        }
    }

    /// Make the traced chain the critical set of a longest-path pass.
    ///
    /// Traced tasks become critical with zero total float, traced
    /// relationships critical, and the tasks they join critical by
    /// relationship. Expects a state with no critical marks yet.
    pub fn mark_critical(&self, graph: &TaskGraph, state: &mut AnalysisState) {
        for &idx in &self.tasks {
            let task = state.task_mut(idx);
            task.is_critical = true;
            task.is_critical_by_float = true;
            task.total_float = 0.0;
        }
        for &rel in &self.relationships {
            state.relationship_mut(rel).is_critical = true;
            let edge = graph.edge(rel);
            state.task_mut(edge.predecessor).is_critical_by_rel = true;
            state.task_mut(edge.successor).is_critical_by_rel = true;
        }
    }

    /// Narrow a float-based result to the traced tasks.
    ///
    /// Traced tasks are critical and untraced ones are not. Supplied floats
    /// and `is_critical_by_float` stay as the float pass set them, and
    /// relationships stay non-critical.
    pub fn restrict_critical(&self, state: &mut AnalysisState) {
        let mut traced = vec![false; state.tasks.len()];
        for &idx in &self.tasks {
            traced[idx as usize] = true;
        }
        for (task, traced) in state.tasks.iter_mut().zip(traced) {
            task.is_critical = traced;
            if traced {
                task.is_near_critical = false;
            }
        }
    }
}

/// Relationships to walk from `task`, and the task each one leads to.
fn neighbors(
    graph: &TaskGraph,
    task: TaskIdx,
    direction: TraceDirection,
) -> impl Iterator<Item = (RelIdx, TaskIdx)> + '_ {
    let rels = match direction {
        TraceDirection::Backward => graph.incoming(task),
        TraceDirection::Forward => graph.outgoing(task),
    };
    rels.iter().map(move |&rel| {
        let edge = graph.edge(rel);
        let next = match direction {
            TraceDirection::Backward => edge.predecessor,
            TraceDirection::Forward => edge.successor,
        };
        (rel, next)
    })
}

fn breadth_first(
    graph: &TaskGraph,
    origin: TaskIdx,
    direction: TraceDirection,
    limits: &TraversalLimits,
    follow: impl Fn(RelIdx) -> bool,
) -> TraceResult {
    let mut result = TraceResult::new(origin, direction);
    let mut visited = vec![false; graph.len()];
    visited[origin as usize] = true;
    let mut queue = VecDeque::from([origin]);
    let mut iterations = 0usize;

    'walk: while let Some(task) = queue.pop_front() {
        iterations += 1;
        if iterations > limits.max_iterations {
            warn!(
                origin = graph.id_of(origin),
                max_iterations = limits.max_iterations,
                "trace hit the iteration bound, returning partial result"
            );
            result.truncated = true;
            break;
        }

        for (rel, next) in neighbors(graph, task, direction) {
            if !follow(rel) {
                continue;
            }
            if !visited[next as usize] {
                if result.tasks.len() >= limits.max_trace_tasks {
                    warn!(
                        origin = graph.id_of(origin),
                        max_trace_tasks = limits.max_trace_tasks,
                        "trace hit the visited-task bound, returning partial result"
                    );
                    result.truncated = true;
                    break 'walk;
                }
                visited[next as usize] = true;
                result.tasks.push(next);
                queue.push_back(next);
            }
            result.relationships.push(rel);
        }
    }

    result
}

/// Breadth-first trace over driving relationships only.
pub fn trace_driving(
    graph: &TaskGraph,
    state: &AnalysisState,
    origin: TaskIdx,
    direction: TraceDirection,
    limits: &TraversalLimits,
) -> TraceResult {
    breadth_first(graph, origin, direction, limits, |rel| state.is_driving(rel))
}

/// Breadth-first trace over the full relationship index.
///
/// With `show_all` off, the forward walk only leaves a task through a
/// relationship without free float: the relationship's supplied free float,
/// else the predecessor's, must be absent or zero.
pub fn trace_free_float(
    graph: &TaskGraph,
    origin: TaskIdx,
    direction: TraceDirection,
    show_all: bool,
    limits: &TraversalLimits,
) -> TraceResult {
    breadth_first(graph, origin, direction, limits, |rel| {
        if show_all || direction == TraceDirection::Backward {
            return true;
        }
        let edge = graph.edge(rel);
        edge.free_float
            .or(graph.node(edge.predecessor).free_float)
            .map_or(true, |free_float| free_float <= FLOAT_TOLERANCE)
    })
}

/// Open branch of the best-chain search.
#[derive(Clone)]
struct Branch {
    head: TaskIdx,
    tasks: Vec<TaskIdx>,
    relationships: Vec<RelIdx>,
    duration: f64,
}

impl Branch {
    /// Date the tie-break looks at: the root's start going backward, the
    /// end's finish going forward.
    fn key_date(&self, graph: &TaskGraph, direction: TraceDirection) -> Option<NaiveDate> {
        let node = graph.node(self.head);
        match direction {
            TraceDirection::Backward => node.start,
            TraceDirection::Forward => node.finish,
        }
    }

    fn beats(&self, other: &Branch, graph: &TaskGraph, direction: TraceDirection) -> bool {
        match (
            self.key_date(graph, direction),
            other.key_date(graph, direction),
        ) {
            (Some(mine), Some(theirs)) if mine != theirs => match direction {
                TraceDirection::Backward => mine < theirs,
                TraceDirection::Forward => mine > theirs,
            },
            (Some(_), None) => true,
            (None, Some(_)) => false,
            _ => self.duration > other.duration,
        }
    }
}

/// The single best driving chain through `origin`.
///
/// Backward prefers the chain whose root starts earliest, forward the chain
/// whose end finishes latest; total duration breaks ties. Forward search
/// claims each task for the first branch that reaches it.
pub fn best_chain_from(
    graph: &TaskGraph,
    state: &AnalysisState,
    origin: TaskIdx,
    direction: TraceDirection,
    limits: &TraversalLimits,
    verbosity: u8,
) -> TraceResult {
    let mut claimed = vec![false; graph.len()];
    claimed[origin as usize] = true;
    let mut stack = vec![Branch {
        head: origin,
        tasks: vec![origin],
        relationships: Vec::new(),
        duration: graph.node(origin).duration_days,
    }];
    let mut best: Option<Branch> = None;
    let mut leaves = 0usize;
    let mut iterations = 0usize;
    let mut truncated = false;

    while let Some(branch) = stack.pop() {
        iterations += 1;
        if iterations > limits.max_iterations {
            warn!(
                origin = graph.id_of(origin),
                max_iterations = limits.max_iterations,
                "best-chain search hit the iteration bound, keeping best so far"
            );
            truncated = true;
            break;
        }

        let forks: Vec<(RelIdx, TaskIdx)> = neighbors(graph, branch.head, direction)
            .filter(|&(rel, next)| {
                state.is_driving(rel)
                    && match direction {
                        TraceDirection::Backward => !branch.tasks.contains(&next),
                        TraceDirection::Forward => !claimed[next as usize],
                    }
            })
            .collect();

        let at_depth_bound = branch.tasks.len() >= limits.max_depth;
        if forks.is_empty() || at_depth_bound {
            truncated |= at_depth_bound && !forks.is_empty();
            log_debug!(
                verbosity,
                "best-chain leaf at {} ({} tasks, {} days)",
                graph.id_of(branch.head),
                branch.tasks.len(),
                branch.duration
            );
            if best
                .as_ref()
                .map_or(true, |current| branch.beats(current, graph, direction))
            {
                best = Some(branch);
            }
            leaves += 1;
            if leaves >= limits.max_chains && !stack.is_empty() {
                warn!(
                    origin = graph.id_of(origin),
                    max_chains = limits.max_chains,
                    "best-chain search hit the chain bound, keeping best so far"
                );
                truncated = true;
                break;
            }
            continue;
        }

        for (rel, next) in forks.into_iter().rev() {
            if direction == TraceDirection::Forward {
                claimed[next as usize] = true;
            }
            let mut extended = branch.clone();
            extended.head = next;
            extended.tasks.push(next);
            extended.relationships.push(rel);
            extended.duration += graph.node(next).duration_days;
            stack.push(extended);
        }
    }

    let mut result = TraceResult::new(origin, direction);
    if let Some(best) = best {
        result.tasks = best.tasks;
        result.relationships = best.relationships;
    }
    result.truncated = truncated;
    result
}
