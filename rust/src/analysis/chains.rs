//! Driving chain enumeration.

use rustc_hash::FxHashSet;
use tracing::warn;

use crate::config::TraversalLimits;
use crate::interner::TaskIdx;
use crate::{log_changes, log_checks};

use super::graph::{RelIdx, TaskGraph};
use super::state::AnalysisState;

/// A chain of tasks linked by driving relationships, from a root to a target.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    /// Member tasks; membership only, no order.
    pub members: FxHashSet<TaskIdx>,
    /// Relationships in traversal order (target side first).
    pub relationships: Vec<RelIdx>,
    /// Sum of member durations.
    pub total_duration: f64,
    /// Task with no driving predecessor where the chain starts.
    pub root: TaskIdx,
}

impl Chain {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, idx: TaskIdx) -> bool {
        self.members.contains(&idx)
    }
}

/// Chains found by one enumeration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Enumeration {
    /// Chains in discovery order.
    pub chains: Vec<Chain>,
    /// A traversal bound cut the enumeration short.
    pub truncated: bool,
}

impl Enumeration {
    /// Greatest total duration among the chains, if any.
    pub fn best_duration(&self) -> Option<f64> {
        self.chains
            .iter()
            .map(|c| c.total_duration)
            .fold(None, |best, d| Some(best.map_or(d, |b: f64| b.max(d))))
    }
}

/// One open branch of the depth-first walk.
#[derive(Clone)]
struct Branch {
    head: TaskIdx,
    tasks: Vec<TaskIdx>,
    relationships: Vec<RelIdx>,
}

impl Branch {
    fn into_chain(self, graph: &TaskGraph) -> Chain {
        let members: FxHashSet<TaskIdx> = self.tasks.iter().copied().collect();
        let total_duration = members
            .iter()
            .map(|&idx| graph.node(idx).duration_days)
            .sum();
        Chain {
            members,
            relationships: self.relationships,
            total_duration,
            root: self.head,
        }
    }
}

/// Every driving chain that ends at `target`.
///
/// Walks backward over driving relationships only. A branch ends at a task
/// whose driving predecessors are all absent or already on the branch, and
/// a task with several driving predecessors forks the walk. A target with
/// no driving predecessors yields a single one-task chain.
pub fn find_all_driving_chains_to_task(
    graph: &TaskGraph,
    state: &AnalysisState,
    target: TaskIdx,
    limits: &TraversalLimits,
) -> Enumeration {
    let mut result = Enumeration::default();
    let mut stack = vec![Branch {
        head: target,
        tasks: vec![target],
        relationships: Vec::new(),
    }];
    let mut iterations = 0usize;

    while let Some(branch) = stack.pop() {
        iterations += 1;
        if iterations > limits.max_iterations {
            warn!(
                target_task = graph.id_of(target),
                max_iterations = limits.max_iterations,
                "chain enumeration hit the iteration bound, returning partial result"
            );
            result.truncated = true;
            break;
        }

        let forks: Vec<(RelIdx, TaskIdx)> = graph
            .incoming(branch.head)
            .iter()
            .filter(|&&rel| state.is_driving(rel))
            .map(|&rel| (rel, graph.edge(rel).predecessor))
            .filter(|(_, pred)| !branch.tasks.contains(pred))
            .collect();

        let at_depth_bound = branch.tasks.len() >= limits.max_depth;
        if forks.is_empty() || at_depth_bound {
            if at_depth_bound && !forks.is_empty() && !result.truncated {
                warn!(
                    target_task = graph.id_of(target),
                    max_depth = limits.max_depth,
                    "driving chain exceeds the depth bound, cutting it"
                );
                result.truncated = true;
            }
            result.chains.push(branch.into_chain(graph));
            if result.chains.len() >= limits.max_chains {
                if !stack.is_empty() {
                    warn!(
                        target_task = graph.id_of(target),
                        max_chains = limits.max_chains,
                        "chain enumeration hit the chain bound, returning partial result"
                    );
                    result.truncated = true;
                }
                break;
            }
            continue;
        }

        // Reverse so the first listed predecessor is explored first
        for (rel, pred) in forks.into_iter().rev() {
            let mut next = branch.clone();
            next.head = pred;
            next.tasks.push(pred);
            next.relationships.push(rel);
            stack.push(next);
        }
    }

    result
}

/// Pick the task the project's critical path ends at.
///
/// Candidates are the real tasks with the latest finish date, or the tasks
/// without successors when no task has a finish date. The candidate whose
/// best driving chain is longest wins; input order breaks ties.
pub fn find_project_finish(
    graph: &TaskGraph,
    state: &AnalysisState,
    limits: &TraversalLimits,
    verbosity: u8,
) -> Option<TaskIdx> {
    let latest_finish = graph
        .real_task_indices()
        .filter_map(|idx| graph.node(idx).finish)
        .max();
    let mut candidates: Vec<TaskIdx> = match latest_finish {
        Some(latest) => graph
            .real_task_indices()
            .filter(|&idx| graph.node(idx).finish == Some(latest))
            .collect(),
        None => graph
            .real_task_indices()
            .filter(|&idx| graph.successors(idx).is_empty())
            .collect(),
    };
    if candidates.is_empty() {
        // Every task has a successor: only possible with a cycle
        candidates = graph.real_task_indices().collect();
    }

    let mut best: Option<(TaskIdx, f64)> = None;
    for candidate in candidates {
        let duration = find_all_driving_chains_to_task(graph, state, candidate, limits)
            .best_duration()
            .unwrap_or(0.0);
        log_checks!(
            verbosity,
            "project finish candidate {}: best chain {} days",
            graph.id_of(candidate),
            duration
        );
        if best.map_or(true, |(_, best_duration)| duration > best_duration) {
            best = Some((candidate, duration));
        }
    }

    if let Some((idx, duration)) = best {
        log_changes!(
            verbosity,
            "project finish: {} (chain {} days)",
            graph.id_of(idx),
            duration
        );
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::super::driving::classify_driving;
    use super::super::graph::test_support::{fs, make_task};
    use super::*;
    use crate::models::{Relationship, Task};

    fn prepare(tasks: &[Task], rels: &[Relationship]) -> (TaskGraph, AnalysisState) {
        let graph = TaskGraph::build(tasks, rels);
        let mut state = AnalysisState::new(&graph);
        classify_driving(&graph, &mut state, 0);
        (graph, state)
    }

    fn ids(graph: &TaskGraph, chain: &Chain) -> Vec<String> {
        let mut ids: Vec<String> = chain
            .members
            .iter()
            .map(|&idx| graph.id_of(idx).to_string())
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_linear_chain() {
        let tasks = vec![make_task("a", 0, 5), make_task("b", 5, 3), make_task("c", 8, 2)];
        let rels = vec![fs("a", "b"), fs("b", "c")];
        let (graph, state) = prepare(&tasks, &rels);
        let c = graph.index_of("c").unwrap();

        let result = find_all_driving_chains_to_task(&graph, &state, c, &TraversalLimits::default());

        assert!(!result.truncated);
        assert_eq!(result.chains.len(), 1);
        let chain = &result.chains[0];
        assert_eq!(ids(&graph, chain), vec!["a", "b", "c"]);
        assert_eq!(chain.total_duration, 10.0);
        assert_eq!(chain.root, graph.index_of("a").unwrap());
        assert_eq!(chain.relationships, vec![1, 0]);
    }

    #[test]
    fn test_fork_on_tied_predecessors() {
        // r -> x(5) -> s and r -> y(2) -> s, both tight
        let tasks = vec![
            make_task("r", 0, 1),
            make_task("x", 1, 5),
            make_task("y", 4, 2),
            make_task("s", 6, 1),
        ];
        let rels = vec![fs("r", "x"), fs("r", "y"), fs("x", "s"), fs("y", "s")];
        let (graph, state) = prepare(&tasks, &rels);
        let s = graph.index_of("s").unwrap();

        let result = find_all_driving_chains_to_task(&graph, &state, s, &TraversalLimits::default());

        assert_eq!(result.chains.len(), 2);
        // First listed driving predecessor is explored first
        assert_eq!(ids(&graph, &result.chains[0]), vec!["r", "s", "x"]);
        assert_eq!(ids(&graph, &result.chains[1]), vec!["r", "s", "y"]);
        assert_eq!(result.best_duration(), Some(7.0));
    }

    #[test]
    fn test_target_without_driving_predecessors() {
        let tasks = vec![make_task("solo", 0, 4)];
        let (graph, state) = prepare(&tasks, &[]);

        let result = find_all_driving_chains_to_task(&graph, &state, 0, &TraversalLimits::default());

        assert_eq!(result.chains.len(), 1);
        assert_eq!(result.chains[0].member_count(), 1);
        assert!(result.chains[0].contains(0));
        assert_eq!(result.chains[0].root, 0);
    }

    #[test]
    fn test_cycle_terminates() {
        let tasks = vec![Task::new("a", 1.0), Task::new("b", 1.0)];
        let rels = vec![fs("a", "b"), fs("b", "a")];
        let (graph, state) = prepare(&tasks, &rels);

        let result = find_all_driving_chains_to_task(&graph, &state, 0, &TraversalLimits::default());

        assert_eq!(result.chains.len(), 1);
        assert_eq!(result.chains[0].member_count(), 2);
    }

    #[test]
    fn test_chain_bound_truncates() {
        // Three tied predecessors into one sink
        let tasks = vec![
            make_task("a", 0, 2),
            make_task("b", 0, 2),
            make_task("c", 0, 2),
            make_task("z", 2, 1),
        ];
        let rels = vec![fs("a", "z"), fs("b", "z"), fs("c", "z")];
        let (graph, state) = prepare(&tasks, &rels);
        let limits = TraversalLimits {
            max_chains: 2,
            ..TraversalLimits::default()
        };

        let result = find_all_driving_chains_to_task(&graph, &state, 3, &limits);

        assert!(result.truncated);
        assert_eq!(result.chains.len(), 2);
    }

    #[test]
    fn test_depth_bound_truncates() {
        let tasks = vec![make_task("a", 0, 1), make_task("b", 1, 1), make_task("c", 2, 1)];
        let rels = vec![fs("a", "b"), fs("b", "c")];
        let (graph, state) = prepare(&tasks, &rels);
        let limits = TraversalLimits {
            max_depth: 2,
            ..TraversalLimits::default()
        };

        let result = find_all_driving_chains_to_task(&graph, &state, 2, &limits);

        assert!(result.truncated);
        assert_eq!(result.chains[0].member_count(), 2);
    }

    #[test]
    fn test_project_finish_prefers_longest_chain() {
        // Two tasks finish on day 10; "long" sits at the end of a longer chain
        let tasks = vec![
            make_task("p", 0, 6),
            make_task("long", 6, 4),
            make_task("short", 5, 5),
        ];
        let rels = vec![fs("p", "long")];
        let (graph, state) = prepare(&tasks, &rels);

        let finish = find_project_finish(&graph, &state, &TraversalLimits::default(), 0);

        assert_eq!(finish, graph.index_of("long"));
    }

    #[test]
    fn test_project_finish_without_dates_uses_sinks() {
        let tasks = vec![Task::new("a", 2.0), Task::new("b", 1.0)];
        let rels = vec![fs("a", "b")];
        let (graph, state) = prepare(&tasks, &rels);

        let finish = find_project_finish(&graph, &state, &TraversalLimits::default(), 0);

        assert_eq!(finish, graph.index_of("b"));
    }

    #[test]
    fn test_project_finish_empty_graph() {
        let (graph, state) = prepare(&[], &[]);
        assert_eq!(
            find_project_finish(&graph, &state, &TraversalLimits::default(), 0),
            None
        );
    }
}
