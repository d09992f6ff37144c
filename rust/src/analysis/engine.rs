//! Orchestration of one criticality recomputation.

use tracing::warn;

use crate::config::{AnalysisConfig, CriticalityMode};
use crate::interner::TaskIdx;
use crate::models::{AnalysisOutput, ChainSummary, Relationship, Task};
use crate::{log_changes, log_checks};

use super::chains::{find_all_driving_chains_to_task, find_project_finish};
use super::driving::classify_driving;
use super::float_based::apply_task_float;
use super::graph::TaskGraph;
use super::near_critical::classify_near_critical;
use super::selector::PathSelector;
use super::state::AnalysisState;
use super::trace::{best_chain_from, trace_driving, trace_free_float, TraceResult};

/// Result of one recomputation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisReport {
    pub state: AnalysisState,
    /// Enumerated chains, longest first (longest-path mode only).
    pub chains: Vec<ChainSummary>,
    pub selected_chain: Option<ChainSummary>,
    pub selected_chain_members: Vec<TaskIdx>,
    pub project_finish: Option<TaskIdx>,
    pub trace: Option<TraceResult>,
    /// Chain enumeration was cut short by a traversal bound.
    pub chains_truncated: bool,
}

impl AnalysisReport {
    fn empty(graph: &TaskGraph) -> Self {
        Self {
            state: AnalysisState::new(graph),
            chains: Vec::new(),
            selected_chain: None,
            selected_chain_members: Vec::new(),
            project_finish: None,
            trace: None,
            chains_truncated: false,
        }
    }
}

struct RankedChains {
    finish: TaskIdx,
    selector: PathSelector,
    truncated: bool,
}

/// Criticality analysis over one graph.
///
/// The graph is built once per data refresh; every other trigger (mode,
/// path index, selected task, direction, threshold) only changes the
/// config and calls [`CriticalityEngine::analyze`] again.
pub struct CriticalityEngine {
    graph: TaskGraph,
    config: AnalysisConfig,
}

impl CriticalityEngine {
    pub fn new(tasks: &[Task], relationships: &[Relationship], config: AnalysisConfig) -> Self {
        Self::from_graph(TaskGraph::build(tasks, relationships), config)
    }

    pub fn from_graph(graph: TaskGraph, config: AnalysisConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.config
    }

    /// Replace the graph after a data refresh.
    pub fn refresh(&mut self, tasks: &[Task], relationships: &[Relationship]) {
        self.graph = TaskGraph::build(tasks, relationships);
    }

    /// Run a full recomputation from reset state.
    ///
    /// With a selected task that exists, the trace from it is the critical
    /// set; otherwise the selected chain into the project finish is.
    pub fn analyze(&self) -> AnalysisReport {
        let config = &self.config;
        let graph = &self.graph;
        let verbosity = config.verbosity;
        let threshold = config.effective_threshold();

        let mut report = AnalysisReport::empty(graph);
        if graph.is_empty() {
            return report;
        }

        log_changes!(
            verbosity,
            "analysis: {} tasks ({} placeholders), {} relationships, mode {}",
            graph.len(),
            graph.placeholder_count(),
            graph.relationship_count(),
            config.mode
        );

        let selection = self.selected_task();
        match config.mode {
            CriticalityMode::LongestPath => {
                self.run_longest_path(&mut report, selection.is_none());
                if let Some(origin) = selection {
                    let trace = self.run_trace(origin, &report.state);
                    trace.mark_critical(graph, &mut report.state);
                    report.trace = Some(trace);
                }
                classify_near_critical(
                    graph,
                    &mut report.state,
                    threshold,
                    &config.limits,
                    verbosity,
                );
            }
            CriticalityMode::FloatBased => {
                apply_task_float(graph, &mut report.state, threshold, verbosity);
                if let Some(origin) = selection {
                    let trace = self.run_trace(origin, &report.state);
                    trace.restrict_critical(&mut report.state);
                    report.trace = Some(trace);
                }
            }
        }

        if let Some(trace) = &report.trace {
            trace.apply(&mut report.state);
        }

        report
    }

    /// Run [`analyze`](Self::analyze) and write the result onto the records.
    pub fn analyze_into(
        &self,
        tasks: &mut [Task],
        relationships: &mut [Relationship],
    ) -> AnalysisReport {
        let report = self.analyze();
        report.state.apply(&self.graph, tasks, relationships);
        report
    }

    /// Analyze and bundle everything for the host.
    pub fn output(
        &self,
        mut tasks: Vec<Task>,
        mut relationships: Vec<Relationship>,
    ) -> AnalysisOutput {
        let report = self.analyze_into(&mut tasks, &mut relationships);
        let ids = |indices: &[TaskIdx]| -> Vec<String> {
            indices
                .iter()
                .map(|&idx| self.graph.id_of(idx).to_string())
                .collect()
        };

        AnalysisOutput {
            selected_chain_task_ids: ids(&report.selected_chain_members),
            trace_task_ids: report
                .trace
                .as_ref()
                .map(|trace| ids(&trace.tasks))
                .unwrap_or_default(),
            trace_truncated: report.trace.as_ref().is_some_and(|trace| trace.truncated),
            project_finish_id: report
                .project_finish
                .map(|idx| self.graph.id_of(idx).to_string()),
            chains: report.chains,
            selected_chain: report.selected_chain,
            tasks,
            relationships,
        }
    }

    /// Select the next chain, wrapping to the first. Returns the new index.
    pub fn next_path(&mut self) -> usize {
        self.step_path(PathSelector::next)
    }

    /// Select the previous chain, wrapping to the last.
    pub fn previous_path(&mut self) -> usize {
        self.step_path(PathSelector::previous)
    }

    fn step_path(&mut self, step: impl FnOnce(&mut PathSelector) -> usize) -> usize {
        let mut state = AnalysisState::new(&self.graph);
        let index = match self.rank_chains(&mut state) {
            Some(mut ranked) => step(&mut ranked.selector),
            None => 1,
        };
        self.config.selected_path_index = index;
        index
    }

    /// Classify driving relationships and rank the chains into the project
    /// finish. `None` when the graph has no real task.
    fn rank_chains(&self, state: &mut AnalysisState) -> Option<RankedChains> {
        let config = &self.config;
        let graph = &self.graph;

        let driving = classify_driving(graph, state, config.verbosity);
        log_checks!(
            config.verbosity,
            "driving: {} of {} relationships over {} successors",
            driving.driving_count,
            graph.relationship_count(),
            driving.successor_groups
        );

        let finish = find_project_finish(graph, state, &config.limits, config.verbosity)?;
        let enumeration = find_all_driving_chains_to_task(graph, state, finish, &config.limits);
        let selector = PathSelector::new(
            enumeration.chains,
            config.selected_path_index,
            config.multi_path_enabled,
        );

        log_changes!(
            config.verbosity,
            "{} driving chains to {}, selected {}",
            selector.len(),
            graph.id_of(finish),
            selector.selected_index()
        );

        Some(RankedChains {
            finish,
            selector,
            truncated: enumeration.truncated,
        })
    }

    /// Chain ranking for the report; the selected chain is marked critical
    /// only when `mark_selected` is set.
    fn run_longest_path(&self, report: &mut AnalysisReport, mark_selected: bool) {
        let graph = &self.graph;
        let Some(ranked) = self.rank_chains(&mut report.state) else {
            return;
        };
        if mark_selected {
            ranked.selector.apply(graph, &mut report.state);
        }

        report.project_finish = Some(ranked.finish);
        report.chains_truncated = ranked.truncated;
        report.chains = ranked.selector.summaries(graph);
        report.selected_chain = ranked.selector.selected_summary(graph);
        report.selected_chain_members = ranked.selector.selected_members();
    }

    /// The selected task, if set and present in the graph.
    fn selected_task(&self) -> Option<TaskIdx> {
        let id = self.config.selected_task_id.as_deref()?;
        let idx = self.graph.index_of(id);
        if idx.is_none() {
            warn!(task_id = id, "selected task not found, using the whole project");
        }
        idx
    }

    fn run_trace(&self, origin: TaskIdx, state: &AnalysisState) -> TraceResult {
        let config = &self.config;
        let direction = config.trace_direction;
        log_checks!(
            config.verbosity,
            "tracing {} from {} ({})",
            direction,
            self.graph.id_of(origin),
            config.mode
        );

        match config.mode {
            CriticalityMode::LongestPath if config.show_all_trace => {
                trace_driving(&self.graph, state, origin, direction, &config.limits)
            }
            CriticalityMode::LongestPath => best_chain_from(
                &self.graph,
                state,
                origin,
                direction,
                &config.limits,
                config.verbosity,
            ),
            CriticalityMode::FloatBased => trace_free_float(
                &self.graph,
                origin,
                direction,
                config.show_all_trace,
                &config.limits,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::graph::test_support::{fs, make_task};
    use super::*;
    use crate::config::TraceDirection;

    fn linear() -> (Vec<Task>, Vec<Relationship>) {
        (
            vec![make_task("a", 0, 5), make_task("b", 5, 3), make_task("c", 8, 2)],
            vec![fs("a", "b"), fs("b", "c")],
        )
    }

    #[test]
    fn test_empty_graph_is_noop() {
        let engine = CriticalityEngine::new(&[], &[], AnalysisConfig::default());
        let report = engine.analyze();

        assert!(report.state.tasks.is_empty());
        assert!(report.chains.is_empty());
        assert!(report.project_finish.is_none());
    }

    #[test]
    fn test_linear_chain_all_critical() {
        let (mut tasks, mut rels) = linear();
        let engine = CriticalityEngine::new(&tasks, &rels, AnalysisConfig::default());

        let report = engine.analyze_into(&mut tasks, &mut rels);

        assert!(tasks.iter().all(|t| t.is_critical && t.total_float == 0.0));
        assert!(rels.iter().all(|r| r.is_driving && r.is_critical));
        assert_eq!(report.chains.len(), 1);
        assert_eq!(report.chains[0].total_duration, 10.0);
        assert_eq!(report.project_finish, engine.graph().index_of("c"));
    }

    #[test]
    fn test_unknown_selected_task_falls_back() {
        let (tasks, rels) = linear();
        let config = AnalysisConfig {
            selected_task_id: Some("nope".to_string()),
            ..AnalysisConfig::default()
        };
        let engine = CriticalityEngine::new(&tasks, &rels, config);

        let report = engine.analyze();

        assert!(report.trace.is_none());
        assert_eq!(report.state.critical_count(), 3);
    }

    /// a(5) -> b(3) -> c(2) with d(1) feeding c two days early, and x
    /// driving d.
    fn with_feeder() -> (Vec<Task>, Vec<Relationship>) {
        let (mut tasks, mut rels) = linear();
        tasks.push(make_task("d", 5, 1));
        tasks.push(make_task("x", 0, 5));
        rels.push(fs("d", "c"));
        rels.push(fs("x", "d"));
        (tasks, rels)
    }

    #[test]
    fn test_selected_task_chain_is_critical() {
        let (mut tasks, mut rels) = with_feeder();
        let config = AnalysisConfig {
            selected_task_id: Some("d".to_string()),
            ..AnalysisConfig::default()
        };
        let engine = CriticalityEngine::new(&tasks, &rels, config);

        let report = engine.analyze_into(&mut tasks, &mut rels);

        let get = |id: &str| tasks.iter().find(|t| t.id == id).unwrap();
        for id in ["d", "x"] {
            assert!(get(id).is_critical, "{id} should be critical");
            assert_eq!(get(id).total_float, 0.0);
            assert!(get(id).is_in_trace);
        }
        for id in ["a", "b", "c"] {
            assert!(!get(id).is_critical, "{id} should not be critical");
        }
        assert!(rels[3].is_critical);
        assert!(!rels[1].is_critical);
        // Chains into the project finish are still listed
        assert_eq!(report.chains.len(), 1);
        assert_eq!(report.trace.map(|t| t.tasks.len()), Some(2));
    }

    #[test]
    fn test_selected_task_feeds_near_critical() {
        let (tasks, rels) = with_feeder();
        let config = AnalysisConfig {
            selected_task_id: Some("d".to_string()),
            float_threshold: 1.0,
            ..AnalysisConfig::default()
        };

        let report = CriticalityEngine::new(&tasks, &rels, config).analyze();

        for task in &report.state.tasks {
            assert!(!(task.is_critical && task.is_near_critical));
        }
    }

    #[test]
    fn test_float_based_selection_narrows_critical() {
        let tasks = vec![
            Task::new("a", 1.0).with_total_float(0.0),
            Task::new("b", 1.0).with_total_float(4.0),
            Task::new("z", 1.0).with_total_float(-2.0),
        ];
        let rels = vec![fs("a", "b")];
        let config = AnalysisConfig {
            mode: CriticalityMode::FloatBased,
            selected_task_id: Some("a".to_string()),
            trace_direction: TraceDirection::Forward,
            ..AnalysisConfig::default()
        };

        let report = CriticalityEngine::new(&tasks, &rels, config).analyze();

        assert!(report.state.task(0).is_critical);
        assert!(report.state.task(1).is_critical);
        assert_eq!(report.state.task(1).total_float, 4.0);
        assert!(!report.state.task(2).is_critical);
        assert!(!report.state.relationship(0).is_critical);
    }

    #[test]
    fn test_path_navigation_wraps() {
        // r forks into p(8) and q(5), both feeding s
        let tasks = vec![
            make_task("r", 0, 1),
            make_task("p", 1, 8),
            make_task("q", 4, 5),
            make_task("s", 9, 1),
        ];
        let rels = vec![fs("r", "p"), fs("r", "q"), fs("p", "s"), fs("q", "s")];
        let config = AnalysisConfig {
            multi_path_enabled: true,
            ..AnalysisConfig::default()
        };
        let mut engine = CriticalityEngine::new(&tasks, &rels, config);

        assert_eq!(engine.next_path(), 2);
        assert_eq!(engine.config().selected_path_index, 2);
        let report = engine.analyze();
        assert_eq!(report.selected_chain.map(|c| c.total_duration), Some(7.0));

        assert_eq!(engine.next_path(), 1);
        assert_eq!(engine.previous_path(), 2);
    }

    #[test]
    fn test_navigation_without_multi_path_stays_on_first() {
        let (tasks, rels) = linear();
        let mut engine = CriticalityEngine::new(&tasks, &rels, AnalysisConfig::default());

        assert_eq!(engine.next_path(), 1);
        assert_eq!(engine.previous_path(), 1);
    }

    #[test]
    fn test_mode_switch_resets_state() {
        let (tasks, rels) = linear();
        let mut engine = CriticalityEngine::new(&tasks, &rels, AnalysisConfig::default());
        assert_eq!(engine.analyze().state.critical_count(), 3);

        engine.config_mut().mode = CriticalityMode::FloatBased;
        let report = engine.analyze();

        // No supplied float: nothing is critical, no relationship drives
        assert_eq!(report.state.critical_count(), 0);
        assert!(report.state.relationships.iter().all(|r| !r.is_driving));
        assert!(report.chains.is_empty());
    }

    #[test]
    fn test_output_bundles_ids() {
        let (tasks, rels) = linear();
        let config = AnalysisConfig {
            selected_task_id: Some("c".to_string()),
            show_all_trace: false,
            ..AnalysisConfig::default()
        };
        let engine = CriticalityEngine::new(&tasks, &rels, config);

        let output = engine.output(tasks, rels);

        assert_eq!(output.project_finish_id.as_deref(), Some("c"));
        assert_eq!(output.selected_chain_task_ids, vec!["a", "b", "c"]);
        assert_eq!(output.trace_task_ids, vec!["c", "b", "a"]);
        assert!(!output.trace_truncated);
        assert!(output.tasks.iter().all(|t| t.is_in_trace));
    }
}
