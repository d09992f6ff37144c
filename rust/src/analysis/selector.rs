//! Ranking, selection and navigation among enumerated chains.

use crate::interner::TaskIdx;
use crate::models::ChainSummary;

use super::chains::Chain;
use super::graph::TaskGraph;
use super::state::AnalysisState;

/// Chains sorted by total duration (longest first) with one selected.
///
/// The selected index is 1-based and always clamped into `[1, len]`. With
/// multi-path disabled the longest chain is the only selectable one.
#[derive(Clone, Debug, PartialEq)]
pub struct PathSelector {
    chains: Vec<Chain>,
    selected: usize,
    multi_path_enabled: bool,
}

impl PathSelector {
    /// Rank `chains` and select `requested_index` (clamped).
    ///
    /// The sort is stable, so equal durations keep discovery order.
    pub fn new(mut chains: Vec<Chain>, requested_index: usize, multi_path_enabled: bool) -> Self {
        chains.sort_by(|a, b| b.total_duration.total_cmp(&a.total_duration));
        let mut selector = Self {
            chains,
            selected: 1,
            multi_path_enabled,
        };
        selector.select(requested_index);
        selector
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn multi_path_enabled(&self) -> bool {
        self.multi_path_enabled
    }

    /// Current 1-based index; 1 when there are no chains.
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Chain> {
        self.chains.get(self.selected - 1)
    }

    /// Select `index`, clamped into range. Returns the index in effect.
    pub fn select(&mut self, index: usize) -> usize {
        self.selected = if self.multi_path_enabled && !self.chains.is_empty() {
            index.clamp(1, self.chains.len())
        } else {
            1
        };
        self.selected
    }

    /// Move to the next chain, wrapping to the first.
    pub fn next(&mut self) -> usize {
        let index = if self.selected >= self.chains.len() {
            1
        } else {
            self.selected + 1
        };
        self.select(index)
    }

    /// Move to the previous chain, wrapping to the last.
    pub fn previous(&mut self) -> usize {
        let index = if self.selected <= 1 {
            self.chains.len()
        } else {
            self.selected - 1
        };
        self.select(index)
    }

    /// Mark the selected chain critical.
    ///
    /// Members get `is_critical`, `is_critical_by_float` and a total float of
    /// zero; traversed relationships and the tasks they join are flagged as
    /// critical by relationship. Nothing else is touched.
    pub fn apply(&self, graph: &TaskGraph, state: &mut AnalysisState) {
        let Some(chain) = self.selected() else {
            return;
        };

        for &idx in &chain.members {
            let task = state.task_mut(idx);
            task.is_critical = true;
            task.is_critical_by_float = true;
            task.total_float = 0.0;
        }

        for &rel in &chain.relationships {
            state.relationship_mut(rel).is_critical = true;
            let edge = graph.edge(rel);
            state.task_mut(edge.predecessor).is_critical_by_rel = true;
            state.task_mut(edge.successor).is_critical_by_rel = true;
        }
    }

    fn summarize(graph: &TaskGraph, index: usize, chain: &Chain) -> ChainSummary {
        ChainSummary {
            index,
            member_count: chain.member_count(),
            total_duration: chain.total_duration,
            root_task_id: graph.id_of(chain.root).to_string(),
        }
    }

    /// Summaries of all chains, in rank order.
    pub fn summaries(&self, graph: &TaskGraph) -> Vec<ChainSummary> {
        self.chains
            .iter()
            .enumerate()
            .map(|(i, chain)| Self::summarize(graph, i + 1, chain))
            .collect()
    }

    pub fn selected_summary(&self, graph: &TaskGraph) -> Option<ChainSummary> {
        self.selected()
            .map(|chain| Self::summarize(graph, self.selected, chain))
    }

    /// Members of the selected chain in graph order.
    pub fn selected_members(&self) -> Vec<TaskIdx> {
        let mut members: Vec<TaskIdx> = self
            .selected()
            .map(|chain| chain.members.iter().copied().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }
}
