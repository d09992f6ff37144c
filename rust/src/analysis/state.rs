//! Derived analysis fields, kept beside the graph.
//!
//! Passes write only into an [`AnalysisState`]; the caller's records are
//! touched once, by [`AnalysisState::apply`], after a full recomputation.

use crate::interner::TaskIdx;
use crate::models::{Relationship, Task};

use super::graph::{RelIdx, TaskGraph};

/// Derived fields of one task.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskState {
    pub is_critical: bool,
    pub is_critical_by_float: bool,
    pub is_critical_by_rel: bool,
    pub is_near_critical: bool,
    pub is_in_trace: bool,
    /// `f64::INFINITY` until a pass assigns a bounded value.
    pub total_float: f64,
}

impl Default for TaskState {
    fn default() -> Self {
        Self {
            is_critical: false,
            is_critical_by_float: false,
            is_critical_by_rel: false,
            is_near_critical: false,
            is_in_trace: false,
            total_float: f64::INFINITY,
        }
    }
}

/// Derived fields of one relationship.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipState {
    pub float: f64,
    pub is_driving: bool,
    pub is_critical: bool,
    pub is_in_trace: bool,
}

impl Default for RelationshipState {
    fn default() -> Self {
        Self {
            float: f64::INFINITY,
            is_driving: false,
            is_critical: false,
            is_in_trace: false,
        }
    }
}

/// Derived fields for a whole graph, indexed like the graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisState {
    pub tasks: Vec<TaskState>,
    pub relationships: Vec<RelationshipState>,
}

impl AnalysisState {
    /// Fresh state with every field at its default.
    pub fn new(graph: &TaskGraph) -> Self {
        Self {
            tasks: vec![TaskState::default(); graph.len()],
            relationships: vec![RelationshipState::default(); graph.relationship_count()],
        }
    }

    /// Reset every derived field, resizing to the graph if needed.
    pub fn reset(&mut self, graph: &TaskGraph) {
        self.tasks.clear();
        self.tasks.resize(graph.len(), TaskState::default());
        self.relationships.clear();
        self.relationships
            .resize(graph.relationship_count(), RelationshipState::default());
    }

    #[inline]
    pub fn task(&self, idx: TaskIdx) -> &TaskState {
        &self.tasks[idx as usize]
    }

    #[inline]
    pub fn task_mut(&mut self, idx: TaskIdx) -> &mut TaskState {
        &mut self.tasks[idx as usize]
    }

    #[inline]
    pub fn relationship(&self, rel: RelIdx) -> &RelationshipState {
        &self.relationships[rel as usize]
    }

    #[inline]
    pub fn relationship_mut(&mut self, rel: RelIdx) -> &mut RelationshipState {
        &mut self.relationships[rel as usize]
    }

    #[inline]
    pub fn is_driving(&self, rel: RelIdx) -> bool {
        self.relationships[rel as usize].is_driving
    }

    pub fn critical_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_critical).count()
    }

    pub fn near_critical_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_near_critical).count()
    }

    /// Write the derived fields onto the caller's records.
    ///
    /// Tasks are matched by id, relationships by position. Records the graph
    /// was not built from are reset to defaults.
    pub fn apply(&self, graph: &TaskGraph, tasks: &mut [Task], relationships: &mut [Relationship]) {
        for task in tasks.iter_mut() {
            let derived = graph
                .index_of(&task.id)
                .and_then(|idx| self.tasks.get(idx as usize))
                .cloned()
                .unwrap_or_default();
            task.is_critical = derived.is_critical;
            task.is_critical_by_float = derived.is_critical_by_float;
            task.is_critical_by_rel = derived.is_critical_by_rel;
            task.is_near_critical = derived.is_near_critical;
            task.is_in_trace = derived.is_in_trace;
            task.total_float = derived.total_float;
        }

        for (rel, record) in relationships.iter_mut().enumerate() {
            let derived = self.relationships.get(rel).cloned().unwrap_or_default();
            record.float = derived.float;
            record.is_driving = derived.is_driving;
            record.is_critical = derived.is_critical;
            record.is_in_trace = derived.is_in_trace;
        }
    }
}
