//! Criticality straight from externally supplied total float.
//!
//! No graph walk: each task is judged on its own float. Relationships are
//! never driving or critical in this mode.

use crate::log_changes;

use super::graph::TaskGraph;
use super::state::AnalysisState;

/// Counts from one float-based pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FloatSummary {
    pub critical: usize,
    pub near_critical: usize,
    /// Tasks without a supplied total float.
    pub without_float: usize,
}

/// Apply the supplied total float of every task.
///
/// `total_float <= 0` is critical; `0 < total_float <= threshold` is
/// near-critical when the threshold is positive. The supplied value is
/// copied verbatim. Tasks without one keep the defaults.
pub fn apply_task_float(
    graph: &TaskGraph,
    state: &mut AnalysisState,
    threshold: f64,
    verbosity: u8,
) -> FloatSummary {
    let mut summary = FloatSummary::default();

    for rel in graph.relationship_indices() {
        let rel_state = state.relationship_mut(rel);
        rel_state.is_driving = false;
        rel_state.is_critical = false;
    }

    for idx in graph.task_indices() {
        let Some(total_float) = graph.node(idx).total_float.filter(|tf| !tf.is_nan()) else {
            summary.without_float += 1;
            continue;
        };

        let task = state.task_mut(idx);
        task.total_float = total_float;
        task.is_critical = total_float <= 0.0;
        task.is_critical_by_float = task.is_critical;
        task.is_near_critical = threshold > 0.0 && total_float > 0.0 && total_float <= threshold;

        if task.is_critical {
            summary.critical += 1;
        } else if task.is_near_critical {
            summary.near_critical += 1;
        }
    }

    log_changes!(
        verbosity,
        "float-based pass: {} critical, {} near-critical, {} without float",
        summary.critical,
        summary.near_critical,
        summary.without_float
    );
    summary
}
