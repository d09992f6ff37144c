//! Driving relationship classification.
//!
//! A relationship drives its successor when its float is the smallest among
//! all relationships into that successor. Ties are kept: every relationship
//! within [`FLOAT_TOLERANCE`] of the minimum drives, which is what lets the
//! chain enumeration find more than one path.

use chrono::NaiveDate;

use crate::log_debug;
use crate::models::RelationshipType;

use super::graph::{RelIdx, TaskGraph};
use super::state::AnalysisState;

/// Day tolerance for float comparisons.
pub const FLOAT_TOLERANCE: f64 = 0.001;

/// Counts from one classification pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrivingSummary {
    /// Successors with at least one incoming relationship.
    pub successor_groups: usize,
    pub driving_count: usize,
}

fn days_between(later: NaiveDate, earlier: NaiveDate) -> f64 {
    (later - earlier).num_days() as f64
}

/// Float of a relationship in days.
///
/// A supplied free float wins over the dates. With a date missing (or a lag
/// that is not a number) the float is `f64::INFINITY`, so the relationship only drives when nothing better
/// enters the same successor.
pub fn relationship_float(graph: &TaskGraph, rel: RelIdx) -> f64 {
    let edge = graph.edge(rel);
    if let Some(free_float) = edge.free_float {
        return if free_float.is_nan() {
            f64::INFINITY
        } else {
            free_float
        };
    }

    let pred = graph.node(edge.predecessor);
    let succ = graph.node(edge.successor);
    let (succ_date, pred_date) = match edge.kind {
        RelationshipType::FinishStart => (succ.start, pred.finish),
        RelationshipType::StartStart => (succ.start, pred.start),
        RelationshipType::FinishFinish => (succ.finish, pred.finish),
        RelationshipType::StartFinish => (succ.finish, pred.start),
    };

    match (succ_date, pred_date) {
        (Some(succ_date), Some(pred_date)) => {
            let float = days_between(succ_date, pred_date) - edge.lag_days;
            // NaN lag: unknown, like a missing date
            if float.is_nan() {
                f64::INFINITY
            } else {
                float
            }
        }
        _ => f64::INFINITY,
    }
}

/// Recompute float, `is_driving` and `is_critical` for every relationship.
pub fn classify_driving(
    graph: &TaskGraph,
    state: &mut AnalysisState,
    verbosity: u8,
) -> DrivingSummary {
    for rel in graph.relationship_indices() {
        let rel_state = state.relationship_mut(rel);
        rel_state.float = relationship_float(graph, rel);
        rel_state.is_driving = false;
        rel_state.is_critical = false;
    }

    let mut summary = DrivingSummary::default();
    for task in graph.task_indices() {
        let incoming = graph.incoming(task);
        if incoming.is_empty() {
            continue;
        }
        summary.successor_groups += 1;

        let min_float = incoming
            .iter()
            .map(|&rel| state.relationship(rel).float)
            .fold(f64::INFINITY, f64::min);

        for &rel in incoming {
            let rel_state = state.relationship_mut(rel);
            // `<=` on the sum keeps an all-infinite group driving
            if rel_state.float <= min_float + FLOAT_TOLERANCE {
                rel_state.is_driving = true;
                summary.driving_count += 1;
            }
        }

        log_debug!(
            verbosity,
            "successor {}: {} incoming, min float {}",
            graph.id_of(task),
            incoming.len(),
            min_float
        );
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::super::graph::test_support::{fs, make_task};
    use super::*;
    use crate::models::{Relationship, Task};

    fn classify(tasks: &[Task], rels: &[Relationship]) -> (TaskGraph, AnalysisState, DrivingSummary) {
        let graph = TaskGraph::build(tasks, rels);
        let mut state = AnalysisState::new(&graph);
        let summary = classify_driving(&graph, &mut state, 0);
        (graph, state, summary)
    }

    #[test]
    fn test_float_formulas() {
        // pred: day 0..4, succ: day 6..9
        let tasks = vec![make_task("p", 0, 4), make_task("s", 6, 3)];
        let rels = vec![
            fs("p", "s").with_lag(1.0),
            Relationship::new("p", "s", RelationshipType::StartStart),
            Relationship::new("p", "s", RelationshipType::FinishFinish).with_lag(-2.0),
            Relationship::new("p", "s", RelationshipType::StartFinish),
        ];
        let graph = TaskGraph::build(&tasks, &rels);

        assert_eq!(relationship_float(&graph, 0), 6.0 - (4.0 + 1.0));
        assert_eq!(relationship_float(&graph, 1), 6.0);
        assert_eq!(relationship_float(&graph, 2), 9.0 - (4.0 - 2.0));
        assert_eq!(relationship_float(&graph, 3), 9.0);
    }

    #[test]
    fn test_supplied_free_float_wins() {
        let tasks = vec![make_task("p", 0, 4), make_task("s", 6, 3)];
        let rels = vec![fs("p", "s").with_free_float(0.5)];
        let graph = TaskGraph::build(&tasks, &rels);

        assert_eq!(relationship_float(&graph, 0), 0.5);
    }

    #[test]
    fn test_missing_dates_give_infinite_float() {
        let tasks = vec![Task::new("p", 2.0), make_task("s", 6, 3)];
        let rels = vec![fs("p", "s")];
        let graph = TaskGraph::build(&tasks, &rels);

        assert!(relationship_float(&graph, 0).is_infinite());
    }

    #[test]
    fn test_minimum_float_drives() {
        // b finishes day 8, d finishes day 6, c starts day 8
        let tasks = vec![make_task("b", 5, 3), make_task("d", 5, 1), make_task("c", 8, 2)];
        let rels = vec![fs("b", "c"), fs("d", "c")];
        let (_, state, summary) = classify(&tasks, &rels);

        assert!(state.is_driving(0));
        assert!(!state.is_driving(1));
        assert_eq!(state.relationship(1).float, 2.0);
        assert_eq!(summary.successor_groups, 1);
        assert_eq!(summary.driving_count, 1);
    }

    #[test]
    fn test_ties_all_drive() {
        let tasks = vec![make_task("a", 0, 3), make_task("b", 1, 2), make_task("c", 3, 1)];
        let rels = vec![fs("a", "c"), fs("b", "c")];
        let (_, state, summary) = classify(&tasks, &rels);

        assert!(state.is_driving(0));
        assert!(state.is_driving(1));
        assert_eq!(summary.driving_count, 2);
    }

    #[test]
    fn test_all_infinite_group_still_drives() {
        let tasks = vec![Task::new("a", 1.0), Task::new("b", 1.0), Task::new("c", 1.0)];
        let rels = vec![fs("a", "c"), fs("b", "c")];
        let (_, state, _) = classify(&tasks, &rels);

        assert!(state.is_driving(0));
        assert!(state.is_driving(1));
    }

    #[test]
    fn test_nan_lag_still_drives() {
        let tasks = vec![make_task("a", 0, 2), make_task("b", 2, 1)];
        let rels = vec![fs("a", "b").with_lag(f64::NAN)];
        let (_, state, summary) = classify(&tasks, &rels);

        assert!(state.relationship(0).float.is_infinite());
        assert!(state.is_driving(0));
        assert_eq!(summary.driving_count, 1);
    }

    #[test]
    fn test_nan_lag_loses_to_known_float() {
        let tasks = vec![make_task("a", 0, 2), make_task("b", 0, 1), make_task("c", 4, 1)];
        let rels = vec![fs("a", "c").with_lag(f64::NAN), fs("b", "c")];
        let (_, state, _) = classify(&tasks, &rels);

        assert!(!state.is_driving(0));
        assert!(state.is_driving(1));
    }

    #[test]
    fn test_tolerance_band() {
        let tasks = vec![
            make_task("a", 0, 1),
            make_task("b", 0, 1),
            make_task("c", 0, 1),
            make_task("s", 5, 1),
        ];
        let rels = vec![
            fs("a", "s").with_free_float(0.0),
            fs("b", "s").with_free_float(0.0005),
            fs("c", "s").with_free_float(0.002),
        ];
        let (_, state, summary) = classify(&tasks, &rels);

        assert!(state.is_driving(0));
        assert!(state.is_driving(1));
        assert!(!state.is_driving(2));
        assert_eq!(summary.driving_count, 2);
    }

    #[test]
    fn test_reclassify_resets_critical() {
        let tasks = vec![make_task("a", 0, 2), make_task("b", 2, 1)];
        let rels = vec![fs("a", "b")];
        let graph = TaskGraph::build(&tasks, &rels);
        let mut state = AnalysisState::new(&graph);
        state.relationship_mut(0).is_critical = true;

        classify_driving(&graph, &mut state, 0);
        assert!(!state.relationship(0).is_critical);
        assert!(state.is_driving(0));
    }
}
