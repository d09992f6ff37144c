//! Schedule criticality analysis.
//!
//! Finds the driving relationships between tasks, enumerates the driving
//! chains into the project finish, marks the selected chain critical and
//! the tasks close to it near-critical. Alternatively, criticality is read
//! straight from externally supplied float. Selecting a task replaces the
//! whole-project critical set with the trace from that task.

mod chains;
mod driving;
mod engine;
mod float_based;
mod graph;
mod near_critical;
mod selector;
mod state;
mod trace;

pub use chains::{find_all_driving_chains_to_task, find_project_finish, Chain, Enumeration};
pub use driving::{classify_driving, relationship_float, DrivingSummary, FLOAT_TOLERANCE};
pub use engine::{AnalysisReport, CriticalityEngine};
pub use float_based::{apply_task_float, FloatSummary};
pub use graph::{RelIdx, RelationshipEdge, TaskGraph, TaskNode};
pub use near_critical::{classify_near_critical, NearCriticalSummary};
pub use selector::PathSelector;
pub use state::{AnalysisState, RelationshipState, TaskState};
pub use trace::{best_chain_from, trace_driving, trace_free_float, TraceResult};
