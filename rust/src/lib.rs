//! Rust implementation of the drivepath schedule criticality analysis.
//!
//! Identifies driving relationships, longest driving chains, near-critical
//! tasks and traces over a task network, and exposes them to Python.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

pub mod analysis;
mod config;
pub mod interner;
pub mod logging;
mod models;

pub use analysis::{AnalysisReport, CriticalityEngine};
pub use config::{AnalysisConfig, ConfigError, CriticalityMode, TraceDirection, TraversalLimits};
pub use models::{AnalysisOutput, ChainSummary, ModelError, Relationship, RelationshipType, Task};

/// Run one full criticality analysis.
///
/// # Arguments
/// * `tasks` - Tasks of the schedule; derived fields are ignored on input
/// * `relationships` - Dependencies between tasks, in any order
/// * `config` - Analysis configuration (defaults to longest-path, no trace)
///
/// # Returns
/// * AnalysisOutput with copies of the inputs carrying the derived fields,
///   the ranked chains and the trace
///
/// # Raises
/// * ValueError if the configuration is invalid
#[pyfunction]
#[pyo3(signature = (tasks, relationships, config=None))]
fn run_analysis(
    tasks: Vec<Task>,
    relationships: Vec<Relationship>,
    config: Option<AnalysisConfig>,
) -> PyResult<AnalysisOutput> {
    let config = config.unwrap_or_default();
    config
        .validate()
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;

    let engine = CriticalityEngine::new(&tasks, &relationships, config);
    Ok(engine.output(tasks, relationships))
}

/// The drivepath.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<Task>()?;
    m.add_class::<Relationship>()?;
    m.add_class::<RelationshipType>()?;
    m.add_class::<ChainSummary>()?;
    m.add_class::<AnalysisOutput>()?;

    // Config types
    m.add_class::<AnalysisConfig>()?;
    m.add_class::<TraversalLimits>()?;
    m.add_class::<CriticalityMode>()?;
    m.add_class::<TraceDirection>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(run_analysis, m)?)?;

    Ok(())
}
