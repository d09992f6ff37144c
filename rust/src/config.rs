//! Configuration types for the criticality analysis.

use pyo3::prelude::*;
use std::fmt;
use thiserror::Error;

/// Errors raised by the validating config constructor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("float threshold must be a finite value >= 0, got {0}")]
    InvalidThreshold(f64),
    #[error("selected path index is 1-based, got 0")]
    ZeroPathIndex,
}

/// How task criticality is decided.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CriticalityMode {
    /// Criticality from graph-walked driving chains to the project finish.
    #[default]
    LongestPath,
    /// Criticality straight from the externally supplied total float.
    FloatBased,
}

impl fmt::Display for CriticalityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongestPath => write!(f, "longest-path"),
            Self::FloatBased => write!(f, "float-based"),
        }
    }
}

/// Direction of a trace from the selected task.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TraceDirection {
    /// Toward predecessors.
    #[default]
    Backward,
    /// Toward successors.
    Forward,
}

impl fmt::Display for TraceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backward => write!(f, "backward"),
            Self::Forward => write!(f, "forward"),
        }
    }
}

/// Safety bounds applied to every traversal.
///
/// Exceeding a bound truncates the walk; it never fails.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct TraversalLimits {
    /// Maximum chain length (tasks) explored by a depth-first walk.
    #[pyo3(get, set)]
    pub max_depth: usize,
    /// Maximum loop iterations of any single walk.
    #[pyo3(get, set)]
    pub max_iterations: usize,
    /// Maximum chains recorded by one enumeration.
    #[pyo3(get, set)]
    pub max_chains: usize,
    /// Maximum tasks visited by a breadth-first trace.
    #[pyo3(get, set)]
    pub max_trace_tasks: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_iterations: 50_000,
            max_chains: 10_000,
            max_trace_tasks: 10_000,
        }
    }
}

#[pymethods]
impl TraversalLimits {
    #[new]
    #[pyo3(signature = (max_depth=None, max_iterations=None, max_chains=None, max_trace_tasks=None))]
    fn new(
        max_depth: Option<usize>,
        max_iterations: Option<usize>,
        max_chains: Option<usize>,
        max_trace_tasks: Option<usize>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            max_depth: max_depth.unwrap_or(defaults.max_depth),
            max_iterations: max_iterations.unwrap_or(defaults.max_iterations),
            max_chains: max_chains.unwrap_or(defaults.max_chains),
            max_trace_tasks: max_trace_tasks.unwrap_or(defaults.max_trace_tasks),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "TraversalLimits(max_depth={}, max_iterations={}, max_chains={}, max_trace_tasks={})",
            self.max_depth, self.max_iterations, self.max_chains, self.max_trace_tasks
        )
    }
}

/// Configuration of one analysis pass.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    #[pyo3(get, set)]
    pub mode: CriticalityMode,
    /// Near-critical tolerance in days; 0 disables the near-critical pass.
    #[pyo3(get, set)]
    pub float_threshold: f64,
    /// When false only the longest chain can be selected.
    #[pyo3(get, set)]
    pub multi_path_enabled: bool,
    /// 1-based index into the chains sorted by duration.
    #[pyo3(get, set)]
    pub selected_path_index: usize,
    #[pyo3(get, set)]
    pub selected_task_id: Option<String>,
    #[pyo3(get, set)]
    pub trace_direction: TraceDirection,
    /// Trace every reachable task instead of the single best chain.
    #[pyo3(get, set)]
    pub show_all_trace: bool,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    #[pyo3(get, set)]
    pub verbosity: u8,
    #[pyo3(get, set)]
    pub limits: TraversalLimits,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: CriticalityMode::LongestPath,
            float_threshold: 0.0,
            multi_path_enabled: false,
            selected_path_index: 1,
            selected_task_id: None,
            trace_direction: TraceDirection::Backward,
            show_all_trace: true,
            verbosity: 0,
            limits: TraversalLimits::default(),
        }
    }
}

impl AnalysisConfig {
    /// Check the values a host can get wrong.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.float_threshold.is_finite() || self.float_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.float_threshold));
        }
        if self.selected_path_index == 0 {
            return Err(ConfigError::ZeroPathIndex);
        }
        Ok(())
    }

    /// Threshold actually used by the passes; bad values disable the feature.
    pub fn effective_threshold(&self) -> f64 {
        if self.float_threshold.is_finite() && self.float_threshold > 0.0 {
            self.float_threshold
        } else {
            0.0
        }
    }
}

#[pymethods]
impl AnalysisConfig {
    #[new]
    #[pyo3(signature = (
        mode=None,
        float_threshold=None,
        multi_path_enabled=None,
        selected_path_index=None,
        selected_task_id=None,
        trace_direction=None,
        show_all_trace=None,
        verbosity=None,
        limits=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        mode: Option<CriticalityMode>,
        float_threshold: Option<f64>,
        multi_path_enabled: Option<bool>,
        selected_path_index: Option<usize>,
        selected_task_id: Option<String>,
        trace_direction: Option<TraceDirection>,
        show_all_trace: Option<bool>,
        verbosity: Option<u8>,
        limits: Option<TraversalLimits>,
    ) -> PyResult<Self> {
        let defaults = Self::default();
        let config = Self {
            mode: mode.unwrap_or(defaults.mode),
            float_threshold: float_threshold.unwrap_or(defaults.float_threshold),
            multi_path_enabled: multi_path_enabled.unwrap_or(defaults.multi_path_enabled),
            selected_path_index: selected_path_index.unwrap_or(defaults.selected_path_index),
            selected_task_id,
            trace_direction: trace_direction.unwrap_or(defaults.trace_direction),
            show_all_trace: show_all_trace.unwrap_or(defaults.show_all_trace),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            limits: limits.unwrap_or(defaults.limits),
        };
        config
            .validate()
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
        Ok(config)
    }

    fn __repr__(&self) -> String {
        format!(
            "AnalysisConfig(mode={}, float_threshold={}, multi_path_enabled={}, selected_path_index={}, selected_task_id={:?}, trace_direction={})",
            self.mode,
            self.float_threshold,
            self.multi_path_enabled,
            self.selected_path_index,
            self.selected_task_id,
            self.trace_direction
        )
    }
}
