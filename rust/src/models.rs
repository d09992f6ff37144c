//! Core data types for the criticality analysis.

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building records from host values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown relationship type: {0:?}")]
    UnknownRelationshipType(String),
}

/// Precedence type of a relationship.
///
/// Selects which predecessor/successor dates feed the float formula.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    #[default]
    FinishStart,
    StartStart,
    FinishFinish,
    StartFinish,
}

impl RelationshipType {
    /// Short code as used by scheduling tools.
    pub fn code(self) -> &'static str {
        match self {
            Self::FinishStart => "FS",
            Self::StartStart => "SS",
            Self::FinishFinish => "FF",
            Self::StartFinish => "SF",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RelationshipType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "FS" | "FINISHSTART" | "FINISHTOSTART" => Ok(Self::FinishStart),
            "SS" | "STARTSTART" | "STARTTOSTART" => Ok(Self::StartStart),
            "FF" | "FINISHFINISH" | "FINISHTOFINISH" => Ok(Self::FinishFinish),
            "SF" | "STARTFINISH" | "STARTTOFINISH" => Ok(Self::StartFinish),
            _ => Err(ModelError::UnknownRelationshipType(s.to_string())),
        }
    }
}

#[pymethods]
impl RelationshipType {
    /// Parse a relationship code such as "FS" or "StartStart".
    #[staticmethod]
    #[pyo3(name = "parse")]
    fn py_parse(code: &str) -> PyResult<Self> {
        code.parse()
            .map_err(|e: ModelError| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    fn __str__(&self) -> &'static str {
        self.code()
    }
}

/// A scheduled task.
///
/// Input fields are never touched by the analysis; the derived fields are
/// overwritten on every pass.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub duration_days: f64,
    #[pyo3(get, set)]
    pub start: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub finish: Option<NaiveDate>,
    /// Externally supplied total float, in days.
    #[pyo3(get, set)]
    pub supplied_total_float: Option<f64>,
    /// Externally supplied free float, in days.
    #[pyo3(get, set)]
    pub supplied_free_float: Option<f64>,
    #[pyo3(get, set)]
    pub predecessor_ids: Vec<String>,

    // Derived
    #[pyo3(get)]
    pub is_critical: bool,
    #[pyo3(get)]
    pub is_critical_by_float: bool,
    #[pyo3(get)]
    pub is_critical_by_rel: bool,
    #[pyo3(get)]
    pub is_near_critical: bool,
    #[pyo3(get)]
    pub is_in_trace: bool,
    /// `f64::INFINITY` when not on any bounded path.
    #[pyo3(get)]
    pub total_float: f64,
}

impl Task {
    /// Task with no dates, float or predecessors.
    pub fn new(id: impl Into<String>, duration_days: f64) -> Self {
        Self {
            id: id.into(),
            duration_days,
            start: None,
            finish: None,
            supplied_total_float: None,
            supplied_free_float: None,
            predecessor_ids: Vec::new(),
            is_critical: false,
            is_critical_by_float: false,
            is_critical_by_rel: false,
            is_near_critical: false,
            is_in_trace: false,
            total_float: f64::INFINITY,
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, finish: NaiveDate) -> Self {
        self.start = Some(start);
        self.finish = Some(finish);
        self
    }

    pub fn with_total_float(mut self, total_float: f64) -> Self {
        self.supplied_total_float = Some(total_float);
        self
    }

    pub fn with_free_float(mut self, free_float: f64) -> Self {
        self.supplied_free_float = Some(free_float);
        self
    }

    pub fn with_predecessors<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predecessor_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

#[pymethods]
impl Task {
    #[new]
    #[pyo3(signature = (
        id,
        duration_days,
        start=None,
        finish=None,
        total_float=None,
        free_float=None,
        predecessor_ids=None
    ))]
    fn py_new(
        id: String,
        duration_days: f64,
        start: Option<NaiveDate>,
        finish: Option<NaiveDate>,
        total_float: Option<f64>,
        free_float: Option<f64>,
        predecessor_ids: Option<Vec<String>>,
    ) -> Self {
        Self {
            start,
            finish,
            supplied_total_float: total_float,
            supplied_free_float: free_float,
            predecessor_ids: predecessor_ids.unwrap_or_default(),
            ..Self::new(id, duration_days)
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, duration_days={}, critical={}, near_critical={}, total_float={})",
            self.id, self.duration_days, self.is_critical, self.is_near_critical, self.total_float
        )
    }
}

/// A precedence relationship between two tasks.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    #[pyo3(get, set)]
    pub predecessor_id: String,
    #[pyo3(get, set)]
    pub successor_id: String,
    #[pyo3(get, set)]
    pub kind: RelationshipType,
    /// Signed offset in days.
    #[pyo3(get, set)]
    pub lag_days: Option<f64>,
    /// Externally supplied free float; trusted over the date formula.
    #[pyo3(get, set)]
    pub supplied_free_float: Option<f64>,

    // Derived
    #[pyo3(get)]
    pub float: f64,
    #[pyo3(get)]
    pub is_driving: bool,
    #[pyo3(get)]
    pub is_critical: bool,
    #[pyo3(get)]
    pub is_in_trace: bool,
}

impl Relationship {
    pub fn new(
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
        kind: RelationshipType,
    ) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            successor_id: successor_id.into(),
            kind,
            lag_days: None,
            supplied_free_float: None,
            float: f64::INFINITY,
            is_driving: false,
            is_critical: false,
            is_in_trace: false,
        }
    }

    /// Finish-to-start relationship with no lag.
    pub fn finish_start(predecessor_id: impl Into<String>, successor_id: impl Into<String>) -> Self {
        Self::new(predecessor_id, successor_id, RelationshipType::FinishStart)
    }

    pub fn with_lag(mut self, lag_days: f64) -> Self {
        self.lag_days = Some(lag_days);
        self
    }

    pub fn with_free_float(mut self, free_float: f64) -> Self {
        self.supplied_free_float = Some(free_float);
        self
    }

    pub fn lag(&self) -> f64 {
        self.lag_days.unwrap_or(0.0)
    }
}

#[pymethods]
impl Relationship {
    #[new]
    #[pyo3(signature = (predecessor_id, successor_id, kind=RelationshipType::FinishStart, lag_days=None, free_float=None))]
    fn py_new(
        predecessor_id: String,
        successor_id: String,
        kind: RelationshipType,
        lag_days: Option<f64>,
        free_float: Option<f64>,
    ) -> Self {
        Self {
            lag_days,
            supplied_free_float: free_float,
            ..Self::new(predecessor_id, successor_id, kind)
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Relationship({:?} -{}-> {:?}, float={}, driving={}, critical={})",
            self.predecessor_id,
            self.kind,
            self.successor_id,
            self.float,
            self.is_driving,
            self.is_critical
        )
    }
}

/// Summary of one enumerated driving chain, for path navigation.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ChainSummary {
    /// 1-based position in the duration-sorted chain list.
    #[pyo3(get)]
    pub index: usize,
    #[pyo3(get)]
    pub member_count: usize,
    #[pyo3(get)]
    pub total_duration: f64,
    #[pyo3(get)]
    pub root_task_id: String,
}

#[pymethods]
impl ChainSummary {
    fn __repr__(&self) -> String {
        format!(
            "ChainSummary(index={}, members={}, total_duration={}, root={:?})",
            self.index, self.member_count, self.total_duration, self.root_task_id
        )
    }
}

/// Everything one analysis pass hands back to the host.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct AnalysisOutput {
    /// Input tasks with derived fields filled in.
    #[pyo3(get)]
    pub tasks: Vec<Task>,
    /// Input relationships with derived fields filled in.
    #[pyo3(get)]
    pub relationships: Vec<Relationship>,
    #[pyo3(get)]
    pub chains: Vec<ChainSummary>,
    #[pyo3(get)]
    pub selected_chain: Option<ChainSummary>,
    #[pyo3(get)]
    pub selected_chain_task_ids: Vec<String>,
    #[pyo3(get)]
    pub project_finish_id: Option<String>,
    #[pyo3(get)]
    pub trace_task_ids: Vec<String>,
    #[pyo3(get)]
    pub trace_truncated: bool,
}

#[pymethods]
impl AnalysisOutput {
    fn __repr__(&self) -> String {
        format!(
            "AnalysisOutput(tasks={}, relationships={}, chains={}, project_finish={:?})",
            self.tasks.len(),
            self.relationships.len(),
            self.chains.len(),
            self.project_finish_id
        )
    }
}
