//! Python bindings (enabled with the `python` feature).

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::config::{CriticalityMode, EngineConfig};
use crate::diagnostics::EngineError;
use crate::engine::{Engine, PassRequest};
use crate::models::{DatePair, PredecessorLink, RelationshipType, TaskInput};
use crate::ordering::Row;
use crate::wbs::{ExpandController, GlobalExpand};

impl From<EngineError> for PyErr {
    fn from(err: EngineError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}

/// One ingested task row.
#[pyclass(name = "TaskInput")]
#[derive(Clone, Debug)]
pub struct PyTaskInput {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub name: Option<String>,
    #[pyo3(get, set)]
    pub duration: f64,
    /// Raw predecessor ids ("T1, T2"), all finish-to-start.
    #[pyo3(get, set)]
    pub predecessors: String,
    #[pyo3(get, set)]
    pub user_total_float: Option<f64>,
    #[pyo3(get, set)]
    pub start: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub finish: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub baseline_start: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub baseline_finish: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub previous_start: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub previous_finish: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub wbs_levels: Vec<String>,
    links: Vec<PredecessorLink>,
}

#[pymethods]
impl PyTaskInput {
    #[new]
    #[pyo3(signature = (id, duration, name=None, predecessors=String::new(), start=None, finish=None, user_total_float=None, wbs_levels=Vec::new()))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: String,
        duration: f64,
        name: Option<String>,
        predecessors: String,
        start: Option<NaiveDate>,
        finish: Option<NaiveDate>,
        user_total_float: Option<f64>,
        wbs_levels: Vec<String>,
    ) -> Self {
        Self {
            id,
            name,
            duration,
            predecessors,
            user_total_float,
            start,
            finish,
            baseline_start: None,
            baseline_finish: None,
            previous_start: None,
            previous_finish: None,
            wbs_levels,
            links: Vec::new(),
        }
    }

    /// Add a typed predecessor ("FS", "SS", "FF", "SF") with optional lag in days.
    #[pyo3(signature = (predecessor_id, relationship_type="FS", lag=None))]
    fn add_predecessor(&mut self, predecessor_id: String, relationship_type: &str, lag: Option<f64>) {
        let mut link =
            PredecessorLink::new(predecessor_id).with_type(RelationshipType::parse(relationship_type));
        link.lag = lag;
        self.links.push(link);
    }

    fn __repr__(&self) -> String {
        format!(
            "TaskInput(id={:?}, duration={}, start={:?}, finish={:?})",
            self.id, self.duration, self.start, self.finish
        )
    }
}

impl PyTaskInput {
    fn to_input(&self) -> TaskInput {
        let mut predecessors = PredecessorLink::parse_list(&self.predecessors);
        predecessors.extend(self.links.iter().cloned());
        TaskInput {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_default(),
            task_type: None,
            duration: self.duration,
            predecessors,
            user_total_float: self.user_total_float,
            dates: DatePair::new(self.start, self.finish),
            baseline: DatePair::new(self.baseline_start, self.baseline_finish),
            previous: DatePair::new(self.previous_start, self.previous_finish),
            wbs_levels: self.wbs_levels.clone(),
        }
    }
}

/// Per-task annotations from one pass.
#[pyclass(name = "TaskResult", get_all)]
#[derive(Clone, Debug)]
pub struct PyTaskResult {
    pub id: String,
    pub is_synthetic: bool,
    pub is_critical: bool,
    pub is_near_critical: bool,
    pub is_critical_by_float: bool,
    pub is_critical_by_rel: bool,
    pub total_float: Option<f64>,
    pub y_order: Option<usize>,
    pub wbs_group_id: Option<String>,
    pub wbs_indent_level: usize,
}

/// One WBS group with rollups and expand state.
#[pyclass(name = "GroupResult", get_all)]
#[derive(Clone, Debug)]
pub struct PyGroupResult {
    pub id: String,
    pub level: usize,
    pub name: String,
    pub full_path: String,
    pub parent_id: Option<String>,
    pub is_expanded: bool,
    pub y_order: Option<usize>,
    pub visible_task_count: usize,
    pub task_count: usize,
    pub summary_start: Option<NaiveDate>,
    pub summary_finish: Option<NaiveDate>,
    pub summary_baseline_start: Option<NaiveDate>,
    pub summary_baseline_finish: Option<NaiveDate>,
    pub summary_previous_start: Option<NaiveDate>,
    pub summary_previous_finish: Option<NaiveDate>,
    pub has_critical_tasks: bool,
    pub has_near_critical_tasks: bool,
}

/// Result of [`analyze`].
#[pyclass(name = "AnalysisResult", get_all)]
#[derive(Clone, Debug)]
pub struct PyAnalysisResult {
    pub mode: String,
    pub target: Option<String>,
    pub tasks: Vec<PyTaskResult>,
    pub groups: Vec<PyGroupResult>,
    /// `("group" | "task", id)` in row order.
    pub rows: Vec<(String, String)>,
    /// `(predecessor, successor)` of every driving relationship.
    pub driving_relationships: Vec<(String, String)>,
    pub cycles: Vec<Vec<String>>,
    /// Ranked chains as task id lists.
    pub chains: Vec<Vec<String>>,
    pub selected_path: Option<usize>,
    pub path_label: String,
    pub diagnostics: Vec<String>,
}

/// Run one full pass over `tasks`.
///
/// # Raises
/// * ValueError for an unknown `mode`
#[pyfunction]
#[pyo3(signature = (tasks, mode="longestPath", float_threshold=0.0, near_critical_tolerance=0.0, target=None, visible_task_ids=None, selected_path=None, wbs_enabled=true, default_expanded=true, hide_empty_groups=false, expand_to_level=None, manual_expand=HashMap::new()))]
#[allow(clippy::too_many_arguments)]
fn analyze(
    tasks: Vec<PyTaskInput>,
    mode: &str,
    float_threshold: f64,
    near_critical_tolerance: f64,
    target: Option<String>,
    visible_task_ids: Option<Vec<String>>,
    selected_path: Option<usize>,
    wbs_enabled: bool,
    default_expanded: bool,
    hide_empty_groups: bool,
    expand_to_level: Option<usize>,
    manual_expand: HashMap<String, bool>,
) -> PyResult<PyAnalysisResult> {
    let config = EngineConfig {
        mode: mode.parse::<CriticalityMode>()?,
        float_threshold,
        near_critical_tolerance,
        wbs_enabled,
        default_expanded,
        hide_empty_groups,
        ..EngineConfig::default()
    };
    let inputs: Vec<TaskInput> = tasks.iter().map(PyTaskInput::to_input).collect();
    let mut engine = Engine::new(&inputs, config);

    let mut expand_diagnostic = None;
    if let Some(level) = expand_to_level {
        expand_diagnostic = engine.set_expand_level(GlobalExpand::ToLevel(level));
    }
    let global = engine.expand().global();
    engine.set_expand(ExpandController::restore(default_expanded, global, manual_expand));

    let output = engine.run_pass(&PassRequest {
        target,
        visible_task_ids,
        selected_path,
    });

    let graph = engine.graph();
    let hierarchy = engine.hierarchy();
    let task_id = |idx: usize| graph.task(idx).id.clone();

    let tasks: Vec<PyTaskResult> = graph
        .tasks()
        .iter()
        .map(|t| PyTaskResult {
            id: t.id.clone(),
            is_synthetic: t.is_synthetic(),
            is_critical: t.is_critical(),
            is_near_critical: t.is_near_critical(),
            is_critical_by_float: t.is_critical_by_float(),
            is_critical_by_rel: t.is_critical_by_rel(),
            total_float: t.total_float,
            y_order: t.y_order,
            wbs_group_id: t.wbs_group_id.clone(),
            wbs_indent_level: t.wbs_indent_level,
        })
        .collect();

    let groups: Vec<PyGroupResult> = hierarchy
        .groups()
        .iter()
        .map(|g| PyGroupResult {
            id: g.id.clone(),
            level: g.level,
            name: g.name.clone(),
            full_path: g.full_path.clone(),
            parent_id: g.parent.map(|p| hierarchy.group(p).id.clone()),
            is_expanded: g.is_expanded,
            y_order: g.y_order,
            visible_task_count: g.visible_task_count,
            task_count: g.task_count,
            summary_start: g.summary.start,
            summary_finish: g.summary.finish,
            summary_baseline_start: g.baseline_summary.start,
            summary_baseline_finish: g.baseline_summary.finish,
            summary_previous_start: g.previous_summary.start,
            summary_previous_finish: g.previous_summary.finish,
            has_critical_tasks: g.has_critical_tasks,
            has_near_critical_tasks: g.has_near_critical_tasks,
        })
        .collect();

    let rows: Vec<(String, String)> = output
        .rows
        .iter()
        .map(|row| match *row {
            Row::Group(g) => ("group".to_string(), hierarchy.group(g).id.clone()),
            Row::Task(t) => ("task".to_string(), task_id(t)),
        })
        .collect();

    let driving_relationships: Vec<(String, String)> = graph
        .relationships()
        .iter()
        .filter(|r| r.is_driving)
        .map(|r| (r.predecessor_id.clone(), r.successor_id.clone()))
        .collect();

    let chains: Vec<Vec<String>> = output
        .chains
        .chains()
        .iter()
        .map(|c| c.tasks.iter().map(|&t| task_id(t)).collect())
        .collect();

    let diagnostics: Vec<String> = expand_diagnostic
        .iter()
        .chain(&output.diagnostics)
        .map(|d| d.to_string())
        .collect();

    Ok(PyAnalysisResult {
        mode: output.mode.as_str().to_string(),
        target: output.target.map(task_id),
        tasks,
        groups,
        rows,
        driving_relationships,
        cycles: engine.cycles().to_vec(),
        chains,
        selected_path: output.chains.selected_index(),
        path_label: output.chains.label(),
        diagnostics,
    })
}

/// The cpgantt.rust Python module.
#[pymodule]
pub fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Data types
    m.add_class::<PyTaskInput>()?;
    m.add_class::<PyTaskResult>()?;
    m.add_class::<PyGroupResult>()?;
    m.add_class::<PyAnalysisResult>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(analyze, m)?)?;

    Ok(())
}
