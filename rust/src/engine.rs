//! One evaluation pass over the task graph.
//!
//! The [`Engine`] owns the graph for the lifetime of one data set. A full
//! refresh rebuilds the graph, the cycle report and the WBS tree; a pass
//! recomputes only annotations (criticality, float, driving flags,
//! expand state, row order) from the current settings and selection.

use crate::config::{CriticalityMode, EngineConfig};
use crate::critical_path::{
    analyze_float_based, analyze_longest_path, enumerate_driving_chains, trace_float_path,
    ChainNavigator, FloatBasedResult, FloatTrace, LongestPathResult,
};
use crate::cycles::detect_circular_dependencies;
use crate::diagnostics::Diagnostic;
use crate::graph::TaskGraph;
use crate::interner::TaskIdx;
use crate::models::{Relationship, TaskInput};
use crate::ordering::{compose_flat, compose_grouped, Row};
use crate::traversal::into_parts;
use crate::wbs::{ExpandController, GlobalExpand, WbsHierarchy};
use crate::{log_changes, log_checks};

/// Per-pass inputs that come from user interaction rather than settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassRequest {
    /// Selected task id; the project finish is used when absent.
    pub target: Option<String>,
    /// Ids surviving legend/search filtering, in display order.
    /// `None` shows every task.
    pub visible_task_ids: Option<Vec<String>>,
    /// Caller-held "path N of M" index.
    pub selected_path: Option<usize>,
}

/// Everything one pass produced besides the annotations written onto the
/// graph and the hierarchy.
#[derive(Clone, Debug, Default)]
pub struct PassOutput {
    pub mode: CriticalityMode,
    /// Resolved target of the analysis.
    pub target: Option<TaskIdx>,
    pub project_start: Option<TaskIdx>,
    pub project_finish: Option<TaskIdx>,
    pub longest_path: Option<LongestPathResult>,
    pub float_based: Option<FloatBasedResult>,
    /// Float-based trace around a selected task.
    pub trace: Option<FloatTrace>,
    pub chains: ChainNavigator,
    pub rows: Vec<Row>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Critical-path and WBS engine for one data set.
#[derive(Clone, Debug)]
pub struct Engine {
    config: EngineConfig,
    graph: TaskGraph,
    cycles: Vec<Vec<String>>,
    hierarchy: WbsHierarchy,
    expand: ExpandController,
    /// Data-quality findings from the last refresh.
    refresh_diagnostics: Vec<Diagnostic>,
}

impl Engine {
    pub fn new(inputs: &[TaskInput], config: EngineConfig) -> Self {
        let expand = ExpandController::new(config.default_expanded);
        let mut engine = Self {
            config,
            graph: TaskGraph::default(),
            cycles: Vec::new(),
            hierarchy: WbsHierarchy::default(),
            expand,
            refresh_diagnostics: Vec::new(),
        };
        engine.refresh(inputs);
        engine
    }

    /// Full data refresh: rebuild the graph, cycle report and WBS tree.
    ///
    /// Expand state survives a refresh; groups that no longer exist simply
    /// never match their manual overrides.
    pub fn refresh(&mut self, inputs: &[TaskInput]) {
        let verbosity = self.config.verbosity;
        self.graph = TaskGraph::build(inputs, verbosity);
        self.cycles = detect_circular_dependencies(&self.graph);

        let order: Vec<TaskIdx> = (0..self.graph.len()).collect();
        self.hierarchy = WbsHierarchy::build(&mut self.graph, &order, verbosity);

        let mut diagnostics = self.graph.diagnostics().to_vec();
        diagnostics.extend(
            self.cycles
                .iter()
                .map(|chain| Diagnostic::CircularDependency {
                    chain: chain.clone(),
                }),
        );
        log_changes!(
            verbosity,
            "Refresh: {} tasks, {} relationships, {} cycles, {} diagnostics",
            self.graph.len(),
            self.graph.relationships().len(),
            self.cycles.len(),
            diagnostics.len()
        );
        self.refresh_diagnostics = diagnostics;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the settings. Takes effect on the next pass.
    pub fn set_config(&mut self, config: EngineConfig) {
        if config.default_expanded != self.config.default_expanded {
            self.expand.set_default_expanded(config.default_expanded);
        }
        self.config = config;
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Detected loops, each as `["T1", "T2", "T1"]`.
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    pub fn hierarchy(&self) -> &WbsHierarchy {
        &self.hierarchy
    }

    pub fn expand(&self) -> &ExpandController {
        &self.expand
    }

    /// Replace the expand state, e.g. one restored by the caller.
    pub fn set_expand(&mut self, expand: ExpandController) {
        self.expand = expand;
    }

    /// Step the global expand-to-level state.
    pub fn cycle_expand(&mut self) -> GlobalExpand {
        self.expand.cycle_global(self.hierarchy.max_depth())
    }

    /// Request a global expand state; out-of-range levels are clamped.
    pub fn set_expand_level(&mut self, request: GlobalExpand) -> Option<Diagnostic> {
        self.expand.set_global(request, self.hierarchy.max_depth())
    }

    /// Toggle one group relative to its currently resolved state.
    ///
    /// Resolved through the controller rather than read from the last
    /// pass, so it holds before any pass and right after a global change.
    /// Returns the new state, or `None` for an unknown group id.
    pub fn toggle_group(&mut self, group_id: &str) -> Option<bool> {
        let group = self.hierarchy.group_by_id(group_id)?;
        let (current, _) = self.expand.resolve(&group.id, group.level);
        Some(self.expand.toggle(group_id, current))
    }

    /// Run one pass: classify, enumerate chains, resolve expand state and
    /// compose rows.
    ///
    /// Every annotation from the previous pass is cleared first, so
    /// switching modes never leaves stale flags behind.
    pub fn run_pass(&mut self, request: &PassRequest) -> PassOutput {
        let (config, mut diagnostics) = self.config.normalized();
        let verbosity = config.verbosity;
        let limit = config.max_traversal_nodes;
        diagnostics.extend(self.refresh_diagnostics.iter().cloned());

        self.graph.reset_annotations();

        let target = match request.target.as_deref() {
            Some(id) => {
                let found = self.graph.lookup(id);
                if found.is_none() {
                    diagnostics.push(Diagnostic::UnknownTarget { id: id.to_string() });
                }
                found
            }
            None => None,
        };

        let mut output = PassOutput {
            mode: config.mode,
            project_start: self.graph.project_start(config.finish_tie_break),
            project_finish: self.graph.project_finish(config.finish_tie_break),
            ..Default::default()
        };

        let chains = match config.mode {
            CriticalityMode::LongestPath => {
                let (result, diags) = analyze_longest_path(&mut self.graph, target, &config);
                diagnostics.extend(diags);
                output.target = result.target;
                output.longest_path = Some(result);

                // Chains start at any task without a driving predecessor,
                // not only the project start
                output.target.map(|t| {
                    enumerate_driving_chains(
                        &self.graph,
                        t,
                        None,
                        |rel: &Relationship| rel.is_driving,
                        limit,
                        verbosity,
                    )
                })
            }
            CriticalityMode::FloatBased => {
                output.float_based = Some(analyze_float_based(&mut self.graph, &config));
                output.target = target.or(output.project_finish);

                if let Some(t) = target {
                    let (trace, diag) = into_parts(trace_float_path(&self.graph, t, limit, verbosity));
                    diagnostics.extend(diag);
                    output.trace = Some(trace);
                }

                let graph = &self.graph;
                let flagged = |idx: TaskIdx| graph.task(idx).criticality().is_flagged();
                output.target.map(|t| {
                    enumerate_driving_chains(
                        graph,
                        t,
                        None,
                        |rel: &Relationship| flagged(rel.predecessor) && flagged(rel.successor),
                        limit,
                        verbosity,
                    )
                })
            }
        };

        if let Some(result) = chains {
            let (chains, diag) = into_parts(result);
            diagnostics.extend(diag);
            output.chains = ChainNavigator::new(chains).with_selection(request.selected_path);
            log_checks!(verbosity, "Driving chains: {}", output.chains.label());
        }

        let visible = self.visible_tasks(request);
        output.rows = if config.wbs_enabled {
            self.hierarchy.refresh_criticality(&self.graph);
            self.hierarchy.apply_expand(&self.expand, verbosity);
            compose_grouped(
                &mut self.graph,
                &mut self.hierarchy,
                &visible,
                config.hide_empty_groups,
                verbosity,
            )
        } else {
            compose_flat(&mut self.graph, &visible, verbosity)
        };

        log_changes!(
            verbosity,
            "Pass ({}): {} rows, {} chains, {} diagnostics",
            config.mode.as_str(),
            output.rows.len(),
            output.chains.len(),
            diagnostics.len()
        );
        output.diagnostics = diagnostics;
        output
    }

    /// Filtered task indices in display order. Unknown ids are ignored.
    fn visible_tasks(&self, request: &PassRequest) -> Vec<TaskIdx> {
        match &request.visible_task_ids {
            Some(ids) => ids.iter().filter_map(|id| self.graph.lookup(id)).collect(),
            None => (0..self.graph.len()).collect(),
        }
    }
}
