//! Float-based classification from caller-supplied total float.

use crate::config::EngineConfig;
use crate::graph::TaskGraph;
use crate::interner::TaskIdx;
use crate::models::RelIdx;
use crate::traversal::{Traversal, TraversalResult};
use crate::{log_changes, log_debug};

use super::types::{Classification, Criticality, DAYS_EPSILON};

/// Counts from one float-based classification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FloatBasedResult {
    pub critical: usize,
    pub near_critical: usize,
    /// Tasks without a user-provided float (left Normal).
    pub unclassified: usize,
}

/// Tasks and relationships connected to a selected task through
/// critical or near-critical neighbours.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FloatTrace {
    pub target: TaskIdx,
    /// Upstream tasks in visit order (target excluded).
    pub predecessors: Vec<TaskIdx>,
    /// Downstream tasks in visit order (target excluded).
    pub successors: Vec<TaskIdx>,
    pub relationships: Vec<RelIdx>,
}

/// Classify one float value.
///
/// `float <= 0` is critical, `0 < float <= threshold` is near-critical.
/// A missing float is Normal.
pub fn classify_float(float: Option<f64>, threshold: f64) -> Criticality {
    match float {
        Some(f) if f <= DAYS_EPSILON => Criticality::Critical,
        Some(f) if f <= threshold + DAYS_EPSILON => Criticality::NearCritical,
        _ => Criticality::Normal,
    }
}

/// Classify every task from its `user_total_float`.
///
/// The threshold is expected to be clamped already (see
/// `EngineConfig::normalized`); negative values are treated as zero.
pub fn analyze_float_based(graph: &mut TaskGraph, config: &EngineConfig) -> FloatBasedResult {
    let threshold = config.float_threshold.max(0.0);
    let mut result = FloatBasedResult::default();

    for task in graph.tasks_mut() {
        let level = classify_float(task.user_total_float, threshold);
        match level {
            Criticality::Critical => result.critical += 1,
            Criticality::NearCritical => result.near_critical += 1,
            Criticality::Normal if task.user_total_float.is_none() => result.unclassified += 1,
            Criticality::Normal => {}
        }
        task.total_float = task.user_total_float;
        task.classification = Some(Classification::float_based(level));
    }

    let flags: Vec<Criticality> = graph.tasks().iter().map(|t| t.criticality()).collect();
    for rel in graph.relationships_mut() {
        rel.is_critical = flags[rel.predecessor] == Criticality::Critical
            && flags[rel.successor] == Criticality::Critical;
    }

    log_changes!(
        config.verbosity,
        "Float-based (threshold {}): {} critical, {} near-critical, {} without float",
        threshold,
        result.critical,
        result.near_critical,
        result.unclassified
    );
    result
}

/// Trace predecessors and successors of `target` through relationships
/// whose endpoints are both critical or near-critical.
///
/// A single visited set covers both directions. Hitting `limit` yields
/// the partial trace.
pub fn trace_float_path(
    graph: &TaskGraph,
    target: TaskIdx,
    limit: usize,
    verbosity: u8,
) -> TraversalResult<FloatTrace> {
    let mut traversal = Traversal::new("float path trace", limit);
    let mut trace = FloatTrace {
        target,
        ..Default::default()
    };
    traversal.visit(target);

    let flagged = |idx: TaskIdx| graph.task(idx).criticality().is_flagged();

    if flagged(target) {
        // Upstream
        let mut stack = vec![target];
        'up: while let Some(node) = stack.pop() {
            for (rel_idx, rel) in graph.incoming(node) {
                if !flagged(rel.predecessor) || traversal.is_visited(rel.predecessor) {
                    continue;
                }
                if !traversal.visit(rel.predecessor) {
                    break 'up;
                }
                log_debug!(verbosity, "trace up: {} <- {}", rel.successor_id, rel.predecessor_id);
                trace.relationships.push(rel_idx);
                trace.predecessors.push(rel.predecessor);
                stack.push(rel.predecessor);
            }
        }

        // Downstream
        let mut stack = vec![target];
        'down: while let Some(node) = stack.pop() {
            if traversal.is_exhausted() {
                break;
            }
            for (rel_idx, rel) in graph.outgoing(node) {
                if !flagged(rel.successor) || traversal.is_visited(rel.successor) {
                    continue;
                }
                if !traversal.visit(rel.successor) {
                    break 'down;
                }
                log_debug!(verbosity, "trace down: {} -> {}", rel.predecessor_id, rel.successor_id);
                trace.relationships.push(rel_idx);
                trace.successors.push(rel.successor);
                stack.push(rel.successor);
            }
        }
    }

    traversal.finish(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredecessorLink, TaskInput};

    fn make_task(id: &str, float: Option<f64>, preds: &[&str]) -> TaskInput {
        let mut t = TaskInput::new(id, 2.0);
        t.user_total_float = float;
        for p in preds {
            t = t.with_predecessor(PredecessorLink::new(*p));
        }
        t
    }

    fn config(threshold: f64) -> EngineConfig {
        EngineConfig {
            float_threshold: threshold,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_classify_float_boundaries() {
        assert_eq!(classify_float(Some(0.0), 5.0), Criticality::Critical);
        assert_eq!(classify_float(Some(-2.0), 5.0), Criticality::Critical);
        assert_eq!(classify_float(Some(5.0), 5.0), Criticality::NearCritical);
        assert_eq!(classify_float(Some(0.5), 5.0), Criticality::NearCritical);
        assert_eq!(classify_float(Some(5.5), 5.0), Criticality::Normal);
        assert_eq!(classify_float(None, 5.0), Criticality::Normal);
        // Zero threshold: anything positive is normal
        assert_eq!(classify_float(Some(0.5), 0.0), Criticality::Normal);
    }

    #[test]
    fn test_analyze_sets_flags_and_float() {
        let mut graph = TaskGraph::build(
            &[
                make_task("A", Some(0.0), &[]),
                make_task("B", Some(3.0), &["A"]),
                make_task("C", Some(4.0), &["A"]),
                make_task("D", None, &[]),
            ],
            0,
        );
        let result = analyze_float_based(&mut graph, &config(3.0));

        assert_eq!(
            result,
            FloatBasedResult {
                critical: 1,
                near_critical: 1,
                unclassified: 1
            }
        );
        let a = graph.task_by_id("A").unwrap();
        assert!(a.is_critical() && a.is_critical_by_float() && !a.is_critical_by_rel());
        let b = graph.task_by_id("B").unwrap();
        assert!(b.is_near_critical() && !b.is_critical());
        assert_eq!(b.total_float, Some(3.0));
        assert!(!graph.task_by_id("C").unwrap().is_near_critical());
        assert!(graph.relationships().iter().all(|r| !r.is_critical));
    }

    #[test]
    fn test_trace_follows_flagged_neighbours_only() {
        // A(0) -> B(1) -> C(0) -> D(10); A -> X(10) -> C
        let mut graph = TaskGraph::build(
            &[
                make_task("A", Some(0.0), &[]),
                make_task("B", Some(1.0), &["A"]),
                make_task("X", Some(10.0), &["A"]),
                make_task("C", Some(0.0), &["B", "X"]),
                make_task("D", Some(10.0), &["C"]),
            ],
            0,
        );
        analyze_float_based(&mut graph, &config(2.0));

        let b = graph.lookup("B").unwrap();
        let trace = trace_float_path(&graph, b, 100, 0).unwrap();
        let names = |idxs: &[TaskIdx]| -> Vec<String> {
            idxs.iter().map(|&i| graph.task(i).id.clone()).collect()
        };

        assert_eq!(names(&trace.predecessors), vec!["A"]);
        assert_eq!(names(&trace.successors), vec!["C"]);
        assert_eq!(trace.relationships.len(), 2);
    }

    #[test]
    fn test_trace_of_normal_task_is_empty() {
        let mut graph = TaskGraph::build(
            &[make_task("A", Some(0.0), &[]), make_task("B", Some(9.0), &["A"])],
            0,
        );
        analyze_float_based(&mut graph, &config(1.0));
        let b = graph.lookup("B").unwrap();
        let trace = trace_float_path(&graph, b, 100, 0).unwrap();
        assert!(trace.predecessors.is_empty() && trace.successors.is_empty());
    }

    #[test]
    fn test_trace_cap_yields_partial() {
        let mut tasks = vec![make_task("T0", Some(0.0), &[])];
        for i in 1..50 {
            let prev = format!("T{}", i - 1);
            tasks.push(make_task(&format!("T{}", i), Some(0.0), &[prev.as_str()]));
        }
        let mut graph = TaskGraph::build(&tasks, 0);
        analyze_float_based(&mut graph, &config(0.0));

        let last = graph.lookup("T49").unwrap();
        let err = trace_float_path(&graph, last, 10, 0).unwrap_err();
        assert_eq!(err.partial.predecessors.len(), 9);
        assert_eq!(err.visited, 10);
    }
}
