//! Reflective longest-path analysis.
//!
//! Scheduled dates are taken as authoritative. Instead of a forward/backward
//! CPM pass over durations, the analyzer measures the gap each relationship
//! leaves between its predecessor and successor, marks the tightest incoming
//! edges as driving, and walks them back from a target task.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostic;
use crate::graph::TaskGraph;
use crate::interner::TaskIdx;
use crate::models::{RelIdx, Relationship};
use crate::traversal::{into_parts, Traversal, TraversalResult};
use crate::{log_changes, log_checks, log_debug};

use super::types::{Classification, Criticality, DAYS_EPSILON};

/// Result of one longest-path classification.
#[derive(Clone, Debug, Default)]
pub struct LongestPathResult {
    /// Task the analysis was anchored on.
    pub target: Option<TaskIdx>,
    /// Tasks on a driving chain into the target, in walk order.
    pub critical: Vec<TaskIdx>,
    /// Off-chain tasks within the slack tolerance.
    pub near_critical: Vec<TaskIdx>,
    /// Relationships marked driving.
    pub driving: Vec<RelIdx>,
}

/// Implied float of a relationship in days.
///
/// The gap between the predecessor's contribution date (finish or start,
/// plus lag) and the successor's constrained date (start or finish).
/// `None` when either side is undated.
pub fn relationship_float(graph: &TaskGraph, rel: &Relationship) -> Option<f64> {
    let pred = graph.task(rel.predecessor);
    let succ = graph.task(rel.successor);

    let from = if rel.rel_type.from_start() {
        pred.dates.start
    } else {
        pred.dates.finish
    }?;
    let to = if rel.rel_type.to_finish() {
        succ.dates.finish
    } else {
        succ.dates.start
    }?;

    Some((to - from).num_days() as f64 - rel.lag_days())
}

/// Compute each relationship's float and mark the driving ones.
///
/// A relationship drives its successor when its float equals the minimum
/// float among the successor's dated incoming relationships. Ties at the
/// minimum are all driving.
pub fn mark_driving_relationships(graph: &mut TaskGraph, verbosity: u8) -> Vec<RelIdx> {
    let snapshot: &TaskGraph = graph;
    let floats: Vec<Option<f64>> = snapshot
        .relationships()
        .iter()
        .map(|rel| relationship_float(snapshot, rel))
        .collect();

    let mut min_incoming: Vec<Option<f64>> = vec![None; snapshot.len()];
    for (rel, float) in snapshot.relationships().iter().zip(&floats) {
        if let Some(f) = *float {
            let slot = &mut min_incoming[rel.successor];
            *slot = Some(slot.map_or(f, |cur| cur.min(f)));
        }
    }

    let mut driving = Vec::new();
    for (idx, rel) in graph.relationships_mut().iter_mut().enumerate() {
        rel.free_float = floats[idx];
        rel.is_driving = match (floats[idx], min_incoming[rel.successor]) {
            (Some(f), Some(min)) => f - min < DAYS_EPSILON,
            _ => false,
        };
        if rel.is_driving {
            driving.push(idx);
        }
        log_checks!(
            verbosity,
            "{} {} -> {}: float {:?}, driving {}",
            rel.rel_type.as_str(),
            rel.predecessor_id,
            rel.successor_id,
            rel.free_float,
            rel.is_driving
        );
    }
    driving
}

/// Walk driving relationships backward from `target`.
///
/// One visited set spans the whole walk, so the walk terminates on cyclic
/// or duplicated-edge graphs. Returns tasks in visit order.
pub fn walk_driving_predecessors(
    graph: &TaskGraph,
    target: TaskIdx,
    limit: usize,
) -> TraversalResult<Vec<TaskIdx>> {
    let mut traversal = Traversal::new("driving predecessor walk", limit);
    let mut order = Vec::new();
    let mut stack = vec![target];
    traversal.visit(target);

    while let Some(node) = stack.pop() {
        order.push(node);
        for (_, rel) in graph.incoming(node) {
            if !rel.is_driving || traversal.is_visited(rel.predecessor) {
                continue;
            }
            if !traversal.visit(rel.predecessor) {
                break;
            }
            stack.push(rel.predecessor);
        }
        if traversal.is_exhausted() {
            break;
        }
    }

    traversal.finish(order)
}

/// Day count ordered for the slack heap.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Days(f64);

impl Eq for Days {}

impl Ord for Days {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Days {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Slack of every task relative to `target`, in days.
///
/// A task that reaches the target through successors can slip by the
/// smallest accumulated excess float along any such route, where a
/// relationship's excess is its float above the minimum into its successor
/// (zero for driving edges). Tasks with no route to the target fall back to
/// the gap between their finish and the target's finish. Undated or
/// unrelated tasks get `None`.
pub fn compute_slack(
    graph: &TaskGraph,
    target: TaskIdx,
    limit: usize,
) -> TraversalResult<Vec<Option<f64>>> {
    let n = graph.len();
    let mut min_incoming: Vec<Option<f64>> = vec![None; n];
    for rel in graph.relationships() {
        if let Some(f) = rel.free_float {
            let slot = &mut min_incoming[rel.successor];
            *slot = Some(slot.map_or(f, |cur| cur.min(f)));
        }
    }

    let mut slack: Vec<Option<f64>> = vec![None; n];
    let mut traversal = Traversal::new("slack propagation", limit);
    let mut heap: BinaryHeap<Reverse<(Days, TaskIdx)>> = BinaryHeap::new();
    slack[target] = Some(0.0);
    heap.push(Reverse((Days(0.0), target)));

    // Excess floats are non-negative, so settled nodes never improve
    while let Some(Reverse((Days(dist), node))) = heap.pop() {
        if traversal.is_visited(node) {
            continue;
        }
        if !traversal.visit(node) {
            break;
        }
        for (_, rel) in graph.incoming(node) {
            let (Some(f), Some(min)) = (rel.free_float, min_incoming[node]) else {
                continue;
            };
            let candidate = dist + (f - min).max(0.0);
            let pred = rel.predecessor;
            if slack[pred].map_or(true, |cur| candidate < cur - DAYS_EPSILON) {
                slack[pred] = Some(candidate);
                heap.push(Reverse((Days(candidate), pred)));
            }
        }
    }

    if let Some(target_finish) = graph.task(target).dates.finish {
        for (idx, task) in graph.tasks().iter().enumerate() {
            if slack[idx].is_some() {
                continue;
            }
            if let Some(finish) = task.dates.finish {
                let gap = (target_finish - finish).num_days() as f64;
                if gap >= 0.0 {
                    slack[idx] = Some(gap);
                }
            }
        }
    }

    traversal.finish(slack)
}

/// Classify every task with the reflective longest-path model.
///
/// `target` defaults to the project-finish task. Writes classifications,
/// `total_float` and relationship flags onto the graph.
pub fn analyze_longest_path(
    graph: &mut TaskGraph,
    target: Option<TaskIdx>,
    config: &EngineConfig,
) -> (LongestPathResult, Vec<Diagnostic>) {
    let verbosity = config.verbosity;
    let mut diagnostics = Vec::new();

    let driving = mark_driving_relationships(graph, verbosity);

    let target = target.or_else(|| graph.project_finish(config.finish_tie_break));
    let Some(target) = target else {
        log_changes!(verbosity, "Longest path: no dated task to anchor on");
        for task in graph.tasks_mut() {
            task.classification = Some(Classification::longest_path(Criticality::Normal));
        }
        return (
            LongestPathResult {
                driving,
                ..Default::default()
            },
            diagnostics,
        );
    };

    let (critical, diag) = into_parts(walk_driving_predecessors(
        graph,
        target,
        config.max_traversal_nodes,
    ));
    diagnostics.extend(diag);

    let (mut slack, diag) = into_parts(compute_slack(graph, target, config.max_traversal_nodes));
    diagnostics.extend(diag);

    let mut on_chain = vec![false; graph.len()];
    for &idx in &critical {
        on_chain[idx] = true;
        slack[idx] = Some(0.0);
    }

    let tolerance = config.near_critical_tolerance;
    let mut near_critical = Vec::new();
    for (idx, task) in graph.tasks_mut().iter_mut().enumerate() {
        let level = if on_chain[idx] {
            Criticality::Critical
        } else if slack[idx].is_some_and(|s| s <= tolerance + DAYS_EPSILON) {
            near_critical.push(idx);
            Criticality::NearCritical
        } else {
            Criticality::Normal
        };
        task.total_float = slack[idx];
        task.classification = Some(Classification::longest_path(level));
        log_debug!(verbosity, "{}: slack {:?}, {:?}", task.id, slack[idx], level);
    }

    for rel in graph.relationships_mut() {
        rel.is_critical = rel.is_driving && on_chain[rel.predecessor] && on_chain[rel.successor];
    }

    log_changes!(
        verbosity,
        "Longest path to {}: {} critical, {} near-critical, {} driving relationships",
        graph.task(target).id,
        critical.len(),
        near_critical.len(),
        driving.len()
    );

    (
        LongestPathResult {
            target: Some(target),
            critical,
            near_critical,
            driving,
        },
        diagnostics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredecessorLink, RelationshipType, TaskInput};
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn make_task(id: &str, start: u32, finish: u32, preds: &[&str]) -> TaskInput {
        let mut t = TaskInput::new(id, (finish - start + 1) as f64)
            .with_dates(date(1, start), date(1, finish));
        for p in preds {
            t = t.with_predecessor(PredecessorLink::new(*p));
        }
        t
    }

    fn ids(graph: &TaskGraph, idxs: &[TaskIdx]) -> Vec<String> {
        let mut out: Vec<String> = idxs.iter().map(|&i| graph.task(i).id.clone()).collect();
        out.sort();
        out
    }

    fn rel_between<'a>(graph: &'a TaskGraph, pred: &str, succ: &str) -> &'a Relationship {
        graph
            .relationships()
            .iter()
            .find(|r| r.predecessor_id == pred && r.successor_id == succ)
            .unwrap()
    }

    #[test]
    fn test_relationship_float_by_type() {
        let a = make_task("A", 1, 5, &[]);
        let fs = make_task("FS", 8, 9, &["A"]);
        let ss = make_task("SS", 3, 9, &[])
            .with_predecessor(PredecessorLink::new("A").with_type(RelationshipType::StartToStart));
        let ff = make_task("FF", 3, 7, &[]).with_predecessor(
            PredecessorLink::new("A")
                .with_type(RelationshipType::FinishToFinish)
                .with_lag(1.0),
        );
        let graph = TaskGraph::build(&[a, fs, ss, ff], 0);

        let float = |succ: &str| relationship_float(&graph, rel_between(&graph, "A", succ));
        assert_eq!(float("FS"), Some(3.0)); // Jan 8 - Jan 5
        assert_eq!(float("SS"), Some(2.0)); // Jan 3 - Jan 1
        assert_eq!(float("FF"), Some(1.0)); // Jan 7 - (Jan 5 + 1)
    }

    #[test]
    fn test_undated_relationship_has_no_float() {
        let graph = TaskGraph::build(&[make_task("T1", 1, 6, &["EXTERNAL"])], 0);
        assert_eq!(relationship_float(&graph, &graph.relationships()[0]), None);
    }

    #[test]
    fn test_fan_out_scenario() {
        // T1 (Jan 1-6) -> T2 (Jan 7-10), T1 -> T3 (Jan 7-9)
        let mut graph = TaskGraph::build(
            &[
                make_task("T1", 1, 6, &[]),
                make_task("T2", 7, 10, &["T1"]),
                make_task("T3", 7, 9, &["T1"]),
            ],
            0,
        );
        let (result, diagnostics) = analyze_longest_path(&mut graph, None, &EngineConfig::default());

        assert!(diagnostics.is_empty());
        assert_eq!(result.target, graph.lookup("T2"));
        assert_eq!(ids(&graph, &result.critical), vec!["T1", "T2"]);
        assert!(rel_between(&graph, "T1", "T2").is_driving);
        assert!(rel_between(&graph, "T1", "T2").is_critical);
        // T3's only incoming edge is T1 -> T3, so it drives T3, but T3 is off the chain
        assert!(!rel_between(&graph, "T1", "T3").is_critical);

        let t3 = graph.task_by_id("T3").unwrap();
        assert!(!t3.is_critical());
        assert_eq!(t3.total_float, Some(1.0));
        // Default tolerance 0: one day of slack is not near-critical
        assert!(!t3.is_near_critical());
    }

    #[test]
    fn test_near_critical_within_tolerance() {
        let mut graph = TaskGraph::build(
            &[
                make_task("T1", 1, 6, &[]),
                make_task("T2", 7, 10, &["T1"]),
                make_task("T3", 7, 9, &["T1"]),
            ],
            0,
        );
        let config = EngineConfig {
            near_critical_tolerance: 1.0,
            ..EngineConfig::default()
        };
        let (result, _) = analyze_longest_path(&mut graph, None, &config);

        assert_eq!(ids(&graph, &result.near_critical), vec!["T3"]);
        let t3 = graph.task_by_id("T3").unwrap();
        assert!(t3.is_near_critical());
        assert!(!t3.is_critical_by_rel());
        assert!(graph.task_by_id("T2").unwrap().is_critical_by_rel());
    }

    #[test]
    fn test_tightest_incoming_edge_drives() {
        // A finishes Jan 5, B finishes Jan 8; C starts Jan 9, so B -> C is tighter
        let mut graph = TaskGraph::build(
            &[
                make_task("A", 1, 5, &[]),
                make_task("B", 2, 8, &[]),
                make_task("C", 9, 12, &["A", "B"]),
            ],
            0,
        );
        let (result, _) = analyze_longest_path(&mut graph, None, &EngineConfig::default());

        assert!(rel_between(&graph, "B", "C").is_driving);
        assert!(!rel_between(&graph, "A", "C").is_driving);
        assert_eq!(ids(&graph, &result.critical), vec!["B", "C"]);
        // A could slip 3 days before it drives C
        assert_eq!(graph.task_by_id("A").unwrap().total_float, Some(3.0));
    }

    #[test]
    fn test_ties_mark_all_driving() {
        let mut graph = TaskGraph::build(
            &[
                make_task("A", 1, 5, &[]),
                make_task("B", 2, 5, &[]),
                make_task("C", 6, 9, &["A", "B"]),
            ],
            0,
        );
        let (result, _) = analyze_longest_path(&mut graph, None, &EngineConfig::default());

        assert_eq!(result.driving.len(), 2);
        assert_eq!(ids(&graph, &result.critical), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_walk_terminates_on_cycle() {
        // A <-> B loop with both edges driving
        let mut graph = TaskGraph::build(
            &[make_task("A", 1, 3, &["B"]), make_task("B", 4, 6, &["A"])],
            0,
        );
        mark_driving_relationships(&mut graph, 0);
        let b = graph.lookup("B").unwrap();
        let walked = walk_driving_predecessors(&graph, b, 100).unwrap();
        assert_eq!(walked.len(), 2);
    }

    #[test]
    fn test_walk_budget_is_partial() {
        let mut tasks = vec![make_task("T0", 1, 1, &[])];
        for i in 1..10u32 {
            let prev = format!("T{}", i - 1);
            tasks.push(make_task(&format!("T{}", i), i + 1, i + 1, &[prev.as_str()]));
        }
        let mut graph = TaskGraph::build(&tasks, 0);
        mark_driving_relationships(&mut graph, 0);

        let last = graph.lookup("T9").unwrap();
        let err = walk_driving_predecessors(&graph, last, 4).unwrap_err();
        assert_eq!(err.partial.len(), 4);
        assert_eq!(err.limit, 4);
    }

    #[test]
    fn test_selected_target_overrides_project_finish() {
        let mut graph = TaskGraph::build(
            &[
                make_task("T1", 1, 6, &[]),
                make_task("T2", 7, 10, &["T1"]),
                make_task("T3", 7, 9, &["T1"]),
            ],
            0,
        );
        let t3 = graph.lookup("T3");
        let (result, _) = analyze_longest_path(&mut graph, t3, &EngineConfig::default());

        assert_eq!(ids(&graph, &result.critical), vec!["T1", "T3"]);
        assert!(!graph.task_by_id("T2").unwrap().is_critical());
    }

    #[test]
    fn test_no_dates_classifies_everything_normal() {
        let mut graph = TaskGraph::build(&[TaskInput::new("A", 2.0)], 0);
        let (result, _) = analyze_longest_path(&mut graph, None, &EngineConfig::default());
        assert!(result.target.is_none());
        assert!(result.critical.is_empty());
        assert_eq!(
            graph.tasks()[0].classification,
            Some(Classification::longest_path(Criticality::Normal))
        );
    }
}
