//! Circular dependency detection.
//!
//! Purely diagnostic: the graph is never repaired, loops are only reported.

use rustc_hash::FxHashSet;

use crate::graph::TaskGraph;
use crate::interner::TaskIdx;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    /// On the current path at this position.
    OnPath(usize),
    Done,
}

/// Find every circular dependency chain in the graph.
///
/// Iterative DFS over successor links with a per-path stack. When a node
/// already on the current path is reached again, the sub-path from its
/// first occurrence to the revisit is a cycle (`["T1", "T2", "T1"]`) and
/// that branch stops. Fully explored nodes are never re-entered. The same
/// loop reached from different entry points is reported once.
///
/// Returns an empty list for an acyclic graph.
pub fn detect_circular_dependencies(graph: &TaskGraph) -> Vec<Vec<String>> {
    let n = graph.len();
    let mut marks = vec![Mark::Unvisited; n];
    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut seen: FxHashSet<Vec<TaskIdx>> = FxHashSet::default();

    // Frame: (task, position in its successor list)
    let mut stack: Vec<(TaskIdx, usize)> = Vec::new();
    let mut path: Vec<TaskIdx> = Vec::new();

    for root in 0..n {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnPath(0);
        path.push(root);
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let successors = &graph.task(node).successors;
            if next >= successors.len() {
                stack.pop();
                path.pop();
                marks[node] = Mark::Done;
                continue;
            }
            frame.1 += 1;
            let succ = graph.relationship(successors[next]).successor;

            match marks[succ] {
                Mark::Unvisited => {
                    marks[succ] = Mark::OnPath(path.len());
                    path.push(succ);
                    stack.push((succ, 0));
                }
                Mark::OnPath(pos) => {
                    let loop_nodes = &path[pos..];
                    if seen.insert(canonical_rotation(loop_nodes)) {
                        let mut chain: Vec<String> = loop_nodes
                            .iter()
                            .map(|&idx| graph.task(idx).id.clone())
                            .collect();
                        chain.push(graph.task(succ).id.clone());
                        cycles.push(chain);
                    }
                }
                Mark::Done => {}
            }
        }
    }

    cycles
}

/// Rotate a loop so it starts at its smallest index, for de-duplication.
fn canonical_rotation(nodes: &[TaskIdx]) -> Vec<TaskIdx> {
    let start = nodes
        .iter()
        .enumerate()
        .min_by_key(|(_, &idx)| idx)
        .map(|(pos, _)| pos)
        .unwrap_or(0);
    nodes[start..].iter().chain(&nodes[..start]).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredecessorLink, TaskInput};

    fn make_task(id: &str, preds: &[&str]) -> TaskInput {
        let mut t = TaskInput::new(id, 1.0);
        for p in preds {
            t = t.with_predecessor(PredecessorLink::new(*p));
        }
        t
    }

    fn detect(tasks: &[TaskInput]) -> Vec<Vec<String>> {
        detect_circular_dependencies(&TaskGraph::build(tasks, 0))
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let cycles = detect(&[
            make_task("A", &[]),
            make_task("B", &["A"]),
            make_task("C", &["A"]),
            make_task("D", &["B", "C"]),
        ]);
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_two_node_loop() {
        // A -> B -> A
        let cycles = detect(&[make_task("A", &["B"]), make_task("B", &["A"])]);
        assert_eq!(cycles, vec![vec!["A", "B", "A"]]);
    }

    #[test]
    fn test_self_loop() {
        let cycles = detect(&[make_task("A", &["A"])]);
        assert_eq!(cycles, vec![vec!["A", "A"]]);
    }

    #[test]
    fn test_cycles_sharing_a_node_reported_separately() {
        // A -> B -> A and A -> C -> A
        let cycles = detect(&[
            make_task("A", &["B", "C"]),
            make_task("B", &["A"]),
            make_task("C", &["A"]),
        ]);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["A".to_string(), "B".to_string(), "A".to_string()]));
        assert!(cycles.contains(&vec!["A".to_string(), "C".to_string(), "A".to_string()]));
    }

    #[test]
    fn test_cycle_downstream_of_acyclic_prefix() {
        // S -> X -> Y -> Z -> X
        let cycles = detect(&[
            make_task("S", &[]),
            make_task("X", &["S", "Z"]),
            make_task("Y", &["X"]),
            make_task("Z", &["Y"]),
        ]);
        assert_eq!(cycles, vec![vec!["X", "Y", "Z", "X"]]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut tasks = vec![make_task("T0", &[])];
        for i in 1..20_000 {
            let prev = format!("T{}", i - 1);
            tasks.push(make_task(&format!("T{}", i), &[prev.as_str()]));
        }
        assert!(detect(&tasks).is_empty());
    }
}
