//! Driving-chain enumeration, selection and "path N of M" navigation.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::TaskGraph;
use crate::interner::TaskIdx;
use crate::models::{RelIdx, Relationship};
use crate::traversal::{Traversal, TraversalResult};
use crate::log_debug;

use super::types::DrivingChain;

/// DFS frame: a task and the chain-eligible relationships into it.
struct Frame {
    node: TaskIdx,
    incoming: Vec<RelIdx>,
    next: usize,
    /// Relationship used to reach this node from the frame below (None for the target).
    via: Option<RelIdx>,
    /// Whether any chain was extended through this node's predecessors.
    extended: bool,
}

/// Enumerate chains of qualifying relationships that end at `target`.
///
/// Iterative DFS backward from the target along relationships accepted by
/// `follows`. One visited set spans the enumeration: every task is explored
/// at most once, so diamond-shaped graphs stay linear. When the search
/// reaches a task that was already fully explored, it splices in the best
/// chain memoized for that task instead of exploring it again; only one
/// representative chain passes through any shared task.
///
/// A chain starts at a task with no followable predecessors, or at
/// `source` when given (only chains starting there are returned). Since
/// shared tasks contribute only their memoized best prefix, a chain from
/// `source` through a task whose best prefix starts elsewhere is not
/// found.
pub fn enumerate_driving_chains<F>(
    graph: &TaskGraph,
    target: TaskIdx,
    source: Option<TaskIdx>,
    follows: F,
    limit: usize,
    verbosity: u8,
) -> TraversalResult<Vec<DrivingChain>>
where
    F: Fn(&Relationship) -> bool,
{
    let mut traversal = Traversal::new("driving chain enumeration", limit);
    let mut chains: Vec<DrivingChain> = Vec::new();
    // Best chain from an origin to each fully explored task
    let mut memo: FxHashMap<TaskIdx, DrivingChain> = FxHashMap::default();
    let mut on_stack = vec![false; graph.len()];

    let incoming_of = |node: TaskIdx| -> Vec<RelIdx> {
        if Some(node) == source {
            return Vec::new();
        }
        graph
            .incoming(node)
            .filter(|(_, rel)| follows(rel))
            .map(|(idx, _)| idx)
            .collect()
    };

    traversal.visit(target);
    on_stack[target] = true;
    let mut stack = vec![Frame {
        node: target,
        incoming: incoming_of(target),
        next: 0,
        via: None,
        extended: false,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.next < frame.incoming.len() {
            let rel_idx = frame.incoming[frame.next];
            frame.next += 1;
            let pred = graph.relationship(rel_idx).predecessor;

            if on_stack[pred] {
                // Loop back into the current path
                continue;
            }
            if let Some(prefix) = memo.get(&pred) {
                // A prefix through the current path would repeat a task
                if prefix.tasks.iter().any(|&t| on_stack[t]) {
                    continue;
                }
                frame.extended = true;
                let mut rels = prefix.relationships.clone();
                rels.push(rel_idx);
                rels.extend(path_suffix(&stack));
                chains.push(DrivingChain::from_relationships(graph, rels, target));
                continue;
            }
            if !traversal.visit(pred) {
                if traversal.is_exhausted() {
                    break;
                }
                continue;
            }
            frame.extended = true;
            log_debug!(
                verbosity,
                "chain step: {} <- {}",
                graph.task(frame.node).id,
                graph.task(pred).id
            );
            on_stack[pred] = true;
            stack.push(Frame {
                node: pred,
                incoming: incoming_of(pred),
                next: 0,
                via: Some(rel_idx),
                extended: false,
            });
            continue;
        }

        // Frame finished: record the best chain into this node
        let finished = match stack.pop() {
            Some(f) => f,
            None => break,
        };
        on_stack[finished.node] = false;

        if !finished.extended {
            let mut rels = Vec::new();
            rels.extend(finished.via);
            rels.extend(path_suffix(&stack));
            chains.push(DrivingChain::from_relationships(graph, rels, target));
        }

        let best_prefix = best_prefix_into(graph, &finished, &memo);
        memo.insert(finished.node, best_prefix);
    }

    if let Some(s) = source {
        chains.retain(|c| c.source() == s);
    }
    dedup_chains(&mut chains);
    traversal.finish(chains)
}

/// Relationships from the frames still on the stack, in source -> target order.
fn path_suffix(stack: &[Frame]) -> impl Iterator<Item = RelIdx> + '_ {
    stack.iter().rev().filter_map(|f| f.via)
}

/// Longest chain from an origin into `frame.node`, using memoized predecessors.
fn best_prefix_into(
    graph: &TaskGraph,
    frame: &Frame,
    memo: &FxHashMap<TaskIdx, DrivingChain>,
) -> DrivingChain {
    let mut best = DrivingChain::from_relationships(graph, Vec::new(), frame.node);
    let mut have_extension = false;
    for &rel_idx in &frame.incoming {
        let pred = graph.relationship(rel_idx).predecessor;
        let Some(prefix) = memo.get(&pred) else {
            continue;
        };
        let mut rels = prefix.relationships.clone();
        rels.push(rel_idx);
        let candidate = DrivingChain::from_relationships(graph, rels, frame.node);
        if !have_extension || candidate.cmp_for_selection(&best).is_lt() {
            best = candidate;
            have_extension = true;
        }
    }
    best
}

fn dedup_chains(chains: &mut Vec<DrivingChain>) {
    let mut seen = FxHashSet::default();
    chains.retain(|c| seen.insert(c.relationships.clone()));
}

/// Index of the longest chain: greatest total duration, then earliest
/// start, then most hops.
pub fn select_longest(chains: &[DrivingChain]) -> Option<usize> {
    chains
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp_for_selection(b))
        .map(|(idx, _)| idx)
}

/// Sort chains for navigation: earliest start first, then longest duration.
pub fn rank_chains(chains: &mut [DrivingChain]) {
    chains.sort_by(|a, b| a.cmp_for_navigation(b));
}

/// Ranked chains with the currently selected one, for "path N of M" controls.
///
/// The selected index is owned by the caller between passes; pass it back
/// through [`ChainNavigator::with_selection`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainNavigator {
    chains: Vec<DrivingChain>,
    selected: Option<usize>,
}

impl ChainNavigator {
    /// Rank the chains and select the longest one.
    pub fn new(mut chains: Vec<DrivingChain>) -> Self {
        rank_chains(&mut chains);
        let selected = select_longest(&chains);
        Self { chains, selected }
    }

    /// Restore a caller-held selection, clamped into range.
    pub fn with_selection(mut self, index: Option<usize>) -> Self {
        if let Some(index) = index {
            self.select(index);
        }
        self
    }

    pub fn chains(&self) -> &[DrivingChain] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&DrivingChain> {
        self.selected.and_then(|i| self.chains.get(i))
    }

    /// Select a chain by index; out-of-range requests clamp to the last chain.
    pub fn select(&mut self, index: usize) -> Option<usize> {
        if self.chains.is_empty() {
            self.selected = None;
        } else {
            self.selected = Some(index.min(self.chains.len() - 1));
        }
        self.selected
    }

    /// Advance to the next chain, wrapping around.
    pub fn next(&mut self) -> Option<usize> {
        let len = self.chains.len();
        if len == 0 {
            return None;
        }
        self.selected = Some(self.selected.map_or(0, |i| (i + 1) % len));
        self.selected
    }

    /// Go back to the previous chain, wrapping around.
    pub fn previous(&mut self) -> Option<usize> {
        let len = self.chains.len();
        if len == 0 {
            return None;
        }
        self.selected = Some(self.selected.map_or(len - 1, |i| (i + len - 1) % len));
        self.selected
    }

    /// "Path N of M", 1-based.
    pub fn label(&self) -> String {
        match self.selected {
            Some(i) => format!("Path {} of {}", i + 1, self.chains.len()),
            None => "No driving path".to_string(),
        }
    }
}
