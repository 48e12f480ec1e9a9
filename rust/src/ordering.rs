//! Row order composition for the renderer.
//!
//! Merges the filtered task list with visible WBS group headers and
//! assigns a dense `y_order` (0..K) to everything that gets a row.
//! Anything without a row has `y_order == None`.

use crate::graph::TaskGraph;
use crate::interner::TaskIdx;
use crate::log_changes;
use crate::wbs::{GroupEntry, GroupIdx, WbsHierarchy};

/// One rendered row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Row {
    Group(GroupIdx),
    Task(TaskIdx),
}

/// Build a visibility mask from the filtered task list.
pub fn visibility_mask(len: usize, visible: &[TaskIdx]) -> Vec<bool> {
    let mut mask = vec![false; len];
    for &idx in visible {
        if let Some(slot) = mask.get_mut(idx) {
            *slot = true;
        }
    }
    mask
}

/// Flat ordering: the filtered tasks in their given order, no headers.
pub fn compose_flat(graph: &mut TaskGraph, visible: &[TaskIdx], verbosity: u8) -> Vec<Row> {
    // Cleared on first use so repeated indices get one row
    let mut pending = visibility_mask(graph.len(), visible);
    let mut rows = Vec::with_capacity(visible.len());
    for &idx in visible {
        if let Some(slot) = pending.get_mut(idx).filter(|s| **s) {
            *slot = false;
            rows.push(Row::Task(idx));
        }
    }
    assign_rows(graph, None, &rows);
    log_changes!(verbosity, "Ordering: {} flat rows", rows.len());
    rows
}

/// Grouped ordering.
///
/// Depth-first over the hierarchy in encounter order. A group header is
/// emitted when every ancestor is expanded; its contents only when the
/// group itself is expanded too. Within a group, direct tasks interleave
/// with child groups in the order they were first seen. With
/// `hide_empty_groups`, a group with no visible members emits nothing.
///
/// Member counts are refreshed from `visible` before any row is placed,
/// so collapse state never affects them.
pub fn compose_grouped(
    graph: &mut TaskGraph,
    hierarchy: &mut WbsHierarchy,
    visible: &[TaskIdx],
    hide_empty_groups: bool,
    verbosity: u8,
) -> Vec<Row> {
    let mask = visibility_mask(graph.len(), visible);
    hierarchy.apply_filter(&mask);

    let mut rows = Vec::new();
    // Explicit stack of entry lists still being emitted
    let mut stack: Vec<(&[GroupEntry], usize)> = vec![(hierarchy.roots(), 0)];
    while let Some(frame) = stack.last_mut() {
        let (entries, pos) = *frame;
        let Some(&entry) = entries.get(pos) else {
            stack.pop();
            continue;
        };
        frame.1 += 1;

        match entry {
            GroupEntry::Task(idx) => {
                if mask[idx] {
                    rows.push(Row::Task(idx));
                }
            }
            GroupEntry::Group(g) => {
                let group = hierarchy.group(g);
                if hide_empty_groups && group.visible_task_count == 0 {
                    continue;
                }
                rows.push(Row::Group(g));
                if group.is_expanded {
                    stack.push((group.entries.as_slice(), 0));
                }
            }
        }
    }

    assign_rows(graph, Some(&mut *hierarchy), &rows);
    log_changes!(
        verbosity,
        "Ordering: {} rows ({} visible tasks, {} groups)",
        rows.len(),
        visible.len(),
        hierarchy.len()
    );
    rows
}

/// Write `y_order` for every row and clear it everywhere else.
fn assign_rows(graph: &mut TaskGraph, mut hierarchy: Option<&mut WbsHierarchy>, rows: &[Row]) {
    let tasks = graph.tasks_mut();
    for task in tasks.iter_mut() {
        task.y_order = None;
    }
    if let Some(h) = hierarchy.as_deref_mut() {
        h.clear_rows();
    }

    for (y, row) in rows.iter().enumerate() {
        match *row {
            Row::Task(idx) => tasks[idx].y_order = Some(y),
            Row::Group(g) => {
                if let Some(h) = hierarchy.as_deref_mut() {
                    h.set_row(g, y);
                }
            }
        }
    }
}
