//! WBS group tree built from per-task level names.
//!
//! Groups live in an arena indexed by [`GroupIdx`] and are keyed by their
//! level-qualified path id (`"L1:Design|L2:Frontend"`).

use rustc_hash::FxHashMap;

use crate::graph::TaskGraph;
use crate::interner::TaskIdx;
use crate::models::DatePair;
use crate::{log_changes, log_checks, log_debug};

use super::expand::{ExpandController, ExpandOrigin};

pub type GroupIdx = usize;

/// One row-producing item under a group (or at the root), in the order it
/// was first encountered while building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupEntry {
    Task(TaskIdx),
    Group(GroupIdx),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WbsGroup {
    pub id: String,
    /// 1-based depth.
    pub level: usize,
    pub name: String,
    /// Level names joined with `" > "`.
    pub full_path: String,
    pub parent: Option<GroupIdx>,
    pub children: Vec<GroupIdx>,
    pub entries: Vec<GroupEntry>,
    /// Direct members.
    pub tasks: Vec<TaskIdx>,
    /// Direct and descendant members.
    pub all_tasks: Vec<TaskIdx>,
    pub is_expanded: bool,
    pub expand_origin: ExpandOrigin,
    pub y_order: Option<usize>,
    pub visible_task_count: usize,
    pub task_count: usize,
    pub summary: DatePair,
    pub baseline_summary: DatePair,
    pub previous_summary: DatePair,
    pub has_critical_tasks: bool,
    pub has_near_critical_tasks: bool,
}

impl WbsGroup {
    fn new(id: String, level: usize, name: &str, full_path: String, parent: Option<GroupIdx>) -> Self {
        Self {
            id,
            level,
            name: name.to_string(),
            full_path,
            parent,
            children: Vec::new(),
            entries: Vec::new(),
            tasks: Vec::new(),
            all_tasks: Vec::new(),
            is_expanded: true,
            expand_origin: ExpandOrigin::Default,
            y_order: None,
            visible_task_count: 0,
            task_count: 0,
            summary: DatePair::default(),
            baseline_summary: DatePair::default(),
            previous_summary: DatePair::default(),
            has_critical_tasks: false,
            has_near_critical_tasks: false,
        }
    }
}

/// The group tree plus root-level entries (root groups and ungrouped tasks).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WbsHierarchy {
    groups: Vec<WbsGroup>,
    index: FxHashMap<String, GroupIdx>,
    roots: Vec<GroupEntry>,
    max_depth: usize,
}

/// Path id segment for one level.
///
/// `\` and `|` in the name are backslash-escaped so a name can never
/// fake a level separator; ids stay one-to-one with level paths.
fn segment(level: usize, name: &str) -> String {
    let mut out = format!("L{}:", level);
    for c in name.chars() {
        if matches!(c, '\\' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl WbsHierarchy {
    /// Build the tree from `order`, a sequence of task indices.
    ///
    /// Each task's group membership is written back onto the task
    /// (`wbs_group_id`, `wbs_indent_level`). Tasks without levels get no
    /// group and appear as root entries. Summary dates are rolled up here
    /// since they depend only on input dates.
    pub fn build(graph: &mut TaskGraph, order: &[TaskIdx], verbosity: u8) -> Self {
        let mut hierarchy = Self::default();

        for &task_idx in order {
            let levels = graph.task(task_idx).wbs_levels.clone();
            if levels.is_empty() {
                hierarchy.roots.push(GroupEntry::Task(task_idx));
                let task = &mut graph.tasks_mut()[task_idx];
                task.wbs_group_id = None;
                task.wbs_indent_level = 0;
                continue;
            }

            let mut parent: Option<GroupIdx> = None;
            let mut id = String::new();
            for (depth, name) in levels.iter().enumerate() {
                let level = depth + 1;
                if !id.is_empty() {
                    id.push('|');
                }
                id.push_str(&segment(level, name));
                let group = match hierarchy.index.get(&id) {
                    Some(&g) => g,
                    None => hierarchy.add_group(&id, level, &levels[..level], parent, verbosity),
                };
                parent = Some(group);
            }

            // Loop ran at least once, so the leaf group exists
            let Some(leaf) = parent else { continue };
            hierarchy.groups[leaf].tasks.push(task_idx);
            hierarchy.groups[leaf].entries.push(GroupEntry::Task(task_idx));

            let task = graph.task(task_idx);
            let (dates, baseline, previous) = (task.dates, task.baseline, task.previous);
            let mut cursor = Some(leaf);
            while let Some(g) = cursor {
                let group = &mut hierarchy.groups[g];
                group.all_tasks.push(task_idx);
                group.summary.widen(&dates);
                group.baseline_summary.widen(&baseline);
                group.previous_summary.widen(&previous);
                cursor = group.parent;
            }

            hierarchy.max_depth = hierarchy.max_depth.max(levels.len());
            let task = &mut graph.tasks_mut()[task_idx];
            task.wbs_group_id = Some(id);
            task.wbs_indent_level = levels.len();
        }

        for group in &mut hierarchy.groups {
            group.task_count = group.all_tasks.len();
            group.visible_task_count = group.task_count;
        }

        log_changes!(
            verbosity,
            "WBS: {} groups, depth {}, {} root entries",
            hierarchy.groups.len(),
            hierarchy.max_depth,
            hierarchy.roots.len()
        );
        hierarchy
    }

    fn add_group(
        &mut self,
        id: &str,
        level: usize,
        path: &[String],
        parent: Option<GroupIdx>,
        verbosity: u8,
    ) -> GroupIdx {
        let idx = self.groups.len();
        let name = &path[path.len() - 1];
        self.groups
            .push(WbsGroup::new(id.to_string(), level, name, path.join(" > "), parent));
        self.index.insert(id.to_string(), idx);
        match parent {
            Some(p) => {
                self.groups[p].children.push(idx);
                self.groups[p].entries.push(GroupEntry::Group(idx));
            }
            None => self.roots.push(GroupEntry::Group(idx)),
        }
        log_debug!(verbosity, "WBS group {} (level {})", id, level);
        idx
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[WbsGroup] {
        &self.groups
    }

    pub fn group(&self, idx: GroupIdx) -> &WbsGroup {
        &self.groups[idx]
    }

    pub fn lookup(&self, id: &str) -> Option<GroupIdx> {
        self.index.get(id).copied()
    }

    pub fn group_by_id(&self, id: &str) -> Option<&WbsGroup> {
        self.lookup(id).map(|idx| &self.groups[idx])
    }

    /// Root groups and ungrouped tasks in encounter order.
    pub fn roots(&self) -> &[GroupEntry] {
        &self.roots
    }

    /// Deepest group level (0 when there are no groups).
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Recompute the critical / near-critical OR-reductions from the
    /// tasks' current classification.
    pub fn refresh_criticality(&mut self, graph: &TaskGraph) {
        for group in &mut self.groups {
            group.has_critical_tasks = group.all_tasks.iter().any(|&t| graph.task(t).is_critical());
            group.has_near_critical_tasks = group
                .all_tasks
                .iter()
                .any(|&t| graph.task(t).is_near_critical());
        }
    }

    /// Recount members against a visibility mask indexed by task.
    ///
    /// Counts ignore expand state; they must be refreshed before rows
    /// are composed.
    pub fn apply_filter(&mut self, visible: &[bool]) {
        for group in &mut self.groups {
            group.task_count = group.all_tasks.len();
            group.visible_task_count = group
                .all_tasks
                .iter()
                .filter(|&&t| visible.get(t).copied().unwrap_or(false))
                .count();
        }
    }

    /// Resolve every group's expand state through `controller`.
    pub fn apply_expand(&mut self, controller: &ExpandController, verbosity: u8) {
        for group in &mut self.groups {
            let (expanded, origin) = controller.resolve(&group.id, group.level);
            group.is_expanded = expanded;
            group.expand_origin = origin;
            log_checks!(verbosity, "{}: expanded={} ({:?})", group.id, expanded, origin);
        }
    }

    pub(crate) fn clear_rows(&mut self) {
        for group in &mut self.groups {
            group.y_order = None;
        }
    }

    pub(crate) fn set_row(&mut self, idx: GroupIdx, row: usize) {
        self.groups[idx].y_order = Some(row);
    }
}
