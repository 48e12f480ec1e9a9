//! Graph model: tasks with bidirectional relationship links.
//!
//! Built once per data refresh from ingested rows. Structure is immutable
//! afterwards; passes only rewrite the annotation fields.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use crate::config::FinishTieBreak;
use crate::diagnostics::Diagnostic;
use crate::interner::{TaskIdInterner, TaskIdx};
use crate::models::{RelIdx, Relationship, RelationshipType, Task, TaskInput};
use crate::{log_changes, log_debug};

/// Task arena, id index and relationship table.
#[derive(Clone, Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: TaskIdInterner,
    relationships: Vec<Relationship>,
    diagnostics: Vec<Diagnostic>,
}

impl TaskGraph {
    /// Build the graph from ingested rows.
    ///
    /// - Duplicate task ids keep the first row and report the rest.
    /// - Predecessor ids with no row become synthetic placeholder tasks.
    /// - Repeated (predecessor, successor, type) edges collapse to one.
    pub fn build(inputs: &[TaskInput], verbosity: u8) -> Self {
        let mut index = TaskIdInterner::with_capacity(inputs.len());
        let mut tasks: Vec<Task> = Vec::with_capacity(inputs.len());
        let mut diagnostics = Vec::new();
        // Input row for each non-synthetic arena task, same index
        let mut rows: Vec<&TaskInput> = Vec::with_capacity(inputs.len());

        for input in inputs {
            let (idx, is_new) = index.intern(&input.id);
            if !is_new {
                diagnostics.push(Diagnostic::DuplicateTaskId {
                    id: input.id.clone(),
                });
                continue;
            }
            tasks.push(Task::from_input(input, idx));
            rows.push(input);
        }

        for task in &tasks {
            diagnostics.extend(date_diagnostics(task));
        }

        let mut relationships: Vec<Relationship> = Vec::new();
        let mut seen: FxHashSet<(TaskIdx, TaskIdx, RelationshipType)> = FxHashSet::default();

        for (succ_idx, input) in rows.iter().enumerate() {
            for link in &input.predecessors {
                let pred_id = link.predecessor_id.trim();
                if pred_id.is_empty() {
                    continue;
                }
                let (pred_idx, is_new) = index.intern(pred_id);
                if is_new {
                    tasks.push(Task::synthetic(pred_id, pred_idx));
                    diagnostics.push(Diagnostic::MissingPredecessor {
                        id: pred_id.to_string(),
                    });
                }

                if !seen.insert((pred_idx, succ_idx, link.relationship_type)) {
                    log_debug!(
                        verbosity,
                        "Collapsed duplicate {} edge {} -> {}",
                        link.relationship_type.as_str(),
                        pred_id,
                        input.id
                    );
                    continue;
                }

                let rel_idx = relationships.len();
                relationships.push(Relationship {
                    predecessor: pred_idx,
                    successor: succ_idx,
                    predecessor_id: pred_id.to_string(),
                    successor_id: input.id.clone(),
                    rel_type: link.relationship_type,
                    lag: link.lag,
                    free_float: None,
                    is_critical: false,
                    is_driving: false,
                });
                tasks[pred_idx].successors.push(rel_idx);
                tasks[succ_idx].predecessors.push(rel_idx);
            }
        }

        log_changes!(
            verbosity,
            "Built graph: {} tasks, {} relationships, {} diagnostics",
            tasks.len(),
            relationships.len(),
            diagnostics.len()
        );

        Self {
            tasks,
            index,
            relationships,
            diagnostics,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Diagnostics found while building (duplicates, dates, missing predecessors).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[inline]
    pub fn task(&self, idx: TaskIdx) -> &Task {
        &self.tasks[idx]
    }

    #[inline]
    pub fn relationship(&self, idx: RelIdx) -> &Relationship {
        &self.relationships[idx]
    }

    pub fn lookup(&self, id: &str) -> Option<TaskIdx> {
        self.index.get(id)
    }

    pub fn task_by_id(&self, id: &str) -> Option<&Task> {
        self.lookup(id).map(|idx| &self.tasks[idx])
    }

    /// Relationships leaving a task (the predecessor-id -> outgoing index).
    pub fn outgoing(&self, idx: TaskIdx) -> impl Iterator<Item = (RelIdx, &Relationship)> + '_ {
        self.tasks[idx]
            .successors
            .iter()
            .map(move |&r| (r, &self.relationships[r]))
    }

    /// Relationships entering a task.
    pub fn incoming(&self, idx: TaskIdx) -> impl Iterator<Item = (RelIdx, &Relationship)> + '_ {
        self.tasks[idx]
            .predecessors
            .iter()
            .map(move |&r| (r, &self.relationships[r]))
    }

    /// Task with the latest finish date, ties broken by `tie_break`.
    pub fn project_finish(&self, tie_break: FinishTieBreak) -> Option<TaskIdx> {
        self.extreme_date(tie_break, |t| t.dates.finish, |a, b| a > b)
    }

    /// Task with the earliest start date, ties broken by `tie_break`.
    pub fn project_start(&self, tie_break: FinishTieBreak) -> Option<TaskIdx> {
        self.extreme_date(tie_break, |t| t.dates.start, |a, b| a < b)
    }

    fn extreme_date(
        &self,
        tie_break: FinishTieBreak,
        date_of: impl Fn(&Task) -> Option<NaiveDate>,
        better: impl Fn(NaiveDate, NaiveDate) -> bool,
    ) -> Option<TaskIdx> {
        let mut best: Option<(TaskIdx, NaiveDate)> = None;
        for task in &self.tasks {
            let Some(date) = date_of(task) else {
                continue;
            };
            let replace = match best {
                None => true,
                Some((best_idx, best_date)) => {
                    if better(date, best_date) {
                        true
                    } else if date == best_date {
                        match tie_break {
                            FinishTieBreak::FirstInInput => false,
                            FinishTieBreak::LastInInput => true,
                            FinishTieBreak::LowestId => task.id < self.tasks[best_idx].id,
                        }
                    } else {
                        false
                    }
                }
            };
            if replace {
                best = Some((task.internal_id, date));
            }
        }
        best.map(|(idx, _)| idx)
    }

    pub(crate) fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    pub(crate) fn relationships_mut(&mut self) -> &mut [Relationship] {
        &mut self.relationships
    }

    /// Clear every per-pass annotation on tasks and relationships.
    pub(crate) fn reset_annotations(&mut self) {
        for task in &mut self.tasks {
            task.reset_annotations();
        }
        for rel in &mut self.relationships {
            rel.reset_annotations();
        }
    }
}

fn date_diagnostics(task: &Task) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    match (task.dates.start, task.dates.finish) {
        (Some(start), Some(finish)) if start > finish => {
            out.push(Diagnostic::InvalidDateRange {
                id: task.id.clone(),
                start,
                finish,
            });
        }
        (None, Some(_)) => out.push(Diagnostic::MissingDates {
            id: task.id.clone(),
            missing: "start",
        }),
        (Some(_), None) => out.push(Diagnostic::MissingDates {
            id: task.id.clone(),
            missing: "finish",
        }),
        (None, None) => out.push(Diagnostic::MissingDates {
            id: task.id.clone(),
            missing: "start and finish",
        }),
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredecessorLink, TaskType};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn make_task(id: &str, start: u32, finish: u32, preds: &[&str]) -> TaskInput {
        let mut t = TaskInput::new(id, (finish - start) as f64)
            .with_dates(date(1, start), date(1, finish));
        for p in preds {
            t = t.with_predecessor(PredecessorLink::new(*p));
        }
        t
    }

    #[test]
    fn test_bidirectional_links() {
        let graph = TaskGraph::build(
            &[make_task("T1", 1, 6, &[]), make_task("T2", 7, 10, &["T1"])],
            0,
        );
        let t1 = graph.lookup("T1").unwrap();
        let t2 = graph.lookup("T2").unwrap();

        assert_eq!(graph.relationships().len(), 1);
        let (_, rel) = graph.outgoing(t1).next().unwrap();
        assert_eq!(rel.successor, t2);
        let (_, rel) = graph.incoming(t2).next().unwrap();
        assert_eq!(rel.predecessor, t1);
        assert_eq!(rel.rel_type, RelationshipType::FinishToStart);
    }

    #[test]
    fn test_missing_predecessor_materializes_synthetic_task() {
        let graph = TaskGraph::build(&[make_task("T1", 1, 6, &["EXTERNAL"])], 0);

        let ext = graph.task_by_id("EXTERNAL").unwrap();
        assert_eq!(ext.task_type, TaskType::Synthetic);
        assert_eq!(ext.name, "EXTERNAL");
        assert_eq!(ext.duration, 0.0);
        assert!(ext.dates.start.is_none() && ext.dates.finish.is_none());

        assert_eq!(graph.relationships().len(), 1);
        let rel = &graph.relationships()[0];
        assert_eq!(rel.predecessor_id, "EXTERNAL");
        assert_eq!(rel.successor_id, "T1");
        assert!(graph
            .diagnostics()
            .contains(&Diagnostic::MissingPredecessor {
                id: "EXTERNAL".to_string()
            }));
    }

    #[test]
    fn test_duplicate_relationships_collapse() {
        let t2 = make_task("T2", 7, 10, &["T1", "T1"])
            .with_predecessor(PredecessorLink::new("T1").with_type(RelationshipType::StartToStart));
        let graph = TaskGraph::build(&[make_task("T1", 1, 6, &[]), t2], 0);

        // FS collapses, SS is a distinct edge
        assert_eq!(graph.relationships().len(), 2);
        assert_eq!(graph.task_by_id("T1").unwrap().successors.len(), 2);
    }

    #[test]
    fn test_duplicate_task_id_keeps_first() {
        let graph = TaskGraph::build(
            &[make_task("T1", 1, 6, &[]), make_task("T1", 2, 3, &[])],
            0,
        );
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.task_by_id("T1").unwrap().dates.start, Some(date(1, 1)));
        assert!(matches!(
            graph.diagnostics()[0],
            Diagnostic::DuplicateTaskId { .. }
        ));
    }

    #[test]
    fn test_date_diagnostics() {
        let backwards = TaskInput::new("B", 1.0).with_dates(date(1, 9), date(1, 2));
        let dateless = TaskInput::new("D", 1.0);
        let graph = TaskGraph::build(&[backwards, dateless], 0);

        assert!(graph
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::InvalidDateRange { id, .. } if id == "B")));
        assert!(graph
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::MissingDates { id, .. } if id == "D")));
    }

    #[test]
    fn test_project_finish_tie_break() {
        let graph = TaskGraph::build(
            &[
                make_task("B", 1, 10, &[]),
                make_task("A", 2, 10, &[]),
                make_task("C", 1, 5, &[]),
            ],
            0,
        );
        let id = |idx: Option<TaskIdx>| idx.map(|i| graph.task(i).id.clone());

        assert_eq!(id(graph.project_finish(FinishTieBreak::FirstInInput)), Some("B".into()));
        assert_eq!(id(graph.project_finish(FinishTieBreak::LastInInput)), Some("A".into()));
        assert_eq!(id(graph.project_finish(FinishTieBreak::LowestId)), Some("A".into()));
        assert_eq!(id(graph.project_start(FinishTieBreak::FirstInInput)), Some("B".into()));
    }
}
