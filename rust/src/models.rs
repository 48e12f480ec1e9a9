//! Core data types: ingested task rows, graph tasks and relationships.

use chrono::NaiveDate;

use crate::critical_path::{Classification, Criticality};
use crate::interner::TaskIdx;

/// Index of a relationship in the graph's relationship table.
pub type RelIdx = usize;

/// Kind of task row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskType {
    Activity,
    Milestone,
    /// Placeholder for a predecessor id that is not in the task set.
    Synthetic,
}

/// Dependency type between a predecessor and a successor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl RelationshipType {
    /// Parse a relationship type. Unrecognized or empty input becomes FS.
    pub fn parse(s: &str) -> Self {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SS" | "STARTTOSTART" => Self::StartToStart,
            "FF" | "FINISHTOFINISH" => Self::FinishToFinish,
            "SF" | "STARTTOFINISH" => Self::StartToFinish,
            _ => Self::FinishToStart,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        }
    }

    /// True when the predecessor's contribution is its start date.
    pub fn from_start(&self) -> bool {
        matches!(self, Self::StartToStart | Self::StartToFinish)
    }

    /// True when the successor side being constrained is its finish date.
    pub fn to_finish(&self) -> bool {
        matches!(self, Self::FinishToFinish | Self::StartToFinish)
    }
}

/// A start/finish date pair; either side may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DatePair {
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
}

impl DatePair {
    pub fn new(start: Option<NaiveDate>, finish: Option<NaiveDate>) -> Self {
        Self { start, finish }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.finish.is_none()
    }

    /// Widen this pair to cover `other` (earliest start, latest finish).
    pub fn widen(&mut self, other: &DatePair) {
        if let Some(s) = other.start {
            self.start = Some(self.start.map_or(s, |cur| cur.min(s)));
        }
        if let Some(f) = other.finish {
            self.finish = Some(self.finish.map_or(f, |cur| cur.max(f)));
        }
    }
}

/// One predecessor reference on an ingested row.
#[derive(Clone, Debug, PartialEq)]
pub struct PredecessorLink {
    pub predecessor_id: String,
    pub relationship_type: RelationshipType,
    pub lag: Option<f64>,
}

impl PredecessorLink {
    pub fn new(predecessor_id: impl Into<String>) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            relationship_type: RelationshipType::FinishToStart,
            lag: None,
        }
    }

    pub fn with_type(mut self, relationship_type: RelationshipType) -> Self {
        self.relationship_type = relationship_type;
        self
    }

    pub fn with_lag(mut self, lag: f64) -> Self {
        self.lag = Some(lag);
        self
    }

    /// Split a raw predecessor-id string ("T1, T2;T3") into FS links.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split([',', ';'])
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Self::new)
            .collect()
    }
}

/// A normalized task row as produced by the ingestion step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskInput {
    pub id: String,
    pub name: String,
    /// Explicit type; inferred from duration when absent.
    pub task_type: Option<TaskType>,
    pub duration: f64,
    pub predecessors: Vec<PredecessorLink>,
    pub user_total_float: Option<f64>,
    pub dates: DatePair,
    pub baseline: DatePair,
    pub previous: DatePair,
    /// Ordered WBS level names, outermost first.
    pub wbs_levels: Vec<String>,
}

impl TaskInput {
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            duration,
            ..Default::default()
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, finish: NaiveDate) -> Self {
        self.dates = DatePair::new(Some(start), Some(finish));
        self
    }

    pub fn with_predecessor(mut self, link: PredecessorLink) -> Self {
        self.predecessors.push(link);
        self
    }

    pub fn with_float(mut self, float: f64) -> Self {
        self.user_total_float = Some(float);
        self
    }

    pub fn with_wbs<S: AsRef<str>>(mut self, levels: &[S]) -> Self {
        self.wbs_levels = levels.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }
}

/// A task in the graph.
///
/// Identity, dates and links are fixed for the lifetime of a graph. The
/// annotation fields (`total_float`, `classification`, `y_order`, WBS
/// placement) are rewritten on every pass.
#[derive(Clone, Debug)]
pub struct Task {
    pub id: String,
    /// Stable arena index.
    pub internal_id: TaskIdx,
    pub name: String,
    pub task_type: TaskType,
    pub duration: f64,
    /// Incoming relationships.
    pub predecessors: Vec<RelIdx>,
    /// Outgoing relationships.
    pub successors: Vec<RelIdx>,
    pub user_total_float: Option<f64>,
    pub dates: DatePair,
    pub baseline: DatePair,
    pub previous: DatePair,
    pub wbs_levels: Vec<String>,

    pub total_float: Option<f64>,
    pub classification: Option<Classification>,
    pub y_order: Option<usize>,
    pub wbs_group_id: Option<String>,
    pub wbs_indent_level: usize,
}

impl Task {
    pub(crate) fn from_input(input: &TaskInput, internal_id: TaskIdx) -> Self {
        let duration = if input.duration.is_finite() {
            input.duration.max(0.0)
        } else {
            0.0
        };
        let task_type = input.task_type.unwrap_or(if duration == 0.0 {
            TaskType::Milestone
        } else {
            TaskType::Activity
        });
        let wbs_levels: Vec<String> = input
            .wbs_levels
            .iter()
            .map(|l| l.trim())
            .take_while(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            id: input.id.clone(),
            internal_id,
            name: if input.name.is_empty() {
                input.id.clone()
            } else {
                input.name.clone()
            },
            task_type,
            duration,
            predecessors: Vec::new(),
            successors: Vec::new(),
            user_total_float: input.user_total_float.filter(|f| f.is_finite()),
            dates: input.dates,
            baseline: input.baseline,
            previous: input.previous,
            wbs_levels,
            total_float: None,
            classification: None,
            y_order: None,
            wbs_group_id: None,
            wbs_indent_level: 0,
        }
    }

    /// Zero-duration, dateless placeholder named after the missing id.
    pub(crate) fn synthetic(id: &str, internal_id: TaskIdx) -> Self {
        Self::from_input(
            &TaskInput {
                id: id.to_string(),
                name: id.to_string(),
                task_type: Some(TaskType::Synthetic),
                ..Default::default()
            },
            internal_id,
        )
    }

    pub fn is_synthetic(&self) -> bool {
        self.task_type == TaskType::Synthetic
    }

    pub fn criticality(&self) -> Criticality {
        self.classification
            .map(|c| c.criticality)
            .unwrap_or(Criticality::Normal)
    }

    pub fn is_critical(&self) -> bool {
        self.criticality() == Criticality::Critical
    }

    pub fn is_near_critical(&self) -> bool {
        self.criticality() == Criticality::NearCritical
    }

    /// Critical under the float-based model in the current pass.
    pub fn is_critical_by_float(&self) -> bool {
        self.classification
            .is_some_and(|c| c.is_float_based() && c.criticality == Criticality::Critical)
    }

    /// Critical under the longest-path (relationship) model in the current pass.
    pub fn is_critical_by_rel(&self) -> bool {
        self.classification
            .is_some_and(|c| !c.is_float_based() && c.criticality == Criticality::Critical)
    }

    pub(crate) fn reset_annotations(&mut self) {
        self.total_float = None;
        self.classification = None;
        self.y_order = None;
    }
}

/// A dependency edge between two tasks in the graph.
#[derive(Clone, Debug)]
pub struct Relationship {
    pub predecessor: TaskIdx,
    pub successor: TaskIdx,
    pub predecessor_id: String,
    pub successor_id: String,
    pub rel_type: RelationshipType,
    pub lag: Option<f64>,
    /// Gap in days between the predecessor's contribution and the successor date.
    pub free_float: Option<f64>,
    pub is_critical: bool,
    pub is_driving: bool,
}

impl Relationship {
    pub fn lag_days(&self) -> f64 {
        self.lag.filter(|l| l.is_finite()).unwrap_or(0.0)
    }

    pub(crate) fn reset_annotations(&mut self) {
        self.free_float = None;
        self.is_critical = false;
        self.is_driving = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_relationship_type_parse() {
        assert_eq!(RelationshipType::parse("SS"), RelationshipType::StartToStart);
        assert_eq!(RelationshipType::parse("ff"), RelationshipType::FinishToFinish);
        assert_eq!(
            RelationshipType::parse("start-to-finish"),
            RelationshipType::StartToFinish
        );
        assert_eq!(RelationshipType::parse(""), RelationshipType::FinishToStart);
        assert_eq!(RelationshipType::parse("XX"), RelationshipType::FinishToStart);
    }

    #[test]
    fn test_parse_predecessor_list() {
        let links = PredecessorLink::parse_list(" T1, T2;;T3 ,");
        let ids: Vec<&str> = links.iter().map(|l| l.predecessor_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);
        assert!(links
            .iter()
            .all(|l| l.relationship_type == RelationshipType::FinishToStart));
    }

    #[test]
    fn test_type_inferred_from_duration() {
        let milestone = Task::from_input(&TaskInput::new("M", 0.0), 0);
        let activity = Task::from_input(&TaskInput::new("A", 3.0), 1);
        assert_eq!(milestone.task_type, TaskType::Milestone);
        assert_eq!(activity.task_type, TaskType::Activity);
    }

    #[test]
    fn test_wbs_levels_stop_at_first_empty() {
        let input = TaskInput::new("A", 1.0).with_wbs(&["Phase 1", " Design ", "", "Orphan"]);
        let task = Task::from_input(&input, 0);
        assert_eq!(task.wbs_levels, vec!["Phase 1", "Design"]);
    }

    #[test]
    fn test_date_pair_widen() {
        let mut pair = DatePair::default();
        pair.widen(&DatePair::new(Some(date(1, 5)), Some(date(1, 10))));
        pair.widen(&DatePair::new(Some(date(1, 1)), Some(date(1, 20))));
        pair.widen(&DatePair::new(None, None));
        assert_eq!(pair, DatePair::new(Some(date(1, 1)), Some(date(1, 20))));
    }

    #[test]
    fn test_synthetic_task_is_dateless() {
        let task = Task::synthetic("EXTERNAL", 4);
        assert!(task.is_synthetic());
        assert_eq!(task.name, "EXTERNAL");
        assert_eq!(task.duration, 0.0);
        assert!(task.dates.is_empty());
        assert!(!task.is_critical());
    }
}
