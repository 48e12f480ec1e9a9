//! Types for criticality classification and driving chains.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::config::CriticalityMode;
use crate::graph::TaskGraph;
use crate::interner::TaskIdx;
use crate::models::RelIdx;

/// Tolerance for comparing day counts.
pub const DAYS_EPSILON: f64 = 1e-9;

/// Criticality level of a task in one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Criticality {
    #[default]
    Normal,
    NearCritical,
    Critical,
}

impl Criticality {
    /// Critical or near-critical.
    pub fn is_flagged(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// A criticality level tagged with the model that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Classification {
    pub mode: CriticalityMode,
    pub criticality: Criticality,
}

impl Classification {
    pub fn longest_path(criticality: Criticality) -> Self {
        Self {
            mode: CriticalityMode::LongestPath,
            criticality,
        }
    }

    pub fn float_based(criticality: Criticality) -> Self {
        Self {
            mode: CriticalityMode::FloatBased,
            criticality,
        }
    }

    pub fn is_float_based(&self) -> bool {
        self.mode == CriticalityMode::FloatBased
    }
}

/// An ordered chain of relationships from a source task to a target task.
///
/// Derived per query for ranking and selection; never stored on the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct DrivingChain {
    /// Relationships in source -> target order.
    pub relationships: Vec<RelIdx>,
    /// Tasks in source -> target order (one more than relationships).
    pub tasks: Vec<TaskIdx>,
    /// Sum of task durations along the chain plus relationship lags, in days.
    pub total_duration: f64,
    /// Start date of the source task.
    pub start_date: Option<NaiveDate>,
}

impl DrivingChain {
    /// Build a chain from relationships in source -> target order.
    ///
    /// `end` is the chain's last task; it is the only task when
    /// `relationships` is empty.
    pub fn from_relationships(graph: &TaskGraph, relationships: Vec<RelIdx>, end: TaskIdx) -> Self {
        let mut tasks: Vec<TaskIdx> = Vec::with_capacity(relationships.len() + 1);
        match relationships.first() {
            Some(&first) => {
                tasks.push(graph.relationship(first).predecessor);
                tasks.extend(relationships.iter().map(|&r| graph.relationship(r).successor));
            }
            None => tasks.push(end),
        }

        let task_days: f64 = tasks.iter().map(|&t| graph.task(t).duration).sum();
        let lag_days: f64 = relationships
            .iter()
            .map(|&r| graph.relationship(r).lag_days())
            .sum();
        let start_date = graph.task(tasks[0]).dates.start;

        Self {
            relationships,
            tasks,
            total_duration: task_days + lag_days,
            start_date,
        }
    }

    pub fn source(&self) -> TaskIdx {
        self.tasks[0]
    }

    pub fn target(&self) -> TaskIdx {
        self.tasks[self.tasks.len() - 1]
    }

    pub fn hops(&self) -> usize {
        self.relationships.len()
    }

    /// Selection order: longer duration first, then earlier start, then more hops.
    pub fn cmp_for_selection(&self, other: &Self) -> Ordering {
        cmp_days(other.total_duration, self.total_duration)
            .then(cmp_start(self.start_date, other.start_date))
            .then(other.hops().cmp(&self.hops()))
    }

    /// Navigation order: earlier start first, then longer duration.
    pub fn cmp_for_navigation(&self, other: &Self) -> Ordering {
        cmp_start(self.start_date, other.start_date)
            .then(cmp_days(other.total_duration, self.total_duration))
            .then(other.hops().cmp(&self.hops()))
            .then(self.tasks.cmp(&other.tasks))
    }
}

/// Compare day counts with `DAYS_EPSILON` tolerance.
pub fn cmp_days(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < DAYS_EPSILON {
        Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

/// Earlier dates first; missing dates sort last.
fn cmp_start(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(duration: f64, start: Option<u32>, hops: usize) -> DrivingChain {
        DrivingChain {
            relationships: (0..hops).collect(),
            tasks: (0..=hops).collect(),
            total_duration: duration,
            start_date: start.map(|d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap()),
        }
    }

    #[test]
    fn test_classification_tags_mode() {
        let c = Classification::float_based(Criticality::Critical);
        assert!(c.is_float_based());
        assert!(!Classification::longest_path(Criticality::Critical).is_float_based());
        assert!(Criticality::NearCritical.is_flagged());
        assert!(!Criticality::Normal.is_flagged());
    }

    #[test]
    fn test_selection_prefers_duration_then_start_then_hops() {
        let long = chain(10.0, Some(5), 1);
        let short = chain(8.0, Some(1), 1);
        assert_eq!(long.cmp_for_selection(&short), Ordering::Less);

        let early = chain(10.0, Some(1), 1);
        assert_eq!(early.cmp_for_selection(&long), Ordering::Less);

        let more_hops = chain(10.0, Some(5), 3);
        assert_eq!(more_hops.cmp_for_selection(&long), Ordering::Less);
    }

    #[test]
    fn test_navigation_prefers_start_then_duration() {
        let a = chain(5.0, Some(1), 1);
        let b = chain(9.0, Some(2), 1);
        assert_eq!(a.cmp_for_navigation(&b), Ordering::Less);

        let undated = chain(50.0, None, 1);
        assert_eq!(a.cmp_for_navigation(&undated), Ordering::Less);

        let same_start_longer = chain(7.0, Some(1), 1);
        assert_eq!(same_start_longer.cmp_for_navigation(&a), Ordering::Less);
    }

    #[test]
    fn test_cmp_days_epsilon() {
        assert_eq!(cmp_days(1.0, 1.0 + 1e-12), Ordering::Equal);
        assert_eq!(cmp_days(1.0, 2.0), Ordering::Less);
    }
}
