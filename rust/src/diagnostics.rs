//! Data-quality and degradation reports.
//!
//! Nothing the engine does on malformed input is fatal. Each problem is
//! collected here and the pass continues with best-effort output.

use chrono::NaiveDate;
use thiserror::Error;

/// How loudly a diagnostic should be surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

/// A problem found while building or evaluating the graph.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Diagnostic {
    #[error("Duplicate task id {id:?}: keeping the first occurrence")]
    DuplicateTaskId { id: String },

    #[error("Circular dependency: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    #[error("Task {id:?} starts ({start}) after it finishes ({finish})")]
    InvalidDateRange {
        id: String,
        start: NaiveDate,
        finish: NaiveDate,
    },

    #[error("Task {id:?} is missing its {missing} date")]
    MissingDates { id: String, missing: &'static str },

    #[error("Predecessor {id:?} is not in the task set; created a synthetic placeholder")]
    MissingPredecessor { id: String },

    #[error("{traversal} stopped after visiting {visited} nodes (limit {limit}); result is partial")]
    TraversalTruncated {
        traversal: &'static str,
        visited: usize,
        limit: usize,
    },

    #[error("Setting {setting} = {requested} is out of range; using {applied}")]
    ConfigClamped {
        setting: &'static str,
        requested: String,
        applied: String,
    },

    #[error("Target task {id:?} does not exist")]
    UnknownTarget { id: String },
}

/// A request that is the caller's mistake rather than a data problem.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unknown criticality mode {0:?}; expected \"longestPath\" or \"floatBased\"")]
    UnknownMode(String),

    #[error("Unknown WBS group {0:?}")]
    UnknownGroup(String),
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingPredecessor { .. } | Self::ConfigClamped { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_joins_chain() {
        let diag = Diagnostic::CircularDependency {
            chain: vec!["T1".to_string(), "T2".to_string(), "T1".to_string()],
        };
        assert_eq!(diag.to_string(), "Circular dependency: T1 -> T2 -> T1");
        assert_eq!(diag.severity(), Severity::Warning);
    }

    #[test]
    fn test_missing_predecessor_is_info() {
        let diag = Diagnostic::MissingPredecessor {
            id: "EXTERNAL".to_string(),
        };
        assert_eq!(diag.severity(), Severity::Info);
        assert!(diag.to_string().contains("EXTERNAL"));
    }
}
