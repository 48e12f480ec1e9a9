//! Configuration types for the engine.

use std::str::FromStr;

use crate::diagnostics::{Diagnostic, EngineError};

/// Upper bound accepted for float thresholds and tolerances, in days.
pub const MAX_FLOAT_THRESHOLD_DAYS: f64 = 365.0;

/// Default node budget for a single traversal.
pub const DEFAULT_MAX_TRAVERSAL_NODES: usize = 50_000;

/// Which classification model drives criticality for a pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CriticalityMode {
    /// Reflective analysis of the scheduled dates.
    #[default]
    LongestPath,
    /// Caller-supplied total float per task.
    FloatBased,
}

impl CriticalityMode {
    /// Parse the mode selector used by the host ("longestPath" / "floatBased").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "longestpath" => Some(Self::LongestPath),
            "floatbased" => Some(Self::FloatBased),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongestPath => "longestPath",
            Self::FloatBased => "floatBased",
        }
    }
}

impl FromStr for CriticalityMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| EngineError::UnknownMode(s.to_string()))
    }
}

/// How to choose the project-finish task when several share the latest finish date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FinishTieBreak {
    /// First task in input order wins.
    #[default]
    FirstInInput,
    /// Last task in input order wins.
    LastInInput,
    /// Lexicographically smallest task id wins.
    LowestId,
}

/// Engine settings. Callers own persistence of these values.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Classification model for the pass.
    pub mode: CriticalityMode,
    /// Float-based: tasks with 0 < float <= threshold are near-critical.
    pub float_threshold: f64,
    /// Longest-path: off-chain tasks with slack <= tolerance are near-critical.
    pub near_critical_tolerance: f64,
    /// Tie-break for the project-finish task.
    pub finish_tie_break: FinishTieBreak,
    /// Group rows by WBS levels.
    pub wbs_enabled: bool,
    /// Expand state for groups without a global or manual override.
    pub default_expanded: bool,
    /// Suppress groups that have no visible tasks after filtering.
    pub hide_empty_groups: bool,
    /// Node budget for each traversal call.
    pub max_traversal_nodes: usize,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: CriticalityMode::LongestPath,
            float_threshold: 0.0,
            near_critical_tolerance: 0.0,
            finish_tie_break: FinishTieBreak::FirstInInput,
            wbs_enabled: true,
            default_expanded: true,
            hide_empty_groups: false,
            max_traversal_nodes: DEFAULT_MAX_TRAVERSAL_NODES,
            verbosity: 0,
        }
    }
}

impl EngineConfig {
    /// Clamp every setting into its valid range.
    ///
    /// Invalid values are never fatal; each adjustment is reported as a
    /// `ConfigClamped` diagnostic.
    pub fn normalized(&self) -> (Self, Vec<Diagnostic>) {
        let mut config = self.clone();
        let mut diagnostics = Vec::new();

        let threshold = clamp_days(self.float_threshold);
        if threshold != self.float_threshold {
            diagnostics.push(Diagnostic::ConfigClamped {
                setting: "float_threshold",
                requested: self.float_threshold.to_string(),
                applied: threshold.to_string(),
            });
            config.float_threshold = threshold;
        }

        let tolerance = clamp_days(self.near_critical_tolerance);
        if tolerance != self.near_critical_tolerance {
            diagnostics.push(Diagnostic::ConfigClamped {
                setting: "near_critical_tolerance",
                requested: self.near_critical_tolerance.to_string(),
                applied: tolerance.to_string(),
            });
            config.near_critical_tolerance = tolerance;
        }

        if self.max_traversal_nodes == 0 {
            diagnostics.push(Diagnostic::ConfigClamped {
                setting: "max_traversal_nodes",
                requested: "0".to_string(),
                applied: "1".to_string(),
            });
            config.max_traversal_nodes = 1;
        }

        (config, diagnostics)
    }
}

/// Clamp a day count into `[0, MAX_FLOAT_THRESHOLD_DAYS]`; NaN becomes 0.
fn clamp_days(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_FLOAT_THRESHOLD_DAYS)
}
