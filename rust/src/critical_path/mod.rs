//! Criticality analysis.
//!
//! Two mutually exclusive classification models share one set of types:
//! the reflective longest-path analyzer (driving relationships derived from
//! scheduled dates) and the float-based analyzer (caller-supplied total
//! float). Driving chains are enumerated over whichever relationships the
//! active model considers critical.

mod driving_chain;
mod float_based;
mod longest_path;
mod types;

pub use driving_chain::{
    enumerate_driving_chains, rank_chains, select_longest, ChainNavigator,
};
pub use float_based::{
    analyze_float_based, classify_float, trace_float_path, FloatBasedResult, FloatTrace,
};
pub use longest_path::{
    analyze_longest_path, compute_slack, mark_driving_relationships, relationship_float,
    walk_driving_predecessors, LongestPathResult,
};
pub use types::{cmp_days, Classification, Criticality, DrivingChain, DAYS_EPSILON};
