//! Critical-path analysis and WBS grouping for timeline charts.
//!
//! Ingested task rows become a [`TaskGraph`]. Each [`Engine`] pass then
//! classifies tasks under one of two criticality models, ranks the driving
//! chains into a target task, rolls tasks up into a WBS tree and assigns
//! the dense row order the renderer consumes. Nothing here is fatal:
//! malformed input degrades to best-effort output plus [`Diagnostic`]s.

pub mod config;
pub mod critical_path;
pub mod cycles;
pub mod diagnostics;
pub mod engine;
pub mod graph;
pub mod interner;
pub mod logging;
pub mod models;
pub mod ordering;
pub mod traversal;
pub mod wbs;

#[cfg(feature = "python")]
pub mod python;

pub use config::{CriticalityMode, EngineConfig, FinishTieBreak};
pub use critical_path::{ChainNavigator, Classification, Criticality, DrivingChain};
pub use cycles::detect_circular_dependencies;
pub use diagnostics::{Diagnostic, EngineError, Severity};
pub use engine::{Engine, PassOutput, PassRequest};
pub use graph::TaskGraph;
pub use interner::TaskIdx;
pub use models::{
    DatePair, PredecessorLink, RelIdx, Relationship, RelationshipType, Task, TaskInput, TaskType,
};
pub use ordering::Row;
pub use traversal::PartialTraversal;
pub use wbs::{ExpandController, ExpandOrigin, GlobalExpand, GroupIdx, WbsGroup, WbsHierarchy};
