//! Work breakdown structure grouping.

mod expand;
mod hierarchy;

pub use expand::{ExpandController, ExpandOrigin, GlobalExpand};
pub use hierarchy::{GroupEntry, GroupIdx, WbsGroup, WbsHierarchy};
