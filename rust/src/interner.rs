//! Task id index.
//!
//! Maps external task id strings to dense arena indices so the graph can
//! use plain vectors for adjacency.

use rustc_hash::FxHashMap;

/// Index of a task in the graph arena (also its stable `internal_id`).
pub type TaskIdx = usize;

/// Bidirectional map between task id strings and arena indices.
#[derive(Debug, Clone, Default)]
pub struct TaskIdInterner {
    to_idx: FxHashMap<String, TaskIdx>,
    from_idx: Vec<String>,
}

impl TaskIdInterner {
    /// Create a new interner with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_idx: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_idx: Vec::with_capacity(capacity),
        }
    }

    /// Intern an id. Returns `(idx, true)` when the id is new.
    pub fn intern(&mut self, s: &str) -> (TaskIdx, bool) {
        if let Some(&idx) = self.to_idx.get(s) {
            return (idx, false);
        }
        let idx = self.from_idx.len();
        self.from_idx.push(s.to_string());
        self.to_idx.insert(s.to_string(), idx);
        (idx, true)
    }

    #[inline]
    pub fn get(&self, s: &str) -> Option<TaskIdx> {
        self.to_idx.get(s).copied()
    }

    #[inline]
    pub fn resolve(&self, idx: TaskIdx) -> Option<&str> {
        self.from_idx.get(idx).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.from_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_idx.is_empty()
    }
}
