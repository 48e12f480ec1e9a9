//! Per-call traversal state with an explicit node budget.
//!
//! Every graph walk owns one `Traversal`: the visited set lives here and is
//! dropped with it, so walks never share state and can be retried freely.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::interner::TaskIdx;

/// A traversal that hit its node budget. Carries whatever was found so far.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{traversal} stopped after visiting {visited} nodes (limit {limit})")]
pub struct PartialTraversal<T> {
    pub traversal: &'static str,
    pub partial: T,
    pub visited: usize,
    pub limit: usize,
}

impl<T> PartialTraversal<T> {
    pub fn diagnostic(&self) -> Diagnostic {
        Diagnostic::TraversalTruncated {
            traversal: self.traversal,
            visited: self.visited,
            limit: self.limit,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PartialTraversal<U> {
        PartialTraversal {
            traversal: self.traversal,
            partial: f(self.partial),
            visited: self.visited,
            limit: self.limit,
        }
    }
}

/// Outcome of a bounded walk: complete, or partial with the same payload type.
pub type TraversalResult<T> = Result<T, PartialTraversal<T>>;

/// Split a traversal result into its value and an optional truncation diagnostic.
pub fn into_parts<T>(result: TraversalResult<T>) -> (T, Option<Diagnostic>) {
    match result {
        Ok(value) => (value, None),
        Err(partial) => {
            let diag = partial.diagnostic();
            (partial.partial, Some(diag))
        }
    }
}

/// Visited set plus node budget for a single traversal call.
#[derive(Debug)]
pub struct Traversal {
    name: &'static str,
    visited: FxHashSet<TaskIdx>,
    limit: usize,
    exhausted: bool,
}

impl Traversal {
    pub fn new(name: &'static str, limit: usize) -> Self {
        Self {
            name,
            visited: FxHashSet::default(),
            limit: limit.max(1),
            exhausted: false,
        }
    }

    /// Mark a node visited. Returns false if it was already visited or the
    /// budget is spent; the latter also flags the traversal as exhausted.
    pub fn visit(&mut self, idx: TaskIdx) -> bool {
        if self.visited.contains(&idx) {
            return false;
        }
        if self.visited.len() >= self.limit {
            self.exhausted = true;
            return false;
        }
        self.visited.insert(idx);
        true
    }

    #[inline]
    pub fn is_visited(&self, idx: TaskIdx) -> bool {
        self.visited.contains(&idx)
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Wrap a finished walk's value, partial if the budget ran out.
    pub fn finish<T>(self, value: T) -> TraversalResult<T> {
        if self.exhausted {
            Err(PartialTraversal {
                traversal: self.name,
                partial: value,
                visited: self.visited.len(),
                limit: self.limit,
            })
        } else {
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_once() {
        let mut t = Traversal::new("test", 10);
        assert!(t.visit(3));
        assert!(!t.visit(3));
        assert!(t.is_visited(3));
        assert_eq!(t.visited_count(), 1);
        assert_eq!(t.finish(()), Ok(()));
    }

    #[test]
    fn test_budget_exhaustion_is_partial() {
        let mut t = Traversal::new("walk", 2);
        assert!(t.visit(0));
        assert!(t.visit(1));
        assert!(!t.visit(2));
        assert!(t.is_exhausted());

        let err = t.finish(vec![0, 1]).unwrap_err();
        assert_eq!(err.partial, vec![0, 1]);
        assert_eq!(err.visited, 2);
        assert_eq!(err.limit, 2);
        assert!(matches!(
            err.diagnostic(),
            Diagnostic::TraversalTruncated { limit: 2, .. }
        ));
    }

    #[test]
    fn test_zero_limit_allows_one_node() {
        let mut t = Traversal::new("walk", 0);
        assert!(t.visit(7));
        assert!(!t.visit(8));
    }
}
