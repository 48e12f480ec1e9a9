//! Expand/collapse state for WBS groups.
//!
//! Three layers decide whether a group is expanded, highest first:
//! a per-group manual toggle, the global expand-to-level setting, and the
//! configured default.

use rustc_hash::FxHashMap;

use crate::diagnostics::Diagnostic;

/// Global expand-to-level state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlobalExpand {
    CollapseAll,
    /// Groups at `level <= n` are expanded.
    ToLevel(usize),
    ExpandAll,
}

impl GlobalExpand {
    /// Fold out-of-range levels into the neighbouring end state.
    pub fn clamp(self, max_depth: usize) -> Self {
        match self {
            Self::ToLevel(0) => Self::CollapseAll,
            Self::ToLevel(n) if n >= max_depth => Self::ExpandAll,
            other => other,
        }
    }

    /// Next step of collapse -> level 1 -> ... -> expand-all -> collapse.
    pub fn next(self, max_depth: usize) -> Self {
        match self {
            Self::CollapseAll => Self::ToLevel(1).clamp(max_depth),
            Self::ToLevel(n) => Self::ToLevel(n + 1).clamp(max_depth),
            Self::ExpandAll => Self::CollapseAll,
        }
    }

    pub fn expands(&self, level: usize) -> bool {
        match self {
            Self::CollapseAll => false,
            Self::ToLevel(n) => level <= *n,
            Self::ExpandAll => true,
        }
    }
}

/// Which layer decided a group's expand state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExpandOrigin {
    #[default]
    Default,
    Global,
    Manual,
}

/// Resolves the expand state of each group.
///
/// The caller owns persistence: read [`ExpandController::global`] and
/// [`ExpandController::manual_overrides`] after a change and feed them back
/// through [`ExpandController::restore`] on the next session.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandController {
    default_expanded: bool,
    global: Option<GlobalExpand>,
    manual: FxHashMap<String, bool>,
}

impl Default for ExpandController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ExpandController {
    pub fn new(default_expanded: bool) -> Self {
        Self {
            default_expanded,
            global: None,
            manual: FxHashMap::default(),
        }
    }

    pub fn restore(
        default_expanded: bool,
        global: Option<GlobalExpand>,
        manual: impl IntoIterator<Item = (String, bool)>,
    ) -> Self {
        Self {
            default_expanded,
            global,
            manual: manual.into_iter().collect(),
        }
    }

    pub fn default_expanded(&self) -> bool {
        self.default_expanded
    }

    pub fn set_default_expanded(&mut self, expanded: bool) {
        self.default_expanded = expanded;
    }

    pub fn global(&self) -> Option<GlobalExpand> {
        self.global
    }

    pub fn manual_overrides(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.manual.iter().map(|(id, &expanded)| (id.as_str(), expanded))
    }

    /// Expand state and deciding layer for one group.
    pub fn resolve(&self, group_id: &str, level: usize) -> (bool, ExpandOrigin) {
        if let Some(&expanded) = self.manual.get(group_id) {
            return (expanded, ExpandOrigin::Manual);
        }
        match self.global {
            Some(global) => (global.expands(level), ExpandOrigin::Global),
            None => (self.default_expanded, ExpandOrigin::Default),
        }
    }

    /// Advance the global state one step and drop every manual toggle.
    ///
    /// Starting from the default state, the first step collapses all.
    pub fn cycle_global(&mut self, max_depth: usize) -> GlobalExpand {
        let next = match self.global {
            Some(current) => current.clamp(max_depth).next(max_depth),
            None => GlobalExpand::CollapseAll,
        };
        self.global = Some(next);
        self.manual.clear();
        next
    }

    /// Set the global state directly, clamping the requested level into
    /// `[collapse, expand-all]`. Manual toggles are dropped.
    pub fn set_global(&mut self, request: GlobalExpand, max_depth: usize) -> Option<Diagnostic> {
        let applied = request.clamp(max_depth);
        let diagnostic = match request {
            GlobalExpand::ToLevel(n) if applied != request && n != max_depth => {
                Some(Diagnostic::ConfigClamped {
                    setting: "expand_to_level",
                    requested: n.to_string(),
                    applied: describe(applied),
                })
            }
            _ => None,
        };
        self.global = Some(applied);
        self.manual.clear();
        diagnostic
    }

    /// Flip a group relative to its currently displayed state.
    ///
    /// Returns the new state.
    pub fn toggle(&mut self, group_id: &str, current: bool) -> bool {
        let expanded = !current;
        self.manual.insert(group_id.to_string(), expanded);
        expanded
    }

    pub fn clear_manual(&mut self) {
        self.manual.clear();
    }
}

fn describe(state: GlobalExpand) -> String {
    match state {
        GlobalExpand::CollapseAll => "collapse all".to_string(),
        GlobalExpand::ToLevel(n) => format!("level {}", n),
        GlobalExpand::ExpandAll => "expand all".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_walks_levels_then_wraps() {
        let mut ctl = ExpandController::new(true);
        let steps: Vec<GlobalExpand> = (0..5).map(|_| ctl.cycle_global(3)).collect();
        assert_eq!(
            steps,
            vec![
                GlobalExpand::CollapseAll,
                GlobalExpand::ToLevel(1),
                GlobalExpand::ToLevel(2),
                GlobalExpand::ExpandAll,
                GlobalExpand::CollapseAll,
            ]
        );
    }

    #[test]
    fn test_cycle_single_level_skips_to_expand_all() {
        let mut ctl = ExpandController::new(false);
        assert_eq!(ctl.cycle_global(1), GlobalExpand::CollapseAll);
        assert_eq!(ctl.cycle_global(1), GlobalExpand::ExpandAll);
    }

    #[test]
    fn test_resolve_precedence() {
        let mut ctl = ExpandController::new(false);
        assert_eq!(ctl.resolve("L1:A", 1), (false, ExpandOrigin::Default));

        ctl.set_global(GlobalExpand::ToLevel(1), 3);
        assert_eq!(ctl.resolve("L1:A", 1), (true, ExpandOrigin::Global));
        assert_eq!(ctl.resolve("L1:A|L2:B", 2), (false, ExpandOrigin::Global));

        ctl.toggle("L1:A|L2:B", false);
        assert_eq!(ctl.resolve("L1:A|L2:B", 2), (true, ExpandOrigin::Manual));

        // Next global action clears manual toggles
        ctl.cycle_global(3);
        assert_eq!(ctl.resolve("L1:A|L2:B", 2), (true, ExpandOrigin::Global));
        assert_eq!(ctl.manual_overrides().count(), 0);
    }

    #[test]
    fn test_set_global_clamps_level() {
        let mut ctl = ExpandController::default();
        let diag = ctl.set_global(GlobalExpand::ToLevel(9), 3);
        assert_eq!(ctl.global(), Some(GlobalExpand::ExpandAll));
        assert!(matches!(
            diag,
            Some(Diagnostic::ConfigClamped {
                setting: "expand_to_level",
                ..
            })
        ));

        // Asking for exactly the deepest level is not a clamp
        assert!(ctl.set_global(GlobalExpand::ToLevel(3), 3).is_none());
        let diag = ctl.set_global(GlobalExpand::ToLevel(0), 3);
        assert_eq!(ctl.global(), Some(GlobalExpand::CollapseAll));
        assert_eq!(
            diag.map(|d| d.to_string()).as_deref(),
            Some("Setting expand_to_level = 0 is out of range; using collapse all")
        );
    }

    #[test]
    fn test_restore_round_trip() {
        let mut ctl = ExpandController::new(true);
        ctl.toggle("L1:A", true);
        let manual: Vec<(String, bool)> = ctl
            .manual_overrides()
            .map(|(id, e)| (id.to_string(), e))
            .collect();
        let restored = ExpandController::restore(true, ctl.global(), manual);
        assert_eq!(restored, ctl);
        assert_eq!(restored.resolve("L1:A", 1), (false, ExpandOrigin::Manual));
    }
}
