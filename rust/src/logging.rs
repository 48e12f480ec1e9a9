//! Logging macros for the engine with verbosity level control.
//!
//! Nothing is evaluated when disabled (verbosity=0). Events go through
//! `tracing`, so the host decides where they end up.
//! Verbosity levels:
//! - 0: SILENT (diagnostics are still returned, nothing is logged)
//! - 1: CHANGES (pass summaries, classification results)
//! - 2: CHECKS (per-relationship and per-group decisions)
//! - 3: DEBUG (full traversal internals)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: pass summaries, project finish selection, chain counts.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!(target: "cpgantt", $($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: driving decisions, clamped settings, expand resolution.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!(target: "cpgantt", $($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: traversal steps.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!(target: "cpgantt", $($arg)*);
        }
    };
}
