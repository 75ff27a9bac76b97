//! Logging macros for the engine with verbosity level control.
//!
//! Events go through `tracing` and are only constructed when the configured
//! verbosity allows it. Verbosity levels:
//! - 0: SILENT (only errors, returned as values)
//! - 1: CHANGES (graph built, schedule produced, conflicts found)
//! - 2: CHECKS (per-task constraint decisions)
//! - 3: DEBUG (full pass internals)
//!
//! The library never installs a subscriber on its own; embedders call
//! [`init_logging`] or bring their own.

use std::sync::Once;

use tracing_subscriber::fmt;

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Environment variable consulted by [`init_logging`] when no level is given.
pub const LOG_ENV_VAR: &str = "GANTT_ENGINE_LOG";

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: graph builds, schedule results, conflict summaries.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!(target: "gantt_engine", $($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: constraint application, infeasibility details.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!(target: "gantt_engine", $($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: per-task forward/backward pass values.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!(target: "gantt_engine", $($arg)*);
        }
    };
}

static INIT: Once = Once::new();

/// Install a stderr `tracing` subscriber.
///
/// Priority for the level: the `level` argument, then `GANTT_ENGINE_LOG`,
/// then `info`. Calling it more than once is a no-op.
pub fn init_logging(level: Option<&str>) {
    let level = level
        .and_then(parse_level_str)
        .or_else(|| {
            std::env::var(LOG_ENV_VAR)
                .ok()
                .and_then(|s| parse_level_str(&s))
        })
        .unwrap_or(tracing::Level::INFO);

    INIT.call_once(|| {
        // Another subscriber may already be installed by the host process.
        let _ = fmt()
            .with_max_level(level)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
