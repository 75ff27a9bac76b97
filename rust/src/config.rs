//! Configuration types for the scheduling engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Roughly ten years of calendar days.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 3653;

/// One eight-hour working day.
pub const DEFAULT_MINUTES_PER_UNIT: u32 = 480;

/// Errors for configuration values that would make the engine misbehave.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {field} must be greater than zero")]
    MustBePositive { field: &'static str },
}

/// Engine-wide knobs shared by every pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// How many consecutive calendar days may be scanned for a working day
    /// before the calendar is declared exhausted.
    pub lookahead_days: u32,
    /// Return timing for feasible tasks even when a manual constraint makes
    /// some float negative.
    pub best_effort: bool,
    /// Upper bound on the number of critical paths enumerated.
    pub max_critical_paths: usize,
    /// Minutes represented by one duration unit (workload reporting).
    pub minutes_per_unit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            best_effort: false,
            max_critical_paths: 10_000,
            minutes_per_unit: DEFAULT_MINUTES_PER_UNIT,
        }
    }
}

impl EngineConfig {
    /// Reject values that cannot produce a meaningful schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookahead_days == 0 {
            return Err(ConfigError::MustBePositive {
                field: "lookahead_days",
            });
        }
        if self.max_critical_paths == 0 {
            return Err(ConfigError::MustBePositive {
                field: "max_critical_paths",
            });
        }
        if self.minutes_per_unit == 0 {
            return Err(ConfigError::MustBePositive {
                field: "minutes_per_unit",
            });
        }
        Ok(())
    }
}
