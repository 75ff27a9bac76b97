//! Critical path method (CPM).
//!
//! Forward pass for earliest start/finish, backward pass for latest
//! start/finish, float per task, and enumeration of every critical path.

mod calculation;
mod paths;
mod types;

pub use calculation::{compute_timing, compute_timing_with_constraints, TimingError};
pub use types::{Infeasibility, OffsetConstraint, TaskTiming, TimingResult};
