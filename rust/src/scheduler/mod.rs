//! Auto-scheduling of CPM results onto a working calendar.
//!
//! Converts working-day offsets from the forward pass into concrete dates
//! starting at the project anchor.

mod core;

pub use core::{auto_schedule, constraint_offsets, AutoScheduler, ScheduleError};
