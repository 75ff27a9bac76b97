//! Task dependency and critical-path scheduling engine.
//!
//! Turns a graph of tasks with typed precedence links, durations and resource
//! assignments into a consistent timeline: CPM timing and float, every
//! critical path, calendar dates under a working-day calendar, resource
//! conflicts, and baseline variance.
//!
//! All computation is pure and synchronous. Inputs are validated once when
//! the [`DependencyGraph`] is built.

#[macro_use]
pub mod logging;

pub mod baseline;
pub mod calendar;
pub mod config;
pub mod conflicts;
pub mod critical_path;
pub mod engine;
pub mod gantt;
pub mod graph;
mod interner;
pub mod models;
pub mod scheduler;

#[cfg(feature = "python")]
mod python;

pub use baseline::{compare, Baseline, BaselineEntry, ScopeChanges, TaskVariance, VarianceReport};
pub use calendar::{CalendarError, WorkdayAxis, WorkingCalendar};
pub use config::{ConfigError, EngineConfig};
pub use conflicts::{
    assignments_from_schedule, find_conflicts, find_overlaps, Assignment, Conflict, Interval,
    ResourceReport,
};
pub use critical_path::{
    compute_timing, compute_timing_with_constraints, Infeasibility, OffsetConstraint, TaskTiming,
    TimingError, TimingResult,
};
pub use engine::{EngineError, ProjectPlan, ProjectRequest, ScheduleEngine};
pub use gantt::{request_from_gantt, GanttLink, GanttResponse, GanttTask};
pub use graph::{DependencyGraph, Edge, GraphError};
pub use interner::NodeId;
pub use models::{
    DependencyLink, LinkType, ManualConstraint, Schedule, ScheduledInterval, TaskNode,
    UnknownLinkTypeCode,
};
pub use scheduler::{auto_schedule, constraint_offsets, AutoScheduler, ScheduleError};
