//! Project planning facade.
//!
//! Wires the components together for one project:
//! graph build -> constraint offsets -> CPM -> auto-schedule -> conflicts.
//! Every call works on its own freshly built graph, so independent projects
//! can be planned concurrently.

use std::num::NonZeroUsize;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::baseline::{compare, Baseline, VarianceReport};
use crate::calendar::{CalendarError, WorkingCalendar};
use crate::config::{ConfigError, EngineConfig};
use crate::conflicts::{assignments_from_schedule, find_conflicts, Interval, ResourceReport};
use crate::critical_path::{compute_timing_with_constraints, TimingError, TimingResult};
use crate::graph::{DependencyGraph, GraphError};
use crate::models::{DependencyLink, Schedule, TaskNode};
use crate::scheduler::{constraint_offsets, AutoScheduler, ScheduleError};
use crate::{log_changes, log_checks};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Timing(#[from] TimingError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Everything needed to plan one project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub project_id: String,
    pub tasks: Vec<TaskNode>,
    #[serde(default)]
    pub links: Vec<DependencyLink>,
    #[serde(default)]
    pub calendar: WorkingCalendar,
    /// First day the project may use. Moved forward to a working day.
    pub anchor: NaiveDate,
    /// Window for workload reporting; `None` uses each assignee's own span.
    #[serde(default)]
    pub resource_window: Option<Interval<NaiveDate>>,
}

impl ProjectRequest {
    pub fn new(
        project_id: impl Into<String>,
        tasks: Vec<TaskNode>,
        links: Vec<DependencyLink>,
        anchor: NaiveDate,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            tasks,
            links,
            calendar: WorkingCalendar::default(),
            anchor,
            resource_window: None,
        }
    }

    pub fn with_calendar(mut self, calendar: WorkingCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_resource_window(mut self, window: Interval<NaiveDate>) -> Self {
        self.resource_window = Some(window);
        self
    }
}

/// Computed timeline for one project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub project_id: String,
    pub timing: TimingResult,
    pub schedule: Schedule,
    pub resources: ResourceReport,
}

impl ProjectPlan {
    /// Freeze this plan's dates as a baseline.
    pub fn capture_baseline(&self, captured_at: DateTime<Utc>) -> Baseline {
        Baseline::capture(self.project_id.clone(), captured_at, &self.schedule)
    }

    pub fn variance_against(&self, baseline: &Baseline) -> VarianceReport {
        compare(baseline, &self.schedule)
    }
}

/// Stateless planner holding only configuration.
#[derive(Clone, Debug)]
pub struct ScheduleEngine {
    config: EngineConfig,
}

impl ScheduleEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Plan one project.
    ///
    /// Structural, cycle, calendar and (outside best-effort mode)
    /// infeasibility errors abort the computation; nothing partial is
    /// returned.
    pub fn plan(&self, request: &ProjectRequest) -> Result<ProjectPlan, EngineError> {
        let verbosity = self.config.verbosity;
        let calendar = request
            .calendar
            .clone()
            .with_lookahead_days(self.config.lookahead_days);

        let graph = DependencyGraph::build(&request.tasks, &request.links)?;
        log_changes!(
            verbosity,
            "Project {}: {} tasks, {} links",
            request.project_id,
            graph.len(),
            graph.edges().len()
        );

        let constraints = constraint_offsets(&graph, request.anchor, &calendar)?;
        let timing = compute_timing_with_constraints(&graph, &constraints, &self.config)?;
        if !timing.is_feasible() {
            log_checks!(
                verbosity,
                "Project {}: {} task(s) violate manual constraints",
                request.project_id,
                timing.infeasible.len()
            );
        }

        let schedule = AutoScheduler::new(&calendar, request.anchor, verbosity)
            .schedule(&graph, &timing)?;

        let assignments = assignments_from_schedule(&graph, &schedule);
        let resources = find_conflicts(
            &assignments,
            &calendar,
            request.resource_window,
            self.config.minutes_per_unit,
            verbosity,
        );

        log_changes!(
            verbosity,
            "Project {}: duration {}, {} critical path(s), {} conflict(s)",
            request.project_id,
            timing.project_duration,
            timing.critical_paths.len(),
            resources.conflict_count()
        );

        Ok(ProjectPlan {
            project_id: request.project_id.clone(),
            timing,
            schedule,
            resources,
        })
    }

    /// Plan independent projects in parallel. Results are in input order.
    pub fn plan_projects(
        &self,
        requests: &[ProjectRequest],
    ) -> Vec<Result<ProjectPlan, EngineError>> {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        if requests.len() <= 1 || workers == 1 {
            return requests.iter().map(|r| self.plan(r)).collect();
        }

        let chunk_size = requests.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = requests
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || chunk.iter().map(|r| self.plan(r)).collect::<Vec<_>>())
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}
