//! Types for critical path calculation.

use serde::{Deserialize, Serialize};

use crate::models::ManualConstraint;

/// A manual constraint converted to a working-day offset from the anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetConstraint {
    /// Earliest start is at least this offset.
    StartNoEarlierThan(i64),
    /// Start is pinned to this offset.
    MustStartOn(i64),
    /// Exclusive finish is pinned to this offset.
    MustFinishOn(i64),
}

/// Per-task timing information from the forward and backward passes.
///
/// All values are working-day offsets from the project anchor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTiming {
    pub task_id: String,
    /// Earliest possible start time (from forward pass).
    pub earliest_start: i64,
    /// Earliest possible finish time (from forward pass).
    pub earliest_finish: i64,
    /// Latest allowable start time (from backward pass).
    pub latest_start: i64,
    /// Latest allowable finish time (from backward pass).
    pub latest_finish: i64,
    /// Float = latest_start - earliest_start. Negative only for infeasible
    /// manual constraints.
    pub float: i64,
    pub is_critical: bool,
}

/// A task whose float went negative because of a manual constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infeasibility {
    pub task_id: String,
    pub float: i64,
    /// The task's own constraint, if it has one. Tasks upstream of a pinned
    /// task inherit its negative float without carrying a constraint.
    pub constraint: Option<ManualConstraint>,
}

impl std::fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{} (float {}, {})", self.task_id, self.float, c),
            None => write!(f, "{} (float {})", self.task_id, self.float),
        }
    }
}

/// Result of the CPM passes over a whole project.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingResult {
    /// One entry per task, in the order the tasks were supplied.
    pub per_task: Vec<TaskTiming>,
    /// Every chain of critical tasks from a project start to a project end.
    /// Not guaranteed to contain a single path.
    pub critical_paths: Vec<Vec<String>>,
    /// Set when enumeration stopped at `max_critical_paths`.
    pub critical_paths_truncated: bool,
    pub project_duration: i64,
    /// Sum of all task durations.
    pub total_work: i64,
    /// Populated only in best-effort mode.
    pub infeasible: Vec<Infeasibility>,
}

impl TimingResult {
    pub fn get(&self, task_id: &str) -> Option<&TaskTiming> {
        self.per_task.iter().find(|t| t.task_id == task_id)
    }

    /// Ids of tasks with zero float, in input order.
    pub fn critical_task_ids(&self) -> Vec<&str> {
        self.per_task
            .iter()
            .filter(|t| t.is_critical)
            .map(|t| t.task_id.as_str())
            .collect()
    }

    pub fn is_feasible(&self) -> bool {
        self.infeasible.is_empty()
    }
}
