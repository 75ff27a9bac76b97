//! Baseline snapshots and variance analysis.
//!
//! A baseline freezes the planned dates of a schedule. Comparison is always
//! snapshot-vs-current; a newer snapshot supersedes an older one but never
//! modifies it.

use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::models::Schedule;

/// Planned dates for one task at capture time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub task_id: String,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub planned_duration: i64,
}

/// Immutable snapshot of a project schedule.
///
/// Fields are private so a captured baseline cannot be edited in place;
/// serde round-trips it for persistence by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    project_id: String,
    captured_at: DateTime<Utc>,
    entries: Vec<BaselineEntry>,
}

impl Baseline {
    pub fn capture(
        project_id: impl Into<String>,
        captured_at: DateTime<Utc>,
        schedule: &Schedule,
    ) -> Self {
        let entries = schedule
            .entries
            .iter()
            .map(|e| BaselineEntry {
                task_id: e.task_id.clone(),
                planned_start: e.start,
                planned_end: e.end,
                planned_duration: e.duration,
            })
            .collect();
        Self {
            project_id: project_id.into(),
            captured_at,
            entries,
        }
    }

    /// Capture a new snapshot of the same project. `self` is left untouched.
    pub fn supersede(&self, captured_at: DateTime<Utc>, schedule: &Schedule) -> Self {
        Self::capture(self.project_id.clone(), captured_at, schedule)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn entries(&self) -> &[BaselineEntry] {
        &self.entries
    }

    pub fn get(&self, task_id: &str) -> Option<&BaselineEntry> {
        self.entries.iter().find(|e| e.task_id == task_id)
    }
}

/// Drift of one task present in both the baseline and the current schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskVariance {
    pub task_id: String,
    /// Calendar days between planned and current start; positive = slipped.
    pub schedule_variance: i64,
    /// Calendar days between planned and current end.
    pub finish_variance: i64,
    /// Working days added (positive) or removed (negative).
    pub duration_variance: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeChanges {
    /// In the current schedule only, in schedule order.
    pub added: Vec<String>,
    /// In the baseline only, in baseline order.
    pub removed: Vec<String>,
}

impl ScopeChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub per_task: Vec<TaskVariance>,
    pub scope_changes: ScopeChanges,
}

impl VarianceReport {
    /// True when no task drifted and the task set is the same.
    pub fn is_unchanged(&self) -> bool {
        self.scope_changes.is_empty()
            && self.per_task.iter().all(|v| {
                v.schedule_variance == 0 && v.finish_variance == 0 && v.duration_variance == 0
            })
    }

    /// Tasks that start later than planned.
    pub fn slipped(&self) -> impl Iterator<Item = &TaskVariance> {
        self.per_task.iter().filter(|v| v.schedule_variance > 0)
    }
}

/// Compare the current schedule against a baseline.
///
/// Every task appears either in `per_task` or in `scope_changes`.
pub fn compare(baseline: &Baseline, current: &Schedule) -> VarianceReport {
    let planned: FxHashMap<&str, &BaselineEntry> = baseline
        .entries
        .iter()
        .map(|e| (e.task_id.as_str(), e))
        .collect();

    let mut report = VarianceReport::default();

    for entry in &current.entries {
        match planned.get(entry.task_id.as_str()) {
            Some(plan) => report.per_task.push(TaskVariance {
                task_id: entry.task_id.clone(),
                schedule_variance: (entry.start - plan.planned_start).num_days(),
                finish_variance: (entry.end - plan.planned_end).num_days(),
                duration_variance: entry.duration - plan.planned_duration,
            }),
            None => report.scope_changes.added.push(entry.task_id.clone()),
        }
    }

    let current_ids: FxHashMap<&str, ()> = current
        .entries
        .iter()
        .map(|e| (e.task_id.as_str(), ()))
        .collect();
    report.scope_changes.removed = baseline
        .entries
        .iter()
        .filter(|e| !current_ids.contains_key(e.task_id.as_str()))
        .map(|e| e.task_id.clone())
        .collect();

    report
}
