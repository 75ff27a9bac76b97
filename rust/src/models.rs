//! Core data types for the scheduling engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Precedence relation between two tasks.
///
/// Serialized as the integer codes used by the Gantt API contract:
/// `0=finish_to_start, 1=start_to_start, 2=finish_to_finish, 3=start_to_finish`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LinkType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

/// Raised when a wire link type code is outside 0..=3.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unknown link type code: {0} (expected 0-3)")]
pub struct UnknownLinkTypeCode(pub u8);

impl LinkType {
    pub fn code(self) -> u8 {
        match self {
            LinkType::FinishToStart => 0,
            LinkType::StartToStart => 1,
            LinkType::FinishToFinish => 2,
            LinkType::StartToFinish => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, UnknownLinkTypeCode> {
        match code {
            0 => Ok(LinkType::FinishToStart),
            1 => Ok(LinkType::StartToStart),
            2 => Ok(LinkType::FinishToFinish),
            3 => Ok(LinkType::StartToFinish),
            other => Err(UnknownLinkTypeCode(other)),
        }
    }
}

impl TryFrom<u8> for LinkType {
    type Error = UnknownLinkTypeCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        LinkType::from_code(code)
    }
}

impl From<LinkType> for u8 {
    fn from(link_type: LinkType) -> Self {
        link_type.code()
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkType::FinishToStart => "finish_to_start",
            LinkType::StartToStart => "start_to_start",
            LinkType::FinishToFinish => "finish_to_finish",
            LinkType::StartToFinish => "start_to_finish",
        };
        f.write_str(name)
    }
}

/// Date constraint pinned on a task by a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManualConstraint {
    /// Task may not start before `date`.
    StartNoEarlierThan { date: NaiveDate },
    /// Task starts exactly on `date`.
    MustStartOn { date: NaiveDate },
    /// Task's last working day is exactly `date`.
    MustFinishOn { date: NaiveDate },
}

impl ManualConstraint {
    pub fn date(&self) -> NaiveDate {
        match self {
            ManualConstraint::StartNoEarlierThan { date }
            | ManualConstraint::MustStartOn { date }
            | ManualConstraint::MustFinishOn { date } => *date,
        }
    }
}

impl std::fmt::Display for ManualConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManualConstraint::StartNoEarlierThan { date } => {
                write!(f, "start_no_earlier_than {}", date)
            }
            ManualConstraint::MustStartOn { date } => write!(f, "must_start_on {}", date),
            ManualConstraint::MustFinishOn { date } => write!(f, "must_finish_on {}", date),
        }
    }
}

/// A task as handed to the engine by the task-management system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    /// Display title; not used by any pass.
    #[serde(default)]
    pub name: Option<String>,
    /// Working days; ignored for milestones.
    pub duration: i64,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default)]
    pub assignee_id: Option<String>,
    /// Percent complete (0-100). Informational only.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub manual_constraint: Option<ManualConstraint>,
    /// Origin record kind (task, event, reminder). Passed through untouched.
    #[serde(default)]
    pub source_type: Option<String>,
}

impl TaskNode {
    pub fn new(id: impl Into<String>, duration: i64) -> Self {
        Self {
            id: id.into(),
            name: None,
            duration,
            is_milestone: false,
            assignee_id: None,
            progress: 0,
            manual_constraint: None,
            source_type: None,
        }
    }

    pub fn milestone(id: impl Into<String>) -> Self {
        Self {
            is_milestone: true,
            ..Self::new(id, 0)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_assignee(mut self, assignee_id: impl Into<String>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    pub fn with_constraint(mut self, constraint: ManualConstraint) -> Self {
        self.manual_constraint = Some(constraint);
        self
    }

    /// Duration used by the passes: milestones are always zero.
    pub fn effective_duration(&self) -> i64 {
        if self.is_milestone {
            0
        } else {
            self.duration
        }
    }
}

/// A typed precedence link from `source_id` (predecessor) to `target_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLink {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type", default)]
    pub link_type: LinkType,
    /// Working days; negative values are leads.
    #[serde(default)]
    pub lag: i64,
}

impl DependencyLink {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        link_type: LinkType,
        lag: i64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            link_type,
            lag,
        }
    }

    pub fn finish_to_start(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(source_id, target_id, LinkType::FinishToStart, 0)
    }
}

/// Concrete dates assigned to a task. `[start, end)` is half-open.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledInterval {
    pub task_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Working days covered by the interval.
    pub duration: i64,
}

/// A full project schedule, ordered as the input task list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub entries: Vec<ScheduledInterval>,
}

impl Schedule {
    pub fn get(&self, task_id: &str) -> Option<&ScheduledInterval> {
        self.entries.iter().find(|e| e.task_id == task_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest exclusive end over all entries.
    pub fn finish_date(&self) -> Option<NaiveDate> {
        self.entries.iter().map(|e| e.end).max()
    }
}
