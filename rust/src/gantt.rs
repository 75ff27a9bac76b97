//! Gantt API wire shapes.
//!
//! camelCase task items and links with integer type codes, as consumed by the
//! Gantt chart front end. Conversions go both ways: incoming items become
//! engine inputs, and a computed plan becomes a response.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::{ProjectPlan, ProjectRequest};
use crate::models::{DependencyLink, LinkType, TaskNode};

/// One bar on the chart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttTask {
    pub id: String,
    pub text: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: i64,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub is_critical: bool,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub float: i64,
}

impl GanttTask {
    /// Engine input for this item. Computed fields are dropped.
    pub fn to_task_node(&self) -> TaskNode {
        TaskNode {
            id: self.id.clone(),
            name: Some(self.text.clone()),
            duration: self.duration,
            is_milestone: self.is_milestone,
            assignee_id: self.assignee_id.clone(),
            progress: self.progress,
            manual_constraint: None,
            source_type: self.source_type.clone(),
        }
    }
}

/// A dependency arrow. `type` is the integer code 0-3.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GanttLink {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub link_type: LinkType,
    #[serde(default)]
    pub lag: i64,
}

impl GanttLink {
    pub fn from_dependency(id: impl Into<String>, link: &DependencyLink) -> Self {
        Self {
            id: id.into(),
            source: link.source_id.clone(),
            target: link.target_id.clone(),
            link_type: link.link_type,
            lag: link.lag,
        }
    }
}

impl From<&GanttLink> for DependencyLink {
    fn from(link: &GanttLink) -> Self {
        DependencyLink::new(
            link.source.clone(),
            link.target.clone(),
            link.link_type,
            link.lag,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttResponse {
    pub data: Vec<GanttTask>,
    pub links: Vec<GanttLink>,
    pub critical_paths: Vec<Vec<String>>,
    pub project_duration: i64,
}

impl GanttResponse {
    /// Merge request inputs with computed timing and dates.
    ///
    /// Tasks come out in request order; links are numbered from 1.
    pub fn from_plan(request: &ProjectRequest, plan: &ProjectPlan) -> Self {
        let data = request
            .tasks
            .iter()
            .filter_map(|task| {
                let interval = plan.schedule.get(&task.id)?;
                let timing = plan.timing.get(&task.id)?;
                Some(GanttTask {
                    id: task.id.clone(),
                    text: task.name.clone().unwrap_or_else(|| task.id.clone()),
                    start_date: interval.start,
                    end_date: interval.end,
                    duration: interval.duration,
                    progress: task.progress,
                    is_critical: timing.is_critical,
                    is_milestone: task.is_milestone,
                    source_type: task.source_type.clone(),
                    assignee_id: task.assignee_id.clone(),
                    float: timing.float,
                })
            })
            .collect();

        let links = request
            .links
            .iter()
            .enumerate()
            .map(|(i, link)| GanttLink::from_dependency((i + 1).to_string(), link))
            .collect();

        Self {
            data,
            links,
            critical_paths: plan.timing.critical_paths.clone(),
            project_duration: plan.timing.project_duration,
        }
    }
}

/// Build a planning request from chart items.
pub fn request_from_gantt(
    project_id: impl Into<String>,
    tasks: &[GanttTask],
    links: &[GanttLink],
    anchor: NaiveDate,
) -> ProjectRequest {
    ProjectRequest::new(
        project_id,
        tasks.iter().map(GanttTask::to_task_node).collect(),
        links.iter().map(DependencyLink::from).collect(),
        anchor,
    )
}
