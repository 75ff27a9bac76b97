//! Resource conflict detection and workload reporting.
//!
//! Runs independently of the CPM passes: it only needs assignee-to-interval
//! mappings, either derived from a computed schedule or supplied directly.
//! Conflicts are findings, never errors.

mod sweep;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkingCalendar;
use crate::graph::DependencyGraph;
use crate::log_changes;
use crate::models::Schedule;

pub use sweep::{find_overlaps, Interval};

/// One task held by one assignee over a date interval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub assignee_id: String,
    pub task_id: String,
    pub interval: Interval<NaiveDate>,
}

/// Two assignments of the same assignee whose intervals overlap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub task_a: String,
    pub task_b: String,
    pub overlap: Interval<NaiveDate>,
}

/// Conflicts and workload per assignee. Maps are ordered by assignee id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub conflicts_by_assignee: BTreeMap<String, Vec<Conflict>>,
    /// Scheduled working minutes within the queried window.
    pub workload_by_assignee: BTreeMap<String, i64>,
    /// Assignees whose workload exceeds their working capacity in the window.
    pub overallocated: Vec<String>,
}

impl ResourceReport {
    pub fn conflict_count(&self) -> usize {
        self.conflicts_by_assignee.values().map(Vec::len).sum()
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflict_count() > 0
    }
}

/// Build the assignment view from a schedule. Tasks without an assignee are
/// skipped.
pub fn assignments_from_schedule(graph: &DependencyGraph, schedule: &Schedule) -> Vec<Assignment> {
    schedule
        .entries
        .iter()
        .filter_map(|entry| {
            let node = graph.node(graph.node_id(&entry.task_id)?);
            let assignee_id = node.assignee_id.clone()?;
            Some(Assignment {
                assignee_id,
                task_id: entry.task_id.clone(),
                interval: Interval::new(entry.start, entry.end),
            })
        })
        .collect()
}

/// Working minutes of `interval` that fall inside `window` (whole interval
/// when no window is given).
fn scheduled_minutes(
    interval: &Interval<NaiveDate>,
    window: Option<&Interval<NaiveDate>>,
    calendar: &WorkingCalendar,
    minutes_per_unit: u32,
) -> i64 {
    let clipped = match window {
        Some(w) => match interval.intersection(w) {
            Some(c) => c,
            None => return 0,
        },
        None => *interval,
    };
    calendar.working_days_between(clipped.start, clipped.end) * i64::from(minutes_per_unit)
}

/// Find conflicting assignments and compute workload per assignee.
///
/// # Arguments
/// * `assignments` - Assignee/task/interval triples, any order
/// * `calendar` - Working calendar used to turn intervals into working minutes
/// * `window` - Date range for workload and capacity; `None` means each
///   assignee's own span from first start to last end
/// * `minutes_per_unit` - Minutes in one working day
/// * `verbosity` - Logging verbosity
pub fn find_conflicts(
    assignments: &[Assignment],
    calendar: &WorkingCalendar,
    window: Option<Interval<NaiveDate>>,
    minutes_per_unit: u32,
    verbosity: u8,
) -> ResourceReport {
    let mut by_assignee: FxHashMap<&str, Vec<(String, Interval<NaiveDate>)>> =
        FxHashMap::default();
    for assignment in assignments {
        by_assignee
            .entry(assignment.assignee_id.as_str())
            .or_default()
            .push((assignment.task_id.clone(), assignment.interval));
    }

    let mut report = ResourceReport::default();

    for (assignee, items) in by_assignee {
        let conflicts: Vec<Conflict> = find_overlaps(&items)
            .into_iter()
            .map(|(task_a, task_b, overlap)| Conflict {
                task_a,
                task_b,
                overlap,
            })
            .collect();

        let workload: i64 = items
            .iter()
            .map(|(_, interval)| {
                scheduled_minutes(interval, window.as_ref(), calendar, minutes_per_unit)
            })
            .sum();

        let span = window.or_else(|| {
            let start = items.iter().map(|(_, i)| i.start).min()?;
            let end = items.iter().map(|(_, i)| i.end).max()?;
            Some(Interval::new(start, end))
        });
        let capacity = span
            .map(|s| calendar.working_days_between(s.start, s.end) * i64::from(minutes_per_unit))
            .unwrap_or(0);
        if workload > capacity {
            report.overallocated.push(assignee.to_string());
        }

        if !conflicts.is_empty() {
            log_changes!(
                verbosity,
                "Assignee {}: {} conflict(s), {} minutes scheduled",
                assignee,
                conflicts.len(),
                workload
            );
            report
                .conflicts_by_assignee
                .insert(assignee.to_string(), conflicts);
        }
        report
            .workload_by_assignee
            .insert(assignee.to_string(), workload);
    }

    report.overallocated.sort();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScheduledInterval, TaskNode};

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn assign(assignee: &str, task: &str, start: NaiveDate, end: NaiveDate) -> Assignment {
        Assignment {
            assignee_id: assignee.to_string(),
            task_id: task.to_string(),
            interval: Interval::new(start, end),
        }
    }

    fn detect(assignments: &[Assignment]) -> ResourceReport {
        find_conflicts(assignments, &WorkingCalendar::default(), None, 480, 0)
    }

    #[test]
    fn test_overallocation_scenario() {
        let assignments = vec![
            assign("X", "T1", d(2024, 1, 1), d(2024, 1, 3)),
            assign("X", "T2", d(2024, 1, 2), d(2024, 1, 4)),
        ];
        let report = detect(&assignments);

        assert_eq!(report.conflict_count(), 1);
        assert_eq!(
            report.conflicts_by_assignee["X"],
            vec![Conflict {
                task_a: "T1".to_string(),
                task_b: "T2".to_string(),
                overlap: Interval::new(d(2024, 1, 2), d(2024, 1, 3)),
            }]
        );
        // Two working days each
        assert_eq!(report.workload_by_assignee["X"], 4 * 480);
        assert_eq!(report.overallocated, vec!["X".to_string()]);
    }

    #[test]
    fn test_back_to_back_is_not_a_conflict() {
        let assignments = vec![
            assign("X", "T1", d(2024, 1, 1), d(2024, 1, 3)),
            assign("X", "T2", d(2024, 1, 3), d(2024, 1, 5)),
        ];
        let report = detect(&assignments);
        assert!(!report.has_conflicts());
        assert!(report.overallocated.is_empty());
    }

    #[test]
    fn test_different_assignees_never_conflict() {
        let assignments = vec![
            assign("X", "T1", d(2024, 1, 1), d(2024, 1, 5)),
            assign("Y", "T2", d(2024, 1, 1), d(2024, 1, 5)),
        ];
        let report = detect(&assignments);
        assert!(!report.has_conflicts());
        assert_eq!(report.workload_by_assignee.len(), 2);
    }

    #[test]
    fn test_workload_clipped_to_window() {
        let assignments = vec![assign("X", "T1", d(2024, 1, 1), d(2024, 1, 13))];
        let window = Interval::new(d(2024, 1, 8), d(2024, 1, 15));
        let report = find_conflicts(
            &assignments,
            &WorkingCalendar::default(),
            Some(window),
            60,
            0,
        );
        // Mon 8th through Fri 12th
        assert_eq!(report.workload_by_assignee["X"], 5 * 60);
        assert!(report.overallocated.is_empty());
    }

    #[test]
    fn test_workload_over_very_long_assignment() {
        let end = d(2024, 1, 1)
            .checked_add_days(chrono::Days::new(7 * 1_000_000))
            .unwrap();
        let assignments = vec![assign("X", "retainer", d(2024, 1, 1), end)];
        let report = detect(&assignments);
        assert_eq!(report.workload_by_assignee["X"], 5_000_000 * 480);
        assert!(report.overallocated.is_empty());
    }

    #[test]
    fn test_weekend_overlap_is_conflict_without_workload() {
        // Overlap falls on Saturday: still a conflict, but no extra working time
        let assignments = vec![
            assign("X", "T1", d(2024, 1, 5), d(2024, 1, 7)),
            assign("X", "T2", d(2024, 1, 6), d(2024, 1, 9)),
        ];
        let report = detect(&assignments);
        assert_eq!(report.conflict_count(), 1);
        assert!(report.overallocated.is_empty());
    }

    #[test]
    fn test_assignments_from_schedule() {
        let nodes = vec![
            TaskNode::new("a", 1).with_assignee("alice"),
            TaskNode::new("b", 1),
        ];
        let graph = DependencyGraph::build(&nodes, &[]).unwrap();
        let schedule = Schedule {
            entries: vec![
                ScheduledInterval {
                    task_id: "a".to_string(),
                    start: d(2024, 1, 1),
                    end: d(2024, 1, 2),
                    duration: 1,
                },
                ScheduledInterval {
                    task_id: "b".to_string(),
                    start: d(2024, 1, 1),
                    end: d(2024, 1, 2),
                    duration: 1,
                },
            ],
        };
        let assignments = assignments_from_schedule(&graph, &schedule);
        assert_eq!(
            assignments,
            vec![assign("alice", "a", d(2024, 1, 1), d(2024, 1, 2))]
        );
    }
}
