//! Auto-scheduler: turns CPM offsets into concrete calendar dates.

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::{CalendarError, WorkdayAxis, WorkingCalendar};
use crate::critical_path::{OffsetConstraint, TimingResult};
use crate::graph::DependencyGraph;
use crate::interner::NodeId;
use crate::log_changes;
use crate::models::{ManualConstraint, Schedule, ScheduledInterval};

/// Errors that can occur while assigning dates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("Timing covers {got} tasks but the graph has {expected}")]
    TimingMismatch { expected: usize, got: usize },
}

/// Convert every task's manual constraint date into an offset on the
/// working-day axis anchored at `anchor`. Indexed by node id.
pub fn constraint_offsets(
    graph: &DependencyGraph,
    anchor: NaiveDate,
    calendar: &WorkingCalendar,
) -> Result<Vec<Option<OffsetConstraint>>, CalendarError> {
    let axis = WorkdayAxis::new(calendar, anchor)?;
    graph
        .nodes()
        .iter()
        .map(|node| {
            node.manual_constraint
                .map(|constraint| match constraint {
                    ManualConstraint::StartNoEarlierThan { date } => axis
                        .start_offset(date)
                        .map(OffsetConstraint::StartNoEarlierThan),
                    ManualConstraint::MustStartOn { date } => {
                        axis.start_offset(date).map(OffsetConstraint::MustStartOn)
                    }
                    ManualConstraint::MustFinishOn { date } => {
                        axis.finish_offset(date).map(OffsetConstraint::MustFinishOn)
                    }
                })
                .transpose()
        })
        .collect()
}

/// Assigns dates to tasks from a project anchor and a working calendar.
///
/// Offsets count working days, so lags and leads skip non-working days too.
pub struct AutoScheduler<'a> {
    calendar: &'a WorkingCalendar,
    anchor: NaiveDate,
    verbosity: u8,
}

impl<'a> AutoScheduler<'a> {
    pub fn new(calendar: &'a WorkingCalendar, anchor: NaiveDate, verbosity: u8) -> Self {
        Self {
            calendar,
            anchor,
            verbosity,
        }
    }

    /// Place every task at its earliest start.
    ///
    /// Pure function of its inputs: repeated calls give identical schedules.
    /// Milestones are zero-length points (`end == start`).
    pub fn schedule(
        &self,
        graph: &DependencyGraph,
        timing: &TimingResult,
    ) -> Result<Schedule, ScheduleError> {
        if timing.per_task.len() != graph.len() {
            return Err(ScheduleError::TimingMismatch {
                expected: graph.len(),
                got: timing.per_task.len(),
            });
        }

        let mut axis = WorkdayAxis::new(self.calendar, self.anchor)?;
        let mut entries = Vec::with_capacity(graph.len());

        for (idx, task_timing) in timing.per_task.iter().enumerate() {
            let duration = graph.duration(idx as NodeId);
            let start = axis.date_at(task_timing.earliest_start)?;
            let end = axis.end_date(task_timing.earliest_finish, duration)?;
            entries.push(ScheduledInterval {
                task_id: task_timing.task_id.clone(),
                start,
                end,
                duration,
            });
        }

        let schedule = Schedule { entries };
        log_changes!(
            self.verbosity,
            "Scheduled {} tasks from {} to {:?}",
            schedule.len(),
            axis.origin(),
            schedule.finish_date()
        );
        Ok(schedule)
    }
}

/// Convenience wrapper around [`AutoScheduler::schedule`].
pub fn auto_schedule(
    graph: &DependencyGraph,
    timing: &TimingResult,
    anchor: NaiveDate,
    calendar: &WorkingCalendar,
) -> Result<Schedule, ScheduleError> {
    AutoScheduler::new(calendar, anchor, 0).schedule(graph, timing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::critical_path::{compute_timing, compute_timing_with_constraints};
    use crate::models::{DependencyLink, LinkType, TaskNode};
    use chrono::Weekday;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn plan(
        nodes: &[TaskNode],
        links: &[DependencyLink],
        anchor: NaiveDate,
        calendar: &WorkingCalendar,
    ) -> Result<Schedule, ScheduleError> {
        let graph = DependencyGraph::build(nodes, links).unwrap();
        let constraints = constraint_offsets(&graph, anchor, calendar)?;
        let timing =
            compute_timing_with_constraints(&graph, &constraints, &EngineConfig::default())
                .unwrap();
        auto_schedule(&graph, &timing, anchor, calendar)
    }

    #[test]
    fn test_chain_over_weekend() {
        // 2024-01-04 is a Thursday
        let nodes = vec![TaskNode::new("a", 3), TaskNode::new("b", 2)];
        let links = vec![DependencyLink::finish_to_start("a", "b")];
        let schedule = plan(&nodes, &links, d(2024, 1, 4), &WorkingCalendar::default()).unwrap();

        let a = schedule.get("a").unwrap();
        assert_eq!((a.start, a.end), (d(2024, 1, 4), d(2024, 1, 9)));
        let b = schedule.get("b").unwrap();
        assert_eq!((b.start, b.end), (d(2024, 1, 9), d(2024, 1, 11)));
    }

    #[test]
    fn test_lag_counts_working_days() {
        // a: Thu + Fri. Lag 2 working days skips Mon and Tue, b starts Wed.
        // An elapsed-day lag would have started b on Monday.
        let nodes = vec![TaskNode::new("a", 2), TaskNode::new("b", 1)];
        let links = vec![DependencyLink::new("a", "b", LinkType::FinishToStart, 2)];
        let schedule = plan(&nodes, &links, d(2024, 1, 4), &WorkingCalendar::default()).unwrap();

        assert_eq!(schedule.get("a").unwrap().end, d(2024, 1, 6));
        let b = schedule.get("b").unwrap();
        assert_eq!(b.start, d(2024, 1, 10));
        assert_eq!(b.end, d(2024, 1, 11));
    }

    #[test]
    fn test_lag_skips_holiday() {
        let calendar = WorkingCalendar::default().with_holidays([d(2024, 1, 9)]);
        let nodes = vec![TaskNode::new("a", 1), TaskNode::new("b", 1)];
        let links = vec![DependencyLink::new("a", "b", LinkType::FinishToStart, 1)];
        // a on Mon 8th, lag skips Wed 10th (Tue 9th is a holiday), b on Thu 11th
        let schedule = plan(&nodes, &links, d(2024, 1, 8), &calendar).unwrap();
        assert_eq!(schedule.get("b").unwrap().start, d(2024, 1, 11));
    }

    #[test]
    fn test_task_spanning_holiday_stretches() {
        let calendar = WorkingCalendar::default().with_holidays([d(2024, 1, 2)]);
        let nodes = vec![TaskNode::new("a", 2)];
        let schedule = plan(&nodes, &[], d(2024, 1, 1), &calendar).unwrap();
        let a = schedule.get("a").unwrap();
        assert_eq!((a.start, a.end), (d(2024, 1, 1), d(2024, 1, 4)));
        assert_eq!(a.duration, 2);
    }

    #[test]
    fn test_milestone_is_point() {
        let nodes = vec![TaskNode::new("draft", 2), TaskNode::milestone("filed")];
        let links = vec![DependencyLink::finish_to_start("draft", "filed")];
        let schedule = plan(&nodes, &links, d(2024, 1, 1), &WorkingCalendar::default()).unwrap();
        let filed = schedule.get("filed").unwrap();
        assert_eq!(filed.start, d(2024, 1, 3));
        assert_eq!(filed.start, filed.end);
    }

    #[test]
    fn test_anchor_on_weekend_moves_to_monday() {
        let nodes = vec![TaskNode::new("a", 1)];
        let schedule = plan(&nodes, &[], d(2024, 1, 6), &WorkingCalendar::default()).unwrap();
        assert_eq!(schedule.get("a").unwrap().start, d(2024, 1, 8));
    }

    #[test]
    fn test_start_no_earlier_than_date() {
        let nodes = vec![TaskNode::new("a", 1).with_constraint(
            ManualConstraint::StartNoEarlierThan {
                date: d(2024, 1, 10),
            },
        )];
        let schedule = plan(&nodes, &[], d(2024, 1, 1), &WorkingCalendar::default()).unwrap();
        assert_eq!(schedule.get("a").unwrap().start, d(2024, 1, 10));
    }

    #[test]
    fn test_must_finish_on_date() {
        let nodes = vec![TaskNode::new("brief", 3).with_constraint(
            ManualConstraint::MustFinishOn {
                date: d(2024, 1, 12),
            },
        )];
        let schedule = plan(&nodes, &[], d(2024, 1, 1), &WorkingCalendar::default()).unwrap();
        let brief = schedule.get("brief").unwrap();
        // Wed, Thu, Fri; exclusive end on Saturday
        assert_eq!((brief.start, brief.end), (d(2024, 1, 10), d(2024, 1, 13)));
    }

    #[test]
    fn test_far_future_constraint_exhausts_calendar() {
        let nodes = vec![TaskNode::new("appeal", 1).with_constraint(
            ManualConstraint::StartNoEarlierThan {
                date: d(200_000, 1, 1),
            },
        )];
        assert_eq!(
            plan(&nodes, &[], d(2024, 1, 1), &WorkingCalendar::default()),
            Err(ScheduleError::Calendar(CalendarError::Exhausted {
                from: d(2024, 1, 1),
                horizon_days: crate::config::DEFAULT_LOOKAHEAD_DAYS,
            }))
        );
    }

    #[test]
    fn test_no_working_days_fails_fast() {
        let calendar = WorkingCalendar::new(vec![]);
        let nodes = vec![TaskNode::new("a", 1)];
        assert!(matches!(
            plan(&nodes, &[], d(2024, 1, 1), &calendar),
            Err(ScheduleError::Calendar(CalendarError::Exhausted { .. }))
        ));
    }

    #[test]
    fn test_only_sundays_still_schedules() {
        let calendar = WorkingCalendar::new(vec![Weekday::Sun]);
        let nodes = vec![TaskNode::new("a", 2)];
        let schedule = plan(&nodes, &[], d(2024, 1, 1), &calendar).unwrap();
        let a = schedule.get("a").unwrap();
        assert_eq!((a.start, a.end), (d(2024, 1, 7), d(2024, 1, 15)));
    }

    #[test]
    fn test_reschedule_is_idempotent() {
        let nodes = vec![
            TaskNode::new("a", 3),
            TaskNode::new("b", 2),
            TaskNode::new("c", 4),
        ];
        let links = vec![
            DependencyLink::new("a", "b", LinkType::StartToStart, 1),
            DependencyLink::new("b", "c", LinkType::FinishToFinish, 2),
        ];
        let calendar = WorkingCalendar::default().with_holidays([d(2024, 1, 15)]);
        let graph = DependencyGraph::build(&nodes, &links).unwrap();
        let timing = compute_timing(&graph, &EngineConfig::default()).unwrap();

        let first = auto_schedule(&graph, &timing, d(2024, 1, 11), &calendar).unwrap();
        let second = auto_schedule(&graph, &timing, d(2024, 1, 11), &calendar).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_timing_mismatch() {
        let graph = DependencyGraph::build(&[TaskNode::new("a", 1)], &[]).unwrap();
        let result = auto_schedule(
            &graph,
            &TimingResult::default(),
            d(2024, 1, 1),
            &WorkingCalendar::default(),
        );
        assert_eq!(
            result,
            Err(ScheduleError::TimingMismatch {
                expected: 1,
                got: 0
            })
        );
    }
}
