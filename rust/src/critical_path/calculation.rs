//! Critical path calculation using forward and backward passes.

use thiserror::Error;

use crate::config::EngineConfig;
use crate::graph::{DependencyGraph, Edge};
use crate::interner::NodeId;
use crate::models::LinkType;
use crate::{log_changes, log_checks, log_debug};

use super::paths::enumerate_critical_paths;
use super::types::{Infeasibility, OffsetConstraint, TaskTiming, TimingResult};

/// Error types for critical path calculation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    #[error(
        "Schedule infeasible: {} task(s) with negative float: {}",
        .violations.len(),
        .violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
    )]
    ScheduleInfeasible { violations: Vec<Infeasibility> },
    #[error("Expected {expected} constraint slots, got {got}")]
    ConstraintCountMismatch { expected: usize, got: usize },
}

/// Earliest start the link imposes on its target.
pub(super) fn forward_constraint(
    edge: &Edge,
    pred_start: i64,
    pred_finish: i64,
    target_duration: i64,
) -> i64 {
    match edge.link_type {
        LinkType::FinishToStart => pred_finish + edge.lag,
        LinkType::StartToStart => pred_start + edge.lag,
        LinkType::FinishToFinish => pred_finish + edge.lag - target_duration,
        LinkType::StartToFinish => pred_start + edge.lag - target_duration,
    }
}

/// Latest finish the link imposes on its source.
pub(super) fn backward_constraint(
    edge: &Edge,
    succ_start: i64,
    succ_finish: i64,
    source_duration: i64,
) -> i64 {
    match edge.link_type {
        LinkType::FinishToStart => succ_start - edge.lag,
        LinkType::StartToStart => succ_start - edge.lag + source_duration,
        LinkType::FinishToFinish => succ_finish - edge.lag,
        LinkType::StartToFinish => succ_finish - edge.lag + source_duration,
    }
}

/// Run the CPM passes with no manual constraints.
pub fn compute_timing(
    graph: &DependencyGraph,
    config: &EngineConfig,
) -> Result<TimingResult, TimingError> {
    compute_timing_with_constraints(graph, &vec![None; graph.len()], config)
}

/// Run the CPM forward and backward passes.
///
/// `constraints` is indexed by node id (input order) and holds manual
/// constraints already converted to offsets.
///
/// # Returns
/// * `Ok(TimingResult)` with per-task timing and all critical paths
/// * `Err(TimingError::ScheduleInfeasible)` if a constraint makes some float
///   negative and `config.best_effort` is off
pub fn compute_timing_with_constraints(
    graph: &DependencyGraph,
    constraints: &[Option<OffsetConstraint>],
    config: &EngineConfig,
) -> Result<TimingResult, TimingError> {
    let n = graph.len();
    if constraints.len() != n {
        return Err(TimingError::ConstraintCountMismatch {
            expected: n,
            got: constraints.len(),
        });
    }
    let verbosity = config.verbosity;

    // Forward pass: earliest start/finish in topological order
    let mut earliest_start = vec![0i64; n];
    let mut earliest_finish = vec![0i64; n];

    for &id in graph.topological_order() {
        let idx = id as usize;
        let duration = graph.duration(id);

        let mut start = 0i64;
        for edge in graph.incoming(id) {
            let pred = edge.source as usize;
            let required =
                forward_constraint(edge, earliest_start[pred], earliest_finish[pred], duration);
            start = start.max(required);
        }

        match constraints[idx] {
            Some(OffsetConstraint::StartNoEarlierThan(offset))
            | Some(OffsetConstraint::MustStartOn(offset)) => {
                if offset > start {
                    log_checks!(
                        verbosity,
                        "  {} pushed from {} to {} by manual constraint",
                        graph.task_id(id),
                        start,
                        offset
                    );
                }
                start = start.max(offset);
            }
            Some(OffsetConstraint::MustFinishOn(offset)) => {
                start = start.max(offset - duration);
            }
            None => {}
        }

        earliest_start[idx] = start;
        earliest_finish[idx] = start + duration;
        log_debug!(
            verbosity,
            "  forward {}: ES={} EF={}",
            graph.task_id(id),
            start,
            start + duration
        );
    }

    // Every task is bounded by the project end, not only sinks: with
    // start-to-start links a predecessor can finish after all of its successors.
    let project_duration = earliest_finish.iter().copied().max().unwrap_or(0);

    // Backward pass: latest start/finish in reverse topological order
    let mut latest_start = vec![0i64; n];
    let mut latest_finish = vec![0i64; n];

    for &id in graph.topological_order().iter().rev() {
        let idx = id as usize;
        let duration = graph.duration(id);

        let mut finish = project_duration;
        for edge in graph.outgoing(id) {
            let succ = edge.target as usize;
            let required =
                backward_constraint(edge, latest_start[succ], latest_finish[succ], duration);
            finish = finish.min(required);
        }

        match constraints[idx] {
            Some(OffsetConstraint::MustStartOn(offset)) => finish = finish.min(offset + duration),
            Some(OffsetConstraint::MustFinishOn(offset)) => finish = finish.min(offset),
            Some(OffsetConstraint::StartNoEarlierThan(_)) | None => {}
        }

        latest_finish[idx] = finish;
        latest_start[idx] = finish - duration;
        log_debug!(
            verbosity,
            "  backward {}: LS={} LF={}",
            graph.task_id(id),
            finish - duration,
            finish
        );
    }

    let mut per_task = Vec::with_capacity(n);
    let mut critical = vec![false; n];
    let mut violations = Vec::new();
    let mut total_work = 0i64;

    for idx in 0..n {
        let id = idx as NodeId;
        let float = latest_start[idx] - earliest_start[idx];
        total_work += graph.duration(id);

        if float < 0 {
            log_checks!(
                verbosity,
                "  {} infeasible: float {}",
                graph.task_id(id),
                float
            );
            violations.push(Infeasibility {
                task_id: graph.task_id(id).to_string(),
                float,
                constraint: graph.node(id).manual_constraint,
            });
        }
        critical[idx] = float == 0;

        per_task.push(TaskTiming {
            task_id: graph.task_id(id).to_string(),
            earliest_start: earliest_start[idx],
            earliest_finish: earliest_finish[idx],
            latest_start: latest_start[idx],
            latest_finish: latest_finish[idx],
            float,
            is_critical: critical[idx],
        });
    }

    if !violations.is_empty() && !config.best_effort {
        return Err(TimingError::ScheduleInfeasible { violations });
    }

    let (paths, truncated) = enumerate_critical_paths(
        graph,
        &earliest_start,
        &earliest_finish,
        &critical,
        config.max_critical_paths,
    );
    let critical_paths: Vec<Vec<String>> = paths
        .into_iter()
        .map(|path| {
            path.into_iter()
                .map(|id| graph.task_id(id).to_string())
                .collect()
        })
        .collect();

    log_changes!(
        verbosity,
        "CPM: {} tasks, project duration {}, {} critical path(s){}",
        n,
        project_duration,
        critical_paths.len(),
        if truncated { " (truncated)" } else { "" }
    );

    Ok(TimingResult {
        per_task,
        critical_paths,
        critical_paths_truncated: truncated,
        project_duration,
        total_work,
        infeasible: violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyLink, ManualConstraint, TaskNode};
    use chrono::NaiveDate;

    fn make_graph(tasks: &[(&str, i64)], links: &[(&str, &str, LinkType, i64)]) -> DependencyGraph {
        let nodes: Vec<TaskNode> = tasks.iter().map(|(id, d)| TaskNode::new(*id, *d)).collect();
        let links: Vec<DependencyLink> = links
            .iter()
            .map(|(s, t, ty, lag)| DependencyLink::new(*s, *t, *ty, *lag))
            .collect();
        DependencyGraph::build(&nodes, &links).unwrap()
    }

    fn fs(source: &'static str, target: &'static str) -> (&'static str, &'static str, LinkType, i64) {
        (source, target, LinkType::FinishToStart, 0)
    }

    fn timing(graph: &DependencyGraph) -> TimingResult {
        compute_timing(graph, &EngineConfig::default()).unwrap()
    }

    fn path(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_chain() {
        let graph = make_graph(
            &[("A", 1), ("B", 2), ("C", 3)],
            &[fs("A", "B"), fs("B", "C")],
        );
        let result = timing(&graph);

        assert_eq!(result.project_duration, 6);
        let floats: Vec<i64> = result.per_task.iter().map(|t| t.float).collect();
        assert_eq!(floats, vec![0, 0, 0]);
        assert_eq!(result.critical_paths, vec![path(&["A", "B", "C"])]);
        assert_eq!(result.total_work, 6);
    }

    #[test]
    fn test_finish_to_start_lag() {
        let graph = make_graph(
            &[("A", 3), ("B", 2)],
            &[("A", "B", LinkType::FinishToStart, 2)],
        );
        let result = timing(&graph);
        let b = result.get("B").unwrap();
        assert_eq!(b.earliest_start, 5);
        assert_eq!(b.earliest_finish, 7);
        assert_eq!(result.project_duration, 7);
    }

    #[test]
    fn test_start_to_start() {
        let graph = make_graph(
            &[("A", 5), ("B", 3)],
            &[("A", "B", LinkType::StartToStart, 0)],
        );
        let result = timing(&graph);
        let a = result.get("A").unwrap();
        let b = result.get("B").unwrap();

        assert_eq!(b.earliest_start, 0);
        assert_eq!(result.project_duration, 5);
        // A drives the project end even though it has a successor
        assert!(a.is_critical);
        assert_eq!(b.float, 2);
        assert_eq!((b.latest_start, b.latest_finish), (2, 5));
        // Project end binds A before B's start does (2 - 0 + 5 = 7)
        assert_eq!((a.latest_start, a.latest_finish), (0, 5));
        assert_eq!(result.critical_paths, vec![path(&["A"])]);
    }

    #[test]
    fn test_start_to_start_backward_adds_source_duration() {
        let graph = make_graph(
            &[("A", 2), ("B", 6)],
            &[("A", "B", LinkType::StartToStart, 1)],
        );
        let result = timing(&graph);
        let a = result.get("A").unwrap();
        let b = result.get("B").unwrap();

        assert_eq!((b.earliest_start, b.earliest_finish), (1, 7));
        assert_eq!(result.project_duration, 7);
        // A.LF = B.LS - lag + A.duration = 1 - 1 + 2
        assert_eq!((a.latest_start, a.latest_finish), (0, 2));
        assert_eq!(a.float, 0);
        assert_eq!(result.critical_paths, vec![path(&["A", "B"])]);
    }

    #[test]
    fn test_finish_to_finish() {
        let graph = make_graph(
            &[("A", 4), ("B", 2)],
            &[("A", "B", LinkType::FinishToFinish, 1)],
        );
        let result = timing(&graph);
        let b = result.get("B").unwrap();
        // B must finish at least 1 after A finishes: EF = 5, ES = 3
        assert_eq!(b.earliest_start, 3);
        assert_eq!(b.earliest_finish, 5);
        assert_eq!((b.latest_start, b.latest_finish), (3, 5));
        // A.LF = B.LF - lag = 4, tighter than the project end of 5
        let a = result.get("A").unwrap();
        assert_eq!((a.latest_start, a.latest_finish), (0, 4));
        assert_eq!(a.float, 0);
        assert_eq!(result.critical_paths, vec![path(&["A", "B"])]);
    }

    #[test]
    fn test_start_to_finish() {
        let graph = make_graph(
            &[("A", 4), ("B", 2)],
            &[("A", "B", LinkType::StartToFinish, 6)],
        );
        let result = timing(&graph);
        let b = result.get("B").unwrap();
        // B finishes no earlier than A.start + 6
        assert_eq!(b.earliest_start, 4);
        assert_eq!(b.earliest_finish, 6);
        assert_eq!(result.project_duration, 6);
        assert_eq!((b.latest_start, b.latest_finish), (4, 6));
        // A.LF = B.LF - lag + A.duration = 6 - 6 + 4
        let a = result.get("A").unwrap();
        assert_eq!((a.latest_start, a.latest_finish), (0, 4));
        assert_eq!(a.float, 0);
        assert_eq!(result.critical_paths, vec![path(&["A", "B"])]);
    }

    #[test]
    fn test_negative_lag_clamped_at_zero() {
        let graph = make_graph(
            &[("A", 2), ("B", 3)],
            &[("A", "B", LinkType::FinishToStart, -5)],
        );
        let result = timing(&graph);
        assert_eq!(result.get("B").unwrap().earliest_start, 0);
        assert!(result.per_task.iter().all(|t| t.float >= 0));
    }

    #[test]
    fn test_lead_overlaps_predecessor() {
        let graph = make_graph(
            &[("A", 5), ("B", 3)],
            &[("A", "B", LinkType::FinishToStart, -2)],
        );
        let result = timing(&graph);
        assert_eq!(result.get("B").unwrap().earliest_start, 3);
        assert_eq!(result.project_duration, 6);
    }

    #[test]
    fn test_diamond_with_slack() {
        let graph = make_graph(
            &[("a", 2), ("b", 3), ("c", 5), ("d", 4)],
            &[fs("a", "b"), fs("a", "c"), fs("b", "d"), fs("c", "d")],
        );
        let result = timing(&graph);
        assert_eq!(result.project_duration, 11);
        assert_eq!(result.get("b").unwrap().float, 2);
        assert_eq!(result.critical_paths, vec![path(&["a", "c", "d"])]);
        assert_eq!(result.critical_task_ids(), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_tied_paths_all_reported() {
        let graph = make_graph(
            &[("a", 2), ("b", 4), ("c", 4), ("d", 1)],
            &[fs("a", "b"), fs("a", "c"), fs("b", "d"), fs("c", "d")],
        );
        let result = timing(&graph);
        assert_eq!(
            result.critical_paths,
            vec![path(&["a", "b", "d"]), path(&["a", "c", "d"])]
        );
        assert!(!result.critical_paths_truncated);
    }

    #[test]
    fn test_disconnected_tasks_are_separate_paths() {
        let graph = make_graph(&[("x", 3), ("y", 3), ("z", 1)], &[]);
        let result = timing(&graph);
        assert_eq!(result.critical_paths, vec![path(&["x"]), path(&["y"])]);
        assert_eq!(result.get("z").unwrap().float, 2);
    }

    #[test]
    fn test_critical_path_limit_truncates() {
        let graph = make_graph(
            &[("a", 2), ("b", 4), ("c", 4), ("d", 1)],
            &[fs("a", "b"), fs("a", "c"), fs("b", "d"), fs("c", "d")],
        );
        let config = EngineConfig {
            max_critical_paths: 1,
            ..EngineConfig::default()
        };
        let result = compute_timing(&graph, &config).unwrap();
        assert_eq!(result.critical_paths.len(), 1);
        assert!(result.critical_paths_truncated);
    }

    #[test]
    fn test_milestone_is_zero_duration() {
        let nodes = vec![TaskNode::new("draft", 3), {
            let mut m = TaskNode::milestone("signed");
            m.duration = 10;
            m
        }];
        let links = vec![DependencyLink::finish_to_start("draft", "signed")];
        let graph = DependencyGraph::build(&nodes, &links).unwrap();
        let result = timing(&graph);
        let signed = result.get("signed").unwrap();
        assert_eq!(signed.earliest_start, 3);
        assert_eq!(signed.earliest_finish, 3);
        assert_eq!(result.project_duration, 3);
    }

    #[test]
    fn test_shortening_critical_task_shortens_project() {
        let tasks = [("a", 2), ("b", 3), ("c", 5), ("d", 4)];
        let links = [fs("a", "b"), fs("a", "c"), fs("b", "d"), fs("c", "d")];
        let base = timing(&make_graph(&tasks, &links));

        for (i, (id, duration)) in tasks.iter().enumerate() {
            let mut shorter = tasks;
            shorter[i] = (*id, duration - 1);
            let result = timing(&make_graph(&shorter, &links));
            if base.get(id).unwrap().is_critical {
                assert_eq!(result.project_duration, base.project_duration - 1, "{}", id);
            } else {
                assert_eq!(result.project_duration, base.project_duration, "{}", id);
            }
        }
    }

    #[test]
    fn test_start_no_earlier_than_raises_start() {
        let graph = make_graph(&[("a", 2), ("b", 2)], &[fs("a", "b")]);
        let constraints = vec![None, Some(OffsetConstraint::StartNoEarlierThan(5))];
        let result =
            compute_timing_with_constraints(&graph, &constraints, &EngineConfig::default())
                .unwrap();
        let b = result.get("b").unwrap();
        assert_eq!(b.earliest_start, 5);
        assert_eq!(result.project_duration, 7);
        // a now has slack before b's constraint
        assert_eq!(result.get("a").unwrap().float, 3);
    }

    #[test]
    fn test_must_start_on_pins_task() {
        let graph = make_graph(&[("a", 2), ("b", 2), ("c", 8)], &[fs("a", "b")]);
        let constraints = vec![None, Some(OffsetConstraint::MustStartOn(3)), None];
        let result =
            compute_timing_with_constraints(&graph, &constraints, &EngineConfig::default())
                .unwrap();
        let b = result.get("b").unwrap();
        assert_eq!(b.earliest_start, 3);
        assert_eq!(b.latest_start, 3);
        assert!(b.is_critical);
    }

    #[test]
    fn test_infeasible_constraint_aborts_by_default() {
        let mut nodes = vec![TaskNode::new("prep", 4), TaskNode::new("hearing", 1)];
        nodes[1].manual_constraint = Some(ManualConstraint::MustStartOn {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        });
        let graph = DependencyGraph::build(
            &nodes,
            &[DependencyLink::finish_to_start("prep", "hearing")],
        )
        .unwrap();
        let constraints = vec![None, Some(OffsetConstraint::MustStartOn(1))];

        let err = compute_timing_with_constraints(&graph, &constraints, &EngineConfig::default())
            .unwrap_err();
        let TimingError::ScheduleInfeasible { violations } = err else {
            panic!("expected infeasibility");
        };
        let ids: Vec<&str> = violations.iter().map(|v| v.task_id.as_str()).collect();
        assert_eq!(ids, vec!["prep", "hearing"]);
        assert_eq!(violations[1].float, -3);
        assert!(violations[1].constraint.is_some());
        assert!(violations[0].constraint.is_none());
    }

    #[test]
    fn test_best_effort_returns_timing() {
        let graph = make_graph(&[("prep", 4), ("hearing", 1), ("other", 2)], &[fs("prep", "hearing")]);
        let constraints = vec![None, Some(OffsetConstraint::MustStartOn(1)), None];
        let config = EngineConfig {
            best_effort: true,
            ..EngineConfig::default()
        };
        let result = compute_timing_with_constraints(&graph, &constraints, &config).unwrap();
        assert!(!result.is_feasible());
        assert_eq!(result.infeasible.len(), 2);
        let other = result.get("other").unwrap();
        assert!(other.float >= 0);
        assert!(!result.get("hearing").unwrap().is_critical);
    }

    #[test]
    fn test_must_finish_on() {
        let graph = make_graph(&[("a", 3)], &[]);
        let constraints = vec![Some(OffsetConstraint::MustFinishOn(10))];
        let result =
            compute_timing_with_constraints(&graph, &constraints, &EngineConfig::default())
                .unwrap();
        let a = result.get("a").unwrap();
        assert_eq!(a.earliest_start, 7);
        assert_eq!(a.earliest_finish, 10);
        assert_eq!(a.float, 0);
    }

    #[test]
    fn test_constraint_count_mismatch() {
        let graph = make_graph(&[("a", 3)], &[]);
        assert_eq!(
            compute_timing_with_constraints(&graph, &[], &EngineConfig::default()),
            Err(TimingError::ConstraintCountMismatch {
                expected: 1,
                got: 0
            })
        );
    }
}
