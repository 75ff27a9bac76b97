//! Critical path enumeration.
//!
//! A link is driving when the start it imposes on its target equals the
//! target's earliest start. Critical paths are the chains of critical tasks
//! joined by driving links, from a critical task with no driving critical
//! predecessor to one with no driving critical successor.

use crate::graph::DependencyGraph;
use crate::interner::NodeId;

use super::calculation::forward_constraint;

/// Enumerate every critical path, stopping after `limit` paths.
///
/// Returns the paths (roots visited in topological order, branches in node
/// order) and whether enumeration was cut short.
pub(super) fn enumerate_critical_paths(
    graph: &DependencyGraph,
    earliest_start: &[i64],
    earliest_finish: &[i64],
    critical: &[bool],
    limit: usize,
) -> (Vec<Vec<NodeId>>, bool) {
    let n = graph.len();
    let mut driving_succ: Vec<Vec<NodeId>> = vec![Vec::new(); n];
    let mut has_driving_pred = vec![false; n];

    for edge in graph.edges() {
        let (src, tgt) = (edge.source as usize, edge.target as usize);
        if !critical[src] || !critical[tgt] {
            continue;
        }
        let imposed = forward_constraint(
            edge,
            earliest_start[src],
            earliest_finish[src],
            graph.duration(edge.target),
        );
        if imposed == earliest_start[tgt] {
            driving_succ[src].push(edge.target);
            has_driving_pred[tgt] = true;
        }
    }
    // Parallel links between the same pair must not duplicate paths
    for succ in &mut driving_succ {
        succ.sort_unstable();
        succ.dedup();
    }

    let mut paths: Vec<Vec<NodeId>> = Vec::new();

    for &root in graph.topological_order() {
        let r = root as usize;
        if !critical[r] || has_driving_pred[r] {
            continue;
        }

        // Iterative DFS: `path` holds the current chain, `cursor` the next
        // branch to try at each depth.
        let mut path: Vec<NodeId> = vec![root];
        let mut cursor: Vec<usize> = vec![0];

        while let Some(pos) = cursor.last_mut() {
            let node = path[path.len() - 1] as usize;
            if driving_succ[node].is_empty() {
                if paths.len() >= limit {
                    return (paths, true);
                }
                paths.push(path.clone());
                cursor.pop();
                path.pop();
                continue;
            }
            if let Some(&next) = driving_succ[node].get(*pos) {
                *pos += 1;
                path.push(next);
                cursor.push(0);
            } else {
                cursor.pop();
                path.pop();
            }
        }
    }

    (paths, false)
}
