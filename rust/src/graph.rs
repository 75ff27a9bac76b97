//! Dependency graph: arena of task nodes with index-based typed edges.
//!
//! Built once per scheduling request. Construction validates every link,
//! rejects cycles with the offending path and precomputes a topological
//! order, so downstream passes can assume a well-formed DAG.

use std::collections::VecDeque;

use thiserror::Error;

use crate::interner::{NodeId, NodeInterner};
use crate::models::{DependencyLink, LinkType, TaskNode};

/// Largest accepted task duration or link lag magnitude, in working days.
///
/// Keeps every offset sum in the CPM passes far from `i64` overflow even for
/// the largest graph a `NodeId` can index.
pub const MAX_SPAN_UNITS: i64 = 1_000_000;

/// Structural and cycle errors found while building the graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate task id: {0}")]
    DuplicateTaskId(String),
    #[error("Task {task_id} has negative duration {duration}")]
    NegativeDuration { task_id: String, duration: i64 },
    #[error("Task {task_id} has duration {duration}, limit is {}", MAX_SPAN_UNITS)]
    DurationOutOfRange { task_id: String, duration: i64 },
    #[error("Link {source_id} -> {target_id} has lag {lag}, limit is +/-{}", MAX_SPAN_UNITS)]
    LagOutOfRange {
        source_id: String,
        target_id: String,
        lag: i64,
    },
    #[error("Task {task_id} has progress {progress}, expected 0-100")]
    InvalidProgress { task_id: String, progress: u8 },
    #[error("Task {0} cannot depend on itself")]
    SelfDependency(String),
    #[error("Link {source_id} -> {target_id} references unknown task {missing}")]
    UnknownNodeReference {
        source_id: String,
        target_id: String,
        missing: String,
    },
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },
}

/// A validated link between two nodes of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub link_type: LinkType,
    pub lag: i64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Immutable DAG of tasks, indexed by [`NodeId`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    index: NodeInterner,
    nodes: Vec<TaskNode>,
    edges: Vec<Edge>,
    /// Edge indices entering each node.
    incoming: Vec<Vec<usize>>,
    /// Edge indices leaving each node.
    outgoing: Vec<Vec<usize>>,
    topo_order: Vec<NodeId>,
}

impl DependencyGraph {
    /// Validate `nodes` and `links` and build the graph.
    ///
    /// # Errors
    /// * `DuplicateTaskId`, `NegativeDuration`, `DurationOutOfRange`,
    ///   `InvalidProgress` for bad nodes
    /// * `SelfDependency`, `UnknownNodeReference`, `LagOutOfRange` for bad links
    /// * `CycleDetected` with the cycle path (first id repeated at the end)
    pub fn build(nodes: &[TaskNode], links: &[DependencyLink]) -> Result<Self, GraphError> {
        let mut index = NodeInterner::with_capacity(nodes.len());
        for node in nodes {
            if index.insert_unique(&node.id).is_none() {
                return Err(GraphError::DuplicateTaskId(node.id.clone()));
            }
            if node.duration < 0 {
                return Err(GraphError::NegativeDuration {
                    task_id: node.id.clone(),
                    duration: node.duration,
                });
            }
            if node.effective_duration() > MAX_SPAN_UNITS {
                return Err(GraphError::DurationOutOfRange {
                    task_id: node.id.clone(),
                    duration: node.duration,
                });
            }
            if node.progress > 100 {
                return Err(GraphError::InvalidProgress {
                    task_id: node.id.clone(),
                    progress: node.progress,
                });
            }
        }

        let n = nodes.len();
        let mut edges = Vec::with_capacity(links.len());
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];

        for link in links {
            if link.source_id == link.target_id {
                return Err(GraphError::SelfDependency(link.source_id.clone()));
            }
            if link.lag.unsigned_abs() > MAX_SPAN_UNITS.unsigned_abs() {
                return Err(GraphError::LagOutOfRange {
                    source_id: link.source_id.clone(),
                    target_id: link.target_id.clone(),
                    lag: link.lag,
                });
            }
            let resolve = |id: &str| {
                index.get(id).ok_or_else(|| GraphError::UnknownNodeReference {
                    source_id: link.source_id.clone(),
                    target_id: link.target_id.clone(),
                    missing: id.to_string(),
                })
            };
            let source = resolve(&link.source_id)?;
            let target = resolve(&link.target_id)?;

            let edge_idx = edges.len();
            edges.push(Edge {
                source,
                target,
                link_type: link.link_type,
                lag: link.lag,
            });
            outgoing[source as usize].push(edge_idx);
            incoming[target as usize].push(edge_idx);
        }

        let mut graph = Self {
            index,
            nodes: nodes.to_vec(),
            edges,
            incoming,
            outgoing,
            topo_order: Vec::new(),
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(GraphError::CycleDetected {
                path: graph.names(&cycle),
            });
        }

        let order = graph.kahn_order();
        if order.len() != n {
            // Unreachable after a clean DFS, but Kahn is the authority on
            // whether an order exists.
            let mut placed = vec![false; n];
            for &id in &order {
                placed[id as usize] = true;
            }
            let stuck: Vec<NodeId> = (0..n as NodeId).filter(|&id| !placed[id as usize]).collect();
            return Err(GraphError::CycleDetected {
                path: graph.names(&stuck),
            });
        }
        graph.topo_order = order;

        Ok(graph)
    }

    /// Three-colour depth-first search. Returns the first cycle found as a
    /// node path whose first and last elements are the same node.
    fn find_cycle(&self) -> Option<Vec<NodeId>> {
        let n = self.nodes.len();
        let mut color = vec![Color::White; n];

        for root in 0..n {
            if color[root] != Color::White {
                continue;
            }
            color[root] = Color::Gray;
            // (node, position in its outgoing edge list)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if let Some(&edge_idx) = self.outgoing[node].get(frame.1) {
                    frame.1 += 1;
                    let next = self.edges[edge_idx].target as usize;
                    match color[next] {
                        Color::White => {
                            color[next] = Color::Gray;
                            stack.push((next, 0));
                        }
                        Color::Gray => {
                            let start = stack.iter().position(|(id, _)| *id == next)?;
                            let mut path: Vec<NodeId> =
                                stack[start..].iter().map(|(id, _)| *id as NodeId).collect();
                            path.push(next as NodeId);
                            return Some(path);
                        }
                        Color::Black => {}
                    }
                } else {
                    color[node] = Color::Black;
                    stack.pop();
                }
            }
        }
        None
    }

    /// Kahn's algorithm. Ties are broken by input order so the result is
    /// deterministic for a given request.
    fn kahn_order(&self) -> Vec<NodeId> {
        let n = self.nodes.len();
        let mut in_degree: Vec<usize> = self.incoming.iter().map(|edges| edges.len()).collect();
        let mut queue: VecDeque<NodeId> = (0..n as NodeId)
            .filter(|&id| in_degree[id as usize] == 0)
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &edge_idx in &self.outgoing[id as usize] {
                let target = self.edges[edge_idx].target;
                let degree = &mut in_degree[target as usize];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(target);
                }
            }
        }
        order
    }

    fn names(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .filter_map(|&id| self.index.resolve(id))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_id(&self, task_id: &str) -> Option<NodeId> {
        self.index.get(task_id)
    }

    pub fn node(&self, id: NodeId) -> &TaskNode {
        &self.nodes[id as usize]
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn task_id(&self, id: NodeId) -> &str {
        &self.nodes[id as usize].id
    }

    /// Duration used by the passes (zero for milestones).
    pub fn duration(&self, id: NodeId) -> i64 {
        self.nodes[id as usize].effective_duration()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Links whose target is `id`.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.incoming[id as usize].iter().map(|&e| &self.edges[e])
    }

    /// Links whose source is `id`.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing[id as usize].iter().map(|&e| &self.edges[e])
    }

    /// Predecessors come before successors.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.topo_order
    }

    /// Topological order as task ids.
    pub fn topological_task_ids(&self) -> Vec<&str> {
        self.topo_order.iter().map(|&id| self.task_id(id)).collect()
    }
}
