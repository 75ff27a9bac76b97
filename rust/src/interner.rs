//! Task id interning for the graph arena.
//!
//! Maps opaque string task ids to dense integer node ids so that every pass
//! works on plain vectors indexed by node.

use rustc_hash::FxHashMap;

/// Dense node id (index into the graph arena).
pub type NodeId = u32;

/// Bidirectional mapping between task id strings and node ids.
#[derive(Debug, Clone, Default)]
pub struct NodeInterner {
    to_int: FxHashMap<String, NodeId>,
    from_int: Vec<String>,
}

impl NodeInterner {
    /// Create a new interner with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_int: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_int: Vec::with_capacity(capacity),
        }
    }

    /// Register a new id. Returns `None` if the id was already registered.
    pub fn insert_unique(&mut self, s: &str) -> Option<NodeId> {
        if self.to_int.contains_key(s) {
            return None;
        }
        let id = self.from_int.len() as NodeId;
        self.from_int.push(s.to_string());
        self.to_int.insert(s.to_string(), id);
        Some(id)
    }

    #[inline]
    pub fn get(&self, s: &str) -> Option<NodeId> {
        self.to_int.get(s).copied()
    }

    /// Get the task id for a node id.
    #[inline]
    pub fn resolve(&self, id: NodeId) -> Option<&str> {
        self.from_int.get(id as usize).map(|s| s.as_str())
    }
}
