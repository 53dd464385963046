// src/dag/node.rs

use std::fmt;

use crate::types::{NodeId, WorkFn};

/// Slot of a node inside its graph's arena.
///
/// Indices are only meaningful for the graph that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named unit of work plus its adjacency.
///
/// `inputs` and `outputs` hold arena indices and are kept symmetric by the
/// owning [`Graph`](crate::dag::Graph): if A lists B in `outputs`, B lists A
/// in `inputs`.
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) work: WorkFn,
    /// Upstream nodes, in connection order.
    pub(crate) inputs: Vec<NodeIndex>,
    /// Downstream nodes, in connection order.
    pub(crate) outputs: Vec<NodeIndex>,
}

impl Node {
    pub(crate) fn new(id: NodeId, work: WorkFn) -> Self {
        Self {
            id,
            work,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn work(&self) -> &WorkFn {
        &self.work
    }

    pub fn inputs(&self) -> &[NodeIndex] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeIndex] {
        &self.outputs
    }

    /// A node with no inputs receives the caller's seed.
    pub fn is_source(&self) -> bool {
        self.inputs.is_empty()
    }

    /// A node with no outputs contributes to the returned value.
    pub fn is_sink(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}
