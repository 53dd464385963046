// src/dag/graph.rs

use std::collections::HashMap;

use tracing::debug;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::dag::node::{Node, NodeIndex};
use crate::errors::{DagError, Result};
use crate::exec::ExecutionState;
use crate::types::{NodeId, WorkFn};

/// In-memory DAG of work nodes.
///
/// Nodes live in an arena (`Vec<Node>`) and refer to each other by
/// [`NodeIndex`]; `index` resolves ids to slots. The graph also owns the
/// checkpoints taken while executing it, so their lifetime is tied to the
/// graph instance.
///
/// Edges can only be changed through `&mut self`, and
/// [`execute`](Graph::execute) holds that borrow for the whole run, so the
/// topology is frozen while nodes are running.
#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    index: HashMap<NodeId, NodeIndex>,
    pub(crate) checkpoints: CheckpointStore,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new node.
    ///
    /// Fails with [`DagError::DuplicateNode`] if `id` is already taken.
    pub fn add_node(&mut self, id: impl Into<NodeId>, work: WorkFn) -> Result<NodeIndex> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(DagError::DuplicateNode(id));
        }

        let idx = NodeIndex(self.nodes.len());
        debug!(node = %id, slot = idx.0, "registered node");
        self.index.insert(id.clone(), idx);
        self.nodes.push(Node::new(id, work));
        Ok(idx)
    }

    /// Add the edge `from -> to`. Connecting the same pair twice is a no-op.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<()> {
        let from = self.require(from)?;
        let to = self.require(to)?;
        self.link(from, to)
    }

    /// Remove the edge `from -> to`, returning whether it existed.
    pub fn disconnect(&mut self, from: &str, to: &str) -> Result<bool> {
        let from = self.require(from)?;
        let to = self.require(to)?;
        self.unlink(from, to)
    }

    /// Make `target` a downstream of `node`.
    pub fn add_output(&mut self, node: NodeIndex, target: NodeIndex) -> Result<()> {
        self.link(node, target)
    }

    /// Make `source` an upstream of `node`.
    pub fn add_input(&mut self, node: NodeIndex, source: NodeIndex) -> Result<()> {
        self.link(source, node)
    }

    pub fn remove_output(&mut self, node: NodeIndex, target: NodeIndex) -> Result<bool> {
        self.unlink(node, target)
    }

    pub fn remove_input(&mut self, node: NodeIndex, source: NodeIndex) -> Result<bool> {
        self.unlink(source, node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Resolve an id to its arena slot.
    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|idx| &self.nodes[idx.0])
    }

    pub fn node_at(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx.0)
    }

    /// All nodes, in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All node ids, in registration order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// Immediate upstream ids of `id`.
    pub fn inputs_of(&self, id: &str) -> Vec<&str> {
        self.node(id)
            .map(|n| self.ids(&n.inputs))
            .unwrap_or_default()
    }

    /// Immediate downstream ids of `id`.
    pub fn outputs_of(&self, id: &str) -> Vec<&str> {
        self.node(id)
            .map(|n| self.ids(&n.outputs))
            .unwrap_or_default()
    }

    /// Nodes without inputs.
    pub fn sources(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.is_source())
            .map(|n| n.id.as_str())
            .collect()
    }

    /// Nodes without outputs.
    pub fn sinks(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.is_sink())
            .map(|n| n.id.as_str())
            .collect()
    }

    /// Snapshot `state` under `id`, replacing any earlier checkpoint of that name.
    pub fn save_checkpoint(&mut self, id: impl Into<String>, state: &ExecutionState) -> &Checkpoint {
        self.checkpoints.save(id, state)
    }

    /// Look up a checkpoint; `None` if nothing was saved under `id`.
    pub fn load_checkpoint(&self, id: &str) -> Option<&Checkpoint> {
        self.checkpoints.load(id)
    }

    /// Remove a checkpoint, returning whether one existed.
    pub fn clear_checkpoint(&mut self, id: &str) -> bool {
        self.checkpoints.clear(id)
    }

    pub fn list_checkpoints(&self) -> Vec<&str> {
        self.checkpoints.list()
    }

    pub(crate) fn id_at(&self, idx: NodeIndex) -> &str {
        &self.nodes[idx.0].id
    }

    fn ids(&self, indices: &[NodeIndex]) -> Vec<&str> {
        indices.iter().map(|&i| self.id_at(i)).collect()
    }

    fn require(&self, id: &str) -> Result<NodeIndex> {
        self.index_of(id)
            .ok_or_else(|| DagError::UnknownNode(id.to_string()))
    }

    fn check_slot(&self, idx: NodeIndex) -> Result<()> {
        if idx.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DagError::UnknownNode(format!("#{}", idx.0)))
        }
    }

    /// Both adjacency lists are updated together so they stay symmetric.
    fn link(&mut self, from: NodeIndex, to: NodeIndex) -> Result<()> {
        self.check_slot(from)?;
        self.check_slot(to)?;

        if !self.nodes[from.0].outputs.contains(&to) {
            self.nodes[from.0].outputs.push(to);
        }
        if !self.nodes[to.0].inputs.contains(&from) {
            self.nodes[to.0].inputs.push(from);
        }

        debug!(from = %self.id_at(from), to = %self.id_at(to), "connected nodes");
        Ok(())
    }

    fn unlink(&mut self, from: NodeIndex, to: NodeIndex) -> Result<bool> {
        self.check_slot(from)?;
        self.check_slot(to)?;

        let outputs = &mut self.nodes[from.0].outputs;
        let had_output = outputs.contains(&to);
        outputs.retain(|&i| i != to);

        let inputs = &mut self.nodes[to.0].inputs;
        let had_input = inputs.contains(&from);
        inputs.retain(|&i| i != from);

        Ok(had_output || had_input)
    }
}
