// src/dag/validate.rs

use tracing::debug;

use crate::dag::graph::Graph;
use crate::dag::node::NodeIndex;
use crate::errors::{DagError, Result};

impl Graph {
    /// Structural checks run once before any node executes.
    ///
    /// - the graph must contain at least one node,
    /// - it must be acyclic (the cycle error is propagated unchanged),
    /// - at least one node must have no inputs.
    ///
    /// Returns the topological order so callers don't sort twice.
    pub fn validate(&self) -> Result<Vec<NodeIndex>> {
        ensure_not_empty(self)?;
        let order = self.topo_sort()?;
        ensure_has_source(self)?;

        debug!(nodes = self.len(), "graph validated");
        Ok(order)
    }
}

fn ensure_not_empty(graph: &Graph) -> Result<()> {
    if graph.is_empty() {
        return Err(DagError::EmptyGraph);
    }
    Ok(())
}

fn ensure_has_source(graph: &Graph) -> Result<()> {
    if !graph.nodes().any(|n| n.is_source()) {
        return Err(DagError::NoSourceNode);
    }
    Ok(())
}
