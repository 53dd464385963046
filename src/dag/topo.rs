// src/dag/topo.rs

//! Depth-first topological ordering with cycle reporting.
//!
//! The traversal walks *input* edges, so a node is emitted only after every
//! node it depends on. Roots are taken in registration order; the result is
//! one valid order among many.

use tracing::debug;

use crate::dag::graph::Graph;
use crate::dag::node::NodeIndex;
use crate::errors::{DagError, Result};
use crate::types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    /// On the current DFS stack.
    Visiting,
    /// Emitted.
    Visited,
}

impl Graph {
    /// Order all nodes so that each appears after all of its inputs.
    ///
    /// Fails with [`DagError::CycleDetected`] carrying the cycle in forward
    /// edge order, closed on its first node (e.g. `["A", "B", "C", "A"]`).
    pub fn topo_sort(&self) -> Result<Vec<NodeIndex>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        // `path` mirrors `frames` as ids-from-root; frames carry the position
        // in each node's input list so the walk can be resumed without
        // recursion.
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut frames: Vec<(NodeIndex, usize)> = Vec::new();

        for root in (0..self.nodes.len()).map(NodeIndex) {
            if marks[root.0] != Mark::Unvisited {
                continue;
            }

            marks[root.0] = Mark::Visiting;
            path.push(root);
            frames.push((root, 0));

            while let Some(frame) = frames.last_mut() {
                let (current, next) = *frame;
                let inputs = &self.nodes[current.0].inputs;

                if next < inputs.len() {
                    frame.1 += 1;
                    let upstream = inputs[next];

                    match marks[upstream.0] {
                        Mark::Visited => {}
                        Mark::Visiting => {
                            let cycle = self.reconstruct_cycle(&path, upstream);
                            debug!(?cycle, "cycle detected during topological sort");
                            return Err(DagError::CycleDetected { cycle });
                        }
                        Mark::Unvisited => {
                            marks[upstream.0] = Mark::Visiting;
                            path.push(upstream);
                            frames.push((upstream, 0));
                        }
                    }
                } else {
                    frames.pop();
                    path.pop();
                    marks[current.0] = Mark::Visited;
                    order.push(current);
                }
            }
        }

        Ok(order)
    }

    /// Same as [`topo_sort`](Graph::topo_sort) but yields ids.
    pub fn topo_sort_ids(&self) -> Result<Vec<NodeId>> {
        Ok(self
            .topo_sort()?
            .into_iter()
            .map(|idx| self.id_at(idx).to_string())
            .collect())
    }

    /// `path` runs against edge direction (each entry is an input of the one
    /// before it), so the closed suffix is reversed to read forwards.
    fn reconstruct_cycle(&self, path: &[NodeIndex], repeated: NodeIndex) -> Vec<NodeId> {
        let start = path.iter().position(|&n| n == repeated).unwrap_or(0);

        let mut cycle: Vec<NodeId> = path[start..]
            .iter()
            .map(|&idx| self.id_at(idx).to_string())
            .collect();
        cycle.push(self.id_at(repeated).to_string());
        cycle.reverse();
        cycle
    }
}
