use dagrun::{Graph, WorkFn};

use crate::work::echo;

/// Builder for `Graph` to simplify test setup.
///
/// Nodes without an explicit work function echo their input.
pub struct GraphBuilder {
    nodes: Vec<(String, WorkFn)>,
    edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a node, or replace the work of an already-added node.
    pub fn with_node(mut self, id: &str, work: WorkFn) -> Self {
        match self.nodes.iter_mut().find(|(existing, _)| existing == id) {
            Some(slot) => slot.1 = work,
            None => self.nodes.push((id.to_string(), work)),
        }
        self
    }

    /// Add a node that returns its input unchanged.
    pub fn with_echo(self, id: &str) -> Self {
        self.with_node(id, echo())
    }

    pub fn with_edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    /// Add a chain of edges, e.g. `["A", "B", "C"]` gives A->B and B->C.
    pub fn with_chain(mut self, ids: &[&str]) -> Self {
        for pair in ids.windows(2) {
            self.edges.push((pair[0].to_string(), pair[1].to_string()));
        }
        self
    }

    pub fn build(self) -> Graph {
        let mut graph = Graph::new();
        for (id, work) in self.nodes {
            graph
                .add_node(id, work)
                .expect("Failed to add node from builder");
        }
        for (from, to) in self.edges {
            graph
                .connect(&from, &to)
                .expect("Failed to connect nodes from builder");
        }
        graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A -> B, A -> C, B -> D, C -> D, with echo work everywhere.
pub fn diamond() -> GraphBuilder {
    GraphBuilder::new()
        .with_echo("A")
        .with_echo("B")
        .with_echo("C")
        .with_echo("D")
        .with_edge("A", "B")
        .with_edge("A", "C")
        .with_edge("B", "D")
        .with_edge("C", "D")
}
