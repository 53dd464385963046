// src/dag/mod.rs

//! DAG representation and structural analysis.
//!
//! - [`node`] defines the arena slot type and the node itself.
//! - [`graph`] owns the nodes, their edges and the checkpoint store.
//! - [`topo`] computes a topological order and reports cycles.
//! - [`validate`] runs the pre-execution checks.

pub mod graph;
pub mod node;
pub mod topo;
pub mod validate;

pub use graph::Graph;
pub use node::{Node, NodeIndex};
