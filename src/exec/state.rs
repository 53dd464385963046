// src/exec/state.rs

//! Per-run execution state.

use std::collections::BTreeMap;

use tracing::warn;

use crate::checkpoint::Checkpoint;
use crate::errors::NodeExecutionError;
use crate::types::{NodeId, Value};

/// Results, failures and attempt counts of one `execute` call.
///
/// Only the executor's coordinating task mutates this; node tasks report
/// their outcome back instead of writing here directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
    pub results: BTreeMap<NodeId, Value>,
    pub errors: BTreeMap<NodeId, NodeExecutionError>,
    /// Attempts made per node in this run.
    pub retry_count: BTreeMap<NodeId, u32>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a checkpoint's results.
    ///
    /// Recorded failures are dropped so failed nodes run again. Entries for
    /// ids the graph does not know are discarded.
    pub(crate) fn seeded_from(checkpoint: &Checkpoint, known: impl Fn(&str) -> bool) -> Self {
        let mut state = Self::new();
        for (id, value) in &checkpoint.results {
            if known(id) {
                state.results.insert(id.clone(), value.clone());
            } else {
                warn!(
                    checkpoint = %checkpoint.id,
                    node = %id,
                    "checkpoint holds a result for an unknown node; ignoring"
                );
            }
        }
        state
    }

    /// A node is complete once it has either a result or a terminal error.
    pub fn is_complete(&self, node: &str) -> bool {
        self.results.contains_key(node) || self.errors.contains_key(node)
    }

    pub fn has_failed(&self, node: &str) -> bool {
        self.errors.contains_key(node)
    }

    /// Ids of failed nodes, sorted.
    pub fn failed_nodes(&self) -> Vec<&str> {
        self.errors.keys().map(|k| k.as_str()).collect()
    }

    /// Rendered failure message per node.
    pub fn error_messages(&self) -> BTreeMap<NodeId, String> {
        self.errors
            .iter()
            .map(|(id, err)| (id.clone(), err.message()))
            .collect()
    }
}
