// src/checkpoint.rs

//! In-memory checkpoints of partial execution state.
//!
//! A checkpoint is a deep copy of `{results, errors}` taken after a node
//! finishes. Checkpoints live for as long as the owning graph; they are
//! never written to disk by this crate, but they are serde-serializable so a
//! caller can persist one and hand it back through
//! [`ExecuteOptions::with_external_checkpoint`](crate::ExecuteOptions::with_external_checkpoint).

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exec::ExecutionState;
use crate::types::{NodeId, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub timestamp: SystemTime,
    pub results: BTreeMap<NodeId, Value>,
    /// Failure message per node, as rendered at snapshot time.
    pub errors: BTreeMap<NodeId, String>,
}

impl Checkpoint {
    pub fn from_state(id: impl Into<String>, state: &ExecutionState) -> Self {
        Self {
            id: id.into(),
            timestamp: SystemTime::now(),
            results: state.results.clone(),
            errors: state.error_messages(),
        }
    }

    /// Whether `node` already has a result recorded in this snapshot.
    pub fn is_complete(&self, node: &str) -> bool {
        self.results.contains_key(node)
    }
}

/// Named checkpoints, keyed by checkpoint id.
#[derive(Debug, Default)]
pub struct CheckpointStore {
    checkpoints: BTreeMap<String, Checkpoint>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `state` under `id`, overwriting any previous checkpoint with
    /// the same id.
    pub fn save(&mut self, id: impl Into<String>, state: &ExecutionState) -> &Checkpoint {
        let checkpoint = Checkpoint::from_state(id, state);
        debug!(
            checkpoint = %checkpoint.id,
            results = checkpoint.results.len(),
            errors = checkpoint.errors.len(),
            "saved checkpoint"
        );

        let key = checkpoint.id.clone();
        self.checkpoints.insert(key.clone(), checkpoint);
        &self.checkpoints[&key]
    }

    pub fn load(&self, id: &str) -> Option<&Checkpoint> {
        self.checkpoints.get(id)
    }

    pub fn clear(&mut self, id: &str) -> bool {
        self.checkpoints.remove(id).is_some()
    }

    /// Ids of all stored checkpoints, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.checkpoints.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
