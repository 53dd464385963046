// src/exec/outcome.rs

use std::collections::BTreeMap;

use crate::config::ExecuteOptions;
use crate::dag::Node;
use crate::errors::{DagError, Result};
use crate::exec::policy::{self, FailureCategory};
use crate::exec::ExecutionState;
use crate::types::{NodeId, Value};

/// Value returned by a successful `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutput {
    /// The graph has exactly one sink; this is its result.
    Single(Value),
    /// The graph has several sinks; their results keyed by id.
    Sinks(BTreeMap<NodeId, Value>),
    /// Advanced options were used; every recorded result keyed by id.
    Results(BTreeMap<NodeId, Value>),
}

impl ExecutionOutput {
    /// Collapse into a single JSON value (maps become objects).
    pub fn into_value(self) -> Value {
        match self {
            ExecutionOutput::Single(value) => value,
            ExecutionOutput::Sinks(map) | ExecutionOutput::Results(map) => {
                Value::Object(map.into_iter().collect())
            }
        }
    }

    pub fn as_single(&self) -> Option<&Value> {
        match self {
            ExecutionOutput::Single(value) => Some(value),
            _ => None,
        }
    }

    /// The id-keyed map for `Sinks` and `Results`.
    pub fn as_map(&self) -> Option<&BTreeMap<NodeId, Value>> {
        match self {
            ExecutionOutput::Single(_) => None,
            ExecutionOutput::Sinks(map) | ExecutionOutput::Results(map) => Some(map),
        }
    }

    pub fn get(&self, node: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(node))
    }
}

/// Pick the return shape for a run that finished without escalating.
pub(crate) fn collect_output(
    nodes: &[Node],
    state: ExecutionState,
    options: &ExecuteOptions,
) -> Result<ExecutionOutput> {
    if options.uses_advanced_options() {
        return Ok(ExecutionOutput::Results(state.results));
    }

    let mut results = state.results;
    let mut sinks: BTreeMap<NodeId, Value> = nodes
        .iter()
        .filter(|n| n.is_sink())
        .filter_map(|n| results.remove(&n.id).map(|v| (n.id.clone(), v)))
        .collect();

    match sinks.len() {
        0 => Err(policy::surface(FailureCategory::Bookkeeping, DagError::NoSinkNode)),
        1 => {
            let value = sinks.pop_first().map(|(_, v)| v).unwrap_or(Value::Null);
            Ok(ExecutionOutput::Single(value))
        }
        _ => Ok(ExecutionOutput::Sinks(sinks)),
    }
}
