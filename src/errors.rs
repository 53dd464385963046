// src/errors.rs

//! Crate-wide error type and helpers.
//!
//! Every fallible operation returns [`DagError`]. Executors may wrap a failure
//! in [`DagError::ExecutionFailed`]; the accessors on `DagError` look through
//! that wrapper so `node_id`, `timestamp`, `cycle` and `errors` are never lost.

use std::fmt;
use std::time::{Duration, SystemTime};

use thiserror::Error;

use crate::types::NodeId;

/// Terminal failure of a single node, after any retries were exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeExecutionError {
    pub node_id: NodeId,
    /// When the node was given up on.
    pub timestamp: SystemTime,
    /// Number of attempts made, including the first one.
    pub attempts: u32,
    /// Whether retries were enabled for this run. Controls the message shape.
    pub retried: bool,
    /// Set when the last attempt missed its per-node deadline.
    pub timed_out: Option<Duration>,
    /// Message of the original error returned by the work function.
    pub cause: String,
}

impl NodeExecutionError {
    /// Human-readable message.
    ///
    /// With retries enabled the cause is wrapped as
    /// `Node <id> execution failed after <n> attempts: <cause>`; otherwise the
    /// original cause is returned untouched.
    pub fn message(&self) -> String {
        if self.retried {
            format!(
                "Node {} execution failed after {} attempts: {}",
                self.node_id, self.attempts, self.cause
            )
        } else {
            self.cause.clone()
        }
    }
}

impl fmt::Display for NodeExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for NodeExecutionError {}

/// One entry of an aggregated failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedNode {
    pub node_id: NodeId,
    /// The original cause, without the retry wrapper.
    pub message: String,
}

#[derive(Error, Debug)]
pub enum DagError {
    #[error("Node with id '{0}' already exists")]
    DuplicateNode(NodeId),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Graph is empty")]
    EmptyGraph,

    #[error("No source nodes found: every node has at least one input")]
    NoSourceNode,

    #[error("Cycle detected: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<NodeId> },

    #[error(transparent)]
    NodeExecution(#[from] NodeExecutionError),

    #[error("Node {node_id} cannot run: upstream node {upstream} failed")]
    UpstreamFailed { node_id: NodeId, upstream: NodeId },

    #[error(
        "Node {} failed and blocks dependents [{}]: {source}",
        .source.node_id,
        .dependents.join(", ")
    )]
    DependentsBlocked {
        dependents: Vec<NodeId>,
        source: NodeExecutionError,
    },

    #[error("{} nodes failed: {}", .errors.len(), describe_failures(.errors))]
    Aggregated { errors: Vec<FailedNode> },

    #[error("{}", describe_timeout(.node_id.as_deref(), .timeout))]
    ExecutionTimeout {
        node_id: Option<NodeId>,
        timeout: Duration,
    },

    #[error("No sink nodes found: cannot determine the DAG output")]
    NoSinkNode,

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("DAG execution failed: {0}")]
    ExecutionFailed(#[source] Box<DagError>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DagError>;

impl DagError {
    /// The innermost error, skipping any `ExecutionFailed` wrappers.
    pub fn root(&self) -> &DagError {
        match self {
            DagError::ExecutionFailed(inner) => inner.root(),
            other => other,
        }
    }

    /// Whether this error went through the "DAG execution failed" wrapper.
    pub fn is_wrapped(&self) -> bool {
        matches!(self, DagError::ExecutionFailed(_))
    }

    /// Id of the node the failure is attributed to, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self.root() {
            DagError::NodeExecution(err) => Some(&err.node_id),
            DagError::DependentsBlocked { source, .. } => Some(&source.node_id),
            DagError::UpstreamFailed { node_id, .. } => Some(node_id),
            DagError::ExecutionTimeout { node_id, .. } => node_id.as_deref(),
            DagError::DuplicateNode(id) | DagError::UnknownNode(id) => Some(id),
            _ => None,
        }
    }

    /// Time at which the failing node was given up on.
    pub fn timestamp(&self) -> Option<SystemTime> {
        match self.root() {
            DagError::NodeExecution(err) => Some(err.timestamp),
            DagError::DependentsBlocked { source, .. } => Some(source.timestamp),
            _ => None,
        }
    }

    /// The forward-ordered cycle path of a `CycleDetected` error.
    pub fn cycle(&self) -> Option<&[NodeId]> {
        match self.root() {
            DagError::CycleDetected { cycle } => Some(cycle),
            _ => None,
        }
    }

    /// The per-node entries of an `Aggregated` error.
    pub fn errors(&self) -> Option<&[FailedNode]> {
        match self.root() {
            DagError::Aggregated { errors } => Some(errors),
            _ => None,
        }
    }
}

fn describe_failures(errors: &[FailedNode]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.node_id, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_timeout(node_id: Option<&str>, timeout: &Duration) -> String {
    match node_id {
        Some(id) => format!("Node {id} timed out after {}ms", timeout.as_millis()),
        None => format!("DAG execution timed out after {}ms", timeout.as_millis()),
    }
}
