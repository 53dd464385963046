// src/exec/policy.rs

//! How failures reach the caller.
//!
//! Every error an executor returns goes through [`surface`], which decides
//! from the failure's category alone whether it is passed through untouched
//! or wrapped in [`DagError::ExecutionFailed`]:
//!
//! | category           | surfaced as                         |
//! |--------------------|-------------------------------------|
//! | `Validation`       | unchanged                           |
//! | `SoleNodeGraph`    | raw node error (original message)   |
//! | `Timeout`          | `ExecutionTimeout`, unwrapped       |
//! | `RequiredFailure`  | wrapped                             |
//! | `SingleFailure`    | wrapped node error                  |
//! | `MultipleFailures` | wrapped `Aggregated`                |
//! | `Bookkeeping`      | unchanged                           |

use std::time::Duration;

use tracing::error;

use crate::errors::{DagError, FailedNode, NodeExecutionError};
use crate::types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Structural problems found before any node ran.
    Validation,
    /// The only node of a plain single-node run failed.
    SoleNodeGraph,
    /// A per-node or whole-run deadline passed.
    Timeout,
    /// A required node failed while something still depended on it.
    RequiredFailure,
    /// Exactly one node failed over the whole run.
    SingleFailure,
    /// Several nodes failed over the whole run.
    MultipleFailures,
    /// Missing checkpoint, missing sink and similar run bookkeeping.
    Bookkeeping,
}

impl FailureCategory {
    pub fn wraps(self) -> bool {
        match self {
            FailureCategory::Validation
            | FailureCategory::SoleNodeGraph
            | FailureCategory::Timeout
            | FailureCategory::Bookkeeping => false,
            FailureCategory::RequiredFailure
            | FailureCategory::SingleFailure
            | FailureCategory::MultipleFailures => true,
        }
    }
}

/// Apply the policy table to `err`.
pub fn surface(category: FailureCategory, err: DagError) -> DagError {
    if category.wraps() {
        DagError::ExecutionFailed(Box::new(err))
    } else {
        err
    }
}

/// A node that timed out surfaces as a timeout whatever else applies.
fn timeout_of(err: &NodeExecutionError) -> Option<DagError> {
    err.timed_out.map(|limit| {
        surface(
            FailureCategory::Timeout,
            DagError::ExecutionTimeout {
                node_id: Some(err.node_id.clone()),
                timeout: limit,
            },
        )
    })
}

pub(crate) fn sole_node_failure(err: NodeExecutionError) -> DagError {
    timeout_of(&err).unwrap_or_else(|| surface(FailureCategory::SoleNodeGraph, err.into()))
}

/// A required node failed. With dependents the error names them; without,
/// the node's own error is reported.
pub(crate) fn required_failure(err: NodeExecutionError, dependents: Vec<NodeId>) -> DagError {
    error!(
        node = %err.node_id,
        ?dependents,
        error = %err,
        "required node failed; aborting run"
    );
    if let Some(timeout) = timeout_of(&err) {
        return timeout;
    }
    let inner = if dependents.is_empty() {
        DagError::NodeExecution(err)
    } else {
        DagError::DependentsBlocked {
            dependents,
            source: err,
        }
    };
    surface(FailureCategory::RequiredFailure, inner)
}

pub(crate) fn upstream_failed(node_id: &str, upstream: &str) -> DagError {
    surface(
        FailureCategory::RequiredFailure,
        DagError::UpstreamFailed {
            node_id: node_id.to_string(),
            upstream: upstream.to_string(),
        },
    )
}

pub(crate) fn run_deadline(limit: Duration) -> DagError {
    surface(
        FailureCategory::Timeout,
        DagError::ExecutionTimeout {
            node_id: None,
            timeout: limit,
        },
    )
}

/// Turn the failures left at the end of a run into the final error.
///
/// Several failures are aggregated with their original causes (no retry
/// wrapper). A single failure is reported as itself unless graceful
/// degradation tolerated it.
pub(crate) fn conclude<'a>(
    failures: impl IntoIterator<Item = &'a NodeExecutionError>,
    graceful_degradation: bool,
) -> Option<DagError> {
    let failures: Vec<&NodeExecutionError> = failures.into_iter().collect();

    match failures.as_slice() {
        [] => None,
        [only] => {
            if graceful_degradation {
                None
            } else {
                let err = (*only).clone();
                Some(timeout_of(&err).unwrap_or_else(|| {
                    surface(FailureCategory::SingleFailure, err.into())
                }))
            }
        }
        many => {
            let errors = many
                .iter()
                .map(|err| FailedNode {
                    node_id: err.node_id.clone(),
                    message: err.cause.clone(),
                })
                .collect();
            Some(surface(
                FailureCategory::MultipleFailures,
                DagError::Aggregated { errors },
            ))
        }
    }
}
