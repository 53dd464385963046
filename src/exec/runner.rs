// src/exec/runner.rs

//! Running a single node: attempts, backoff and the per-node deadline.
//!
//! Everything here is owned (`'static`), so a [`NodeRun`] can be awaited
//! inline by the sequential executor or spawned by the concurrent one.

use std::time::{Duration, SystemTime};

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::ExecuteOptions;
use crate::dag::NodeIndex;
use crate::errors::NodeExecutionError;
use crate::types::{NodeId, Value, WorkFn};

/// Retry and deadline settings derived from [`ExecuteOptions`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttemptPolicy {
    pub max_attempts: u32,
    pub retried: bool,
    pub base_delay: Duration,
    pub timeout: Option<Duration>,
}

impl AttemptPolicy {
    pub fn from_options(options: &ExecuteOptions) -> Self {
        Self {
            max_attempts: options.max_attempts(),
            retried: options.retry_failed_nodes,
            base_delay: options.retry_base_delay,
            timeout: options.timeout,
        }
    }

    /// Wait before the attempt following `attempt`: `base * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Everything needed to run one node, detached from the graph.
pub(crate) struct NodeRun {
    pub index: NodeIndex,
    pub node_id: NodeId,
    pub work: WorkFn,
    pub input: Value,
    pub policy: AttemptPolicy,
}

/// What happened to a node, reported back to the coordinator.
#[derive(Debug)]
pub(crate) struct NodeReport {
    pub index: NodeIndex,
    pub attempts: u32,
    pub outcome: Result<Value, NodeExecutionError>,
}

enum AttemptFailure {
    Failed(String),
    TimedOut(Duration),
}

impl AttemptFailure {
    fn describe(&self, node_id: &str) -> String {
        match self {
            AttemptFailure::Failed(cause) => cause.clone(),
            AttemptFailure::TimedOut(limit) => {
                format!("Node {node_id} timed out after {}ms", limit.as_millis())
            }
        }
    }
}

/// Run a node until it succeeds or its attempts are used up.
pub(crate) async fn run_node(run: NodeRun) -> NodeReport {
    let NodeRun {
        index,
        node_id,
        work,
        input,
        policy,
    } = run;

    let mut attempt = 0;
    loop {
        attempt += 1;
        debug!(node = %node_id, attempt, "running node");

        let failure = match run_attempt(&work, input.clone(), policy.timeout).await {
            Ok(value) => {
                debug!(node = %node_id, attempt, "node succeeded");
                return NodeReport {
                    index,
                    attempts: attempt,
                    outcome: Ok(value),
                };
            }
            Err(failure) => failure,
        };

        if attempt >= policy.max_attempts {
            let timed_out = match failure {
                AttemptFailure::TimedOut(limit) => Some(limit),
                AttemptFailure::Failed(_) => None,
            };
            let cause = failure.describe(&node_id);
            return NodeReport {
                index,
                attempts: attempt,
                outcome: Err(NodeExecutionError {
                    node_id,
                    timestamp: SystemTime::now(),
                    attempts: attempt,
                    retried: policy.retried,
                    timed_out,
                    cause,
                }),
            };
        }

        let delay = policy.backoff(attempt);
        warn!(
            node = %node_id,
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %failure.describe(&node_id),
            "node failed; retrying after backoff"
        );
        sleep(delay).await;
    }
}

/// One call of the work function.
///
/// The work runs on its own task. When the deadline passes the handle is
/// dropped, which detaches the task rather than aborting it: the executor
/// stops waiting, the work keeps running to completion on its own.
async fn run_attempt(
    work: &WorkFn,
    input: Value,
    deadline: Option<Duration>,
) -> Result<Value, AttemptFailure> {
    let mut handle = tokio::spawn(work(input));

    let joined = match deadline {
        Some(limit) => match timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_elapsed) => return Err(AttemptFailure::TimedOut(limit)),
        },
        None => handle.await,
    };

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(AttemptFailure::Failed(format!("{err:#}"))),
        Err(join_err) => Err(AttemptFailure::Failed(format!(
            "work function panicked: {join_err}"
        ))),
    }
}
