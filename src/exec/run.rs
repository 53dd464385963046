// src/exec/run.rs

//! State and bookkeeping shared by both executors.
//!
//! A [`Run`] owns the [`ExecutionState`] for one `execute` call. Executors
//! ask it for node inputs, hand it each [`NodeReport`], and finally let it
//! decide the return value. Keeping all mutation here means the concurrent
//! executor needs no locks: spawned node tasks only produce reports.

use std::time::Instant;

use tracing::{debug, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::ExecuteOptions;
use crate::dag::{Node, NodeIndex};
use crate::errors::{DagError, NodeExecutionError, Result};
use crate::exec::outcome::{collect_output, ExecutionOutput};
use crate::exec::policy;
use crate::exec::runner::{AttemptPolicy, NodeReport, NodeRun};
use crate::exec::ExecutionState;
use crate::types::{NodeId, Value};

pub(crate) struct Run<'g> {
    nodes: &'g [Node],
    checkpoints: &'g mut CheckpointStore,
    options: &'g ExecuteOptions,
    order: Vec<NodeIndex>,
    state: ExecutionState,
    seed: Value,
    started: Instant,
}

impl<'g> Run<'g> {
    pub fn new(
        nodes: &'g [Node],
        checkpoints: &'g mut CheckpointStore,
        options: &'g ExecuteOptions,
        order: Vec<NodeIndex>,
        state: ExecutionState,
        seed: Value,
    ) -> Self {
        Self {
            nodes,
            checkpoints,
            options,
            order,
            state,
            seed,
            started: Instant::now(),
        }
    }

    /// Topological order computed during validation.
    pub fn order(&self) -> &[NodeIndex] {
        &self.order
    }

    pub fn id_of(&self, idx: NodeIndex) -> &'g str {
        let nodes: &'g [Node] = self.nodes;
        &nodes[idx.0].id
    }

    /// Whether `idx` already has a result or a terminal error.
    pub fn is_complete(&self, idx: NodeIndex) -> bool {
        self.state.is_complete(self.id_of(idx))
    }

    /// Whether every input of `idx` has completed, successfully or not.
    pub fn inputs_complete(&self, idx: NodeIndex) -> bool {
        self.nodes[idx.0]
            .inputs
            .iter()
            .all(|&upstream| self.is_complete(upstream))
    }

    /// Fail once the whole-run deadline has passed.
    pub fn check_deadline(&self) -> Result<()> {
        match self.options.run_deadline() {
            Some(limit) if self.started.elapsed() >= limit => {
                warn!(timeout_ms = limit.as_millis() as u64, "run deadline exceeded");
                Err(policy::run_deadline(limit))
            }
            _ => Ok(()),
        }
    }

    /// Time left before the whole-run deadline, if one is set.
    pub fn remaining(&self) -> Option<std::time::Duration> {
        self.options
            .run_deadline()
            .map(|limit| limit.saturating_sub(self.started.elapsed()))
    }

    pub fn deadline_error(&self) -> DagError {
        let limit = self.options.run_deadline().unwrap_or_default();
        warn!(timeout_ms = limit.as_millis() as u64, "run deadline exceeded");
        policy::run_deadline(limit)
    }

    /// Compute the value handed to a node's work function.
    ///
    /// - no inputs: the caller's seed,
    /// - one input: that upstream's result,
    /// - several inputs: an array of upstream results, in input order.
    pub fn input_for(&self, idx: NodeIndex) -> Result<Value> {
        let node = &self.nodes[idx.0];
        match node.inputs.as_slice() {
            [] => Ok(self.seed.clone()),
            [upstream] => self.upstream_value(node, *upstream),
            many => many
                .iter()
                .map(|&upstream| self.upstream_value(node, upstream))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
        }
    }

    fn upstream_value(&self, node: &Node, upstream: NodeIndex) -> Result<Value> {
        let upstream_id = self.id_of(upstream);

        if let Some(value) = self.state.results.get(upstream_id) {
            return Ok(value.clone());
        }

        if self.state.has_failed(upstream_id) {
            if self.options.graceful_degradation && !self.options.is_listed_required(upstream_id) {
                warn!(
                    node = %node.id,
                    upstream = %upstream_id,
                    "upstream failed; substituting null input"
                );
                return Ok(Value::Null);
            }
            return Err(policy::upstream_failed(&node.id, upstream_id));
        }

        Err(DagError::Other(anyhow::anyhow!(
            "node {} scheduled before upstream {} completed",
            node.id,
            upstream_id
        )))
    }

    /// Package a node for [`run_node`](crate::exec::runner::run_node).
    pub fn node_run(&self, idx: NodeIndex, input: Value) -> NodeRun {
        let node = &self.nodes[idx.0];
        NodeRun {
            index: idx,
            node_id: node.id.clone(),
            work: node.work.clone(),
            input,
            policy: AttemptPolicy::from_options(self.options),
        }
    }

    /// Record a finished node, checkpoint, then decide whether to escalate.
    pub fn record(&mut self, report: NodeReport) -> Result<()> {
        let nodes = self.nodes;
        let node = &nodes[report.index.0];
        self.state.retry_count.insert(node.id.clone(), report.attempts);

        let escalation = match report.outcome {
            Ok(value) => {
                self.state.results.insert(node.id.clone(), value);
                None
            }
            Err(err) => {
                let escalation = self.on_terminal_failure(node, &err);
                self.state.errors.insert(node.id.clone(), err);
                escalation
            }
        };

        self.save_checkpoint();

        match escalation {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn on_terminal_failure(&self, node: &Node, err: &NodeExecutionError) -> Option<DagError> {
        if self.nodes.len() == 1 && self.options.rethrows_sole_failure() {
            return Some(policy::sole_node_failure(err.clone()));
        }

        let dependents: Vec<NodeId> = node
            .outputs
            .iter()
            .map(|&idx| self.id_of(idx).to_string())
            .collect();

        // Listed nodes escalate even under degradation; without degradation
        // any required node escalates once something depends on it.
        let escalates = if self.options.graceful_degradation {
            self.options.is_listed_required(&node.id)
        } else {
            self.options.is_required(&node.id) && !dependents.is_empty()
        };
        if escalates {
            return Some(policy::required_failure(err.clone(), dependents));
        }

        if self.options.graceful_degradation {
            warn!(
                node = %node.id,
                error = %err,
                ?dependents,
                "node failed; continuing with independent branches"
            );
        } else {
            debug!(node = %node.id, error = %err, "node failed without blocked dependents");
        }
        None
    }

    fn save_checkpoint(&mut self) {
        if let Some(id) = &self.options.checkpoint_id {
            self.checkpoints.save(id.clone(), &self.state);
        }
    }

    /// Settle the run: escalate leftover failures or build the output.
    pub fn finish(self) -> Result<ExecutionOutput> {
        if let Some(err) =
            policy::conclude(self.state.errors.values(), self.options.graceful_degradation)
        {
            return Err(err);
        }
        collect_output(self.nodes, self.state, self.options)
    }
}
