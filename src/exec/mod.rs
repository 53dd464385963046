// src/exec/mod.rs

//! Graph execution.
//!
//! - [`state`] holds the per-run results/errors/attempt counts.
//! - [`runner`] runs a single node with retries, backoff and a deadline.
//! - [`run`] is the coordinator shared by both executors.
//! - [`sequential`] runs nodes strictly in topological order.
//! - [`concurrent`] dispatches ready nodes with bounded parallelism.
//! - [`policy`] maps failures to the error the caller sees.
//! - [`outcome`] defines the return value.

pub mod concurrent;
pub mod outcome;
pub mod policy;
pub mod run;
pub mod runner;
pub mod sequential;
pub mod state;

pub use outcome::ExecutionOutput;
pub use policy::FailureCategory;
pub use state::ExecutionState;

use tracing::{error, info};

use crate::checkpoint::Checkpoint;
use crate::config::{validate_options, ExecuteOptions};
use crate::dag::Graph;
use crate::errors::{DagError, Result};
use crate::types::Value;

use self::concurrent::execute_concurrent;
use self::policy::surface;
use self::run::Run;
use self::sequential::execute_sequential;

impl Graph {
    /// Validate the graph, then run every node and return the aggregated output.
    ///
    /// `seed` is the input of every source node. `options.max_concurrency`
    /// selects the concurrent executor; otherwise nodes run one at a time in
    /// topological order.
    pub async fn execute(&mut self, seed: Value, options: &ExecuteOptions) -> Result<ExecutionOutput> {
        validate_options(options)?;
        let order = self
            .validate()
            .map_err(|err| surface(FailureCategory::Validation, err))?;
        let state = self.initial_state(options)?;

        info!(
            nodes = self.len(),
            seeded = state.results.len(),
            max_concurrency = ?options.max_concurrency,
            "starting DAG execution"
        );

        let run = Run::new(&self.nodes, &mut self.checkpoints, options, order, state, seed);
        let outcome = match options.max_concurrency {
            Some(max) => execute_concurrent(run, max).await,
            None => execute_sequential(run).await,
        };

        match &outcome {
            Ok(_) => info!("DAG execution finished"),
            Err(err) => error!(error = %err, "DAG execution failed"),
        }
        outcome
    }

    /// Re-run the graph from a checkpoint.
    ///
    /// Nodes with a result in `checkpoint` are not run again and their stored
    /// result feeds their dependents; every other node, including nodes that
    /// failed before, runs normally. Returns the full results map.
    pub async fn resume(&mut self, checkpoint: &Checkpoint, seed: Value) -> Result<ExecutionOutput> {
        let options = ExecuteOptions::default().with_external_checkpoint(checkpoint.clone());
        self.execute(seed, &options).await
    }

    fn initial_state(&self, options: &ExecuteOptions) -> Result<ExecutionState> {
        let known = |id: &str| self.contains(id);

        if let Some(checkpoint) = &options.external_checkpoint {
            info!(checkpoint = %checkpoint.id, "seeding run from external checkpoint");
            return Ok(ExecutionState::seeded_from(checkpoint, known));
        }

        if options.resume_from_checkpoint {
            let id = options.checkpoint_id.as_deref().unwrap_or_default();
            let checkpoint = self.load_checkpoint(id).ok_or_else(|| {
                surface(
                    FailureCategory::Bookkeeping,
                    DagError::CheckpointNotFound(id.to_string()),
                )
            })?;
            info!(checkpoint = %checkpoint.id, "resuming run from stored checkpoint");
            return Ok(ExecutionState::seeded_from(checkpoint, known));
        }

        Ok(ExecutionState::new())
    }
}
