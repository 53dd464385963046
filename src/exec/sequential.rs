// src/exec/sequential.rs

//! Strict topological-order executor.

use tracing::debug;

use crate::errors::Result;
use crate::exec::outcome::ExecutionOutput;
use crate::exec::run::Run;
use crate::exec::runner::run_node;

/// Run every node one after the other, in topological order.
///
/// Nodes already complete (seeded from a checkpoint) are skipped. The run
/// deadline is checked before each node; the per-node deadline is raced
/// inside [`run_node`].
pub(crate) async fn execute_sequential(mut run: Run<'_>) -> Result<ExecutionOutput> {
    let order = run.order().to_vec();

    for idx in order {
        run.check_deadline()?;

        if run.is_complete(idx) {
            debug!(node = %run.id_of(idx), "already complete; skipping");
            continue;
        }

        let input = run.input_for(idx)?;
        let report = run_node(run.node_run(idx, input)).await;
        run.record(report)?;
    }

    run.finish()
}
