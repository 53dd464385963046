// src/exec/concurrent.rs

//! Bounded-parallelism executor.
//!
//! Nodes wait in a queue (topological order). Each pass dispatches queued
//! nodes whose inputs have all completed, up to `max_concurrency` in flight,
//! and puts the rest back at the end of the queue. When nothing more can be
//! started the coordinator waits for one in-flight node to report, records
//! it, and starts the next pass.
//!
//! In-flight nodes run as tasks in a [`JoinSet`] and only send back a
//! [`NodeReport`](crate::exec::runner::NodeReport); the coordinator is the
//! sole owner of the execution state.

use std::collections::VecDeque;

use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::errors::{DagError, Result};
use crate::exec::outcome::ExecutionOutput;
use crate::exec::run::Run;
use crate::exec::runner::{run_node, NodeReport};

/// Run the graph with at most `max_concurrency` node runs in flight.
///
/// The cap counts node runs, not work functions. An attempt that misses its
/// per-node deadline leaves its work running on a detached task while the
/// slot is reused, so with `timeout` set more than `max_concurrency` work
/// functions can be executing at once.
pub(crate) async fn execute_concurrent(
    mut run: Run<'_>,
    max_concurrency: usize,
) -> Result<ExecutionOutput> {
    let max_concurrency = max_concurrency.max(1);

    let mut queue: VecDeque<_> = run
        .order()
        .iter()
        .copied()
        .filter(|&idx| !run.is_complete(idx))
        .collect();
    let mut in_flight: JoinSet<NodeReport> = JoinSet::new();

    info!(
        queued = queue.len(),
        max_concurrency, "starting concurrent dispatch"
    );

    let result = loop {
        if let Err(err) = run.check_deadline() {
            break Err(err);
        }

        if let Err(err) = dispatch_ready(&run, &mut queue, &mut in_flight, max_concurrency) {
            break Err(err);
        }

        if in_flight.is_empty() {
            if queue.is_empty() {
                break Ok(());
            }
            // Inputs always precede a node in topological order and failures
            // count as completion, so an idle scheduler with queued nodes
            // means the bookkeeping is broken.
            break Err(DagError::Other(anyhow::anyhow!(
                "scheduler stalled with {} queued nodes and none ready",
                queue.len()
            )));
        }

        let joined = match run.remaining() {
            Some(left) => match timeout(left, in_flight.join_next()).await {
                Ok(joined) => joined,
                Err(_elapsed) => break Err(run.deadline_error()),
            },
            None => in_flight.join_next().await,
        };

        match joined {
            Some(Ok(report)) => {
                if let Err(err) = run.record(report) {
                    break Err(err);
                }
            }
            Some(Err(join_err)) => {
                break Err(DagError::Other(anyhow::anyhow!(
                    "node task failed to complete: {join_err}"
                )));
            }
            None => {}
        }
    };

    match result {
        Ok(()) => run.finish(),
        Err(err) => {
            // Stop waiting on in-flight nodes without aborting them.
            if !in_flight.is_empty() {
                debug!(in_flight = in_flight.len(), "detaching in-flight nodes");
            }
            in_flight.detach_all();
            Err(err)
        }
    }
}

/// One pass over the queue: start every ready node while there is room.
///
/// Each queued node is looked at most once per pass; nodes whose inputs are
/// still running go back to the end of the queue.
fn dispatch_ready(
    run: &Run<'_>,
    queue: &mut VecDeque<crate::dag::NodeIndex>,
    in_flight: &mut JoinSet<NodeReport>,
    max_concurrency: usize,
) -> Result<()> {
    let mut examined = 0;
    let pending = queue.len();

    while in_flight.len() < max_concurrency && examined < pending {
        examined += 1;
        let Some(idx) = queue.pop_front() else {
            break;
        };

        if !run.inputs_complete(idx) {
            queue.push_back(idx);
            continue;
        }

        let input = run.input_for(idx)?;
        debug!(
            node = %run.id_of(idx),
            in_flight = in_flight.len() + 1,
            "dispatching node"
        );
        in_flight.spawn(run_node(run.node_run(idx, input)));
    }

    Ok(())
}
