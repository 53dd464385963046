// src/lib.rs

//! Dependency-graph task executor.
//!
//! Build a [`Graph`] of named nodes, each with an async work function, wire
//! them with [`Graph::connect`], then call [`Graph::execute`]:
//!
//! ```no_run
//! use dagrun::{work, ExecuteOptions, Graph, Value};
//!
//! # async fn demo() -> dagrun::Result<()> {
//! let mut graph = Graph::new();
//! graph.add_node("load", work(|seed: Value| async move { Ok(seed) }))?;
//! graph.add_node("count", work(|docs: Value| async move {
//!     Ok(Value::from(docs.as_array().map(|a| a.len()).unwrap_or(0)))
//! }))?;
//! graph.connect("load", "count")?;
//!
//! let output = graph
//!     .execute(serde_json::json!(["a", "b"]), &ExecuteOptions::default())
//!     .await?;
//! assert_eq!(output.into_value(), Value::from(2));
//! # Ok(())
//! # }
//! ```
//!
//! This wires together:
//! - graph construction and validation ([`dag`])
//! - sequential and bounded-concurrency executors ([`exec`])
//! - retry with exponential backoff, per-node and whole-run deadlines
//! - in-memory checkpoints and resume ([`checkpoint`])
//! - a single failure policy for what the caller sees ([`exec::policy`])

pub mod checkpoint;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::{load_options, ExecuteOptions};
pub use dag::{Graph, Node, NodeIndex};
pub use errors::{DagError, FailedNode, NodeExecutionError, Result};
pub use exec::{ExecutionOutput, ExecutionState};
pub use types::{work, NodeId, Value, WorkFn, WorkFuture};
