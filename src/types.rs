// src/types.rs

//! Shared type aliases for node ids, values and work functions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use serde_json::Value;

/// Canonical node id type used throughout the crate.
pub type NodeId = String;

/// Boxed future returned by a node's work function.
pub type WorkFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send + 'static>>;

/// A node's unit of work: maps a computed input to a future of its output.
///
/// The scheduler treats it as opaque. It is shared behind an `Arc` so that
/// executors can hand it to spawned tasks.
pub type WorkFn = Arc<dyn Fn(Value) -> WorkFuture + Send + Sync>;

/// Wrap an async closure into a [`WorkFn`].
///
/// ```
/// use dagrun::{work, Value};
///
/// let double = work(|input: Value| async move {
///     let n = input.as_i64().unwrap_or(0);
///     Ok(Value::from(n * 2))
/// });
/// # let _ = double;
/// ```
pub fn work<F, Fut>(f: F) -> WorkFn
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |input| Box::pin(f(input)))
}
