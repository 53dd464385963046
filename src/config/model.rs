// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::checkpoint::Checkpoint;
use crate::types::NodeId;

/// Options file as read from TOML.
///
/// ```toml
/// [execution]
/// retry_failed_nodes = true
/// max_retries = 3
/// retry_base_delay_ms = 100
/// graceful_degradation = true
/// required_nodes = ["load"]
/// checkpoint_id = "nightly"
/// timeout_ms = 5000
/// max_concurrency = 4
/// ```
///
/// Every key is optional. Use [`ExecuteOptions::try_from`] (or
/// [`load_options`](crate::config::load_options)) to get validated options.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawOptionsFile {
    #[serde(default)]
    pub execution: ExecutionSection,
}

/// `[execution]` section. Durations are given in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSection {
    #[serde(default)]
    pub retry_failed_nodes: bool,

    /// Total attempts per node when retries are enabled.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before retry `n` is `retry_base_delay_ms * 2^(n-1)`.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default)]
    pub graceful_degradation: bool,

    #[serde(default)]
    pub required_nodes: Vec<NodeId>,

    #[serde(default)]
    pub checkpoint_id: Option<String>,

    #[serde(default)]
    pub resume_from_checkpoint: bool,

    /// Per-node deadline, also used as the whole-run deadline when
    /// `run_timeout_ms` is absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Whole-run deadline, checked between dispatches. Overrides
    /// `timeout_ms` for that check.
    #[serde(default)]
    pub run_timeout_ms: Option<u64>,

    /// Run with the concurrent executor when set.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            retry_failed_nodes: false,
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            graceful_degradation: false,
            required_nodes: Vec::new(),
            checkpoint_id: None,
            resume_from_checkpoint: false,
            timeout_ms: None,
            run_timeout_ms: None,
            max_concurrency: None,
        }
    }
}

/// Options for a single [`Graph::execute`](crate::Graph::execute) call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteOptions {
    pub retry_failed_nodes: bool,
    /// Total attempts per node (first try included) when retries are on.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// Keep running independent branches after a non-required failure.
    pub graceful_degradation: bool,
    /// Nodes whose failure always escalates. Empty means "every node".
    pub required_nodes: Vec<NodeId>,
    /// Save a checkpoint under this id after every node.
    pub checkpoint_id: Option<String>,
    /// Seed the run from the stored checkpoint named by `checkpoint_id`.
    pub resume_from_checkpoint: bool,
    /// Per-attempt deadline; also bounds the whole run unless
    /// `run_timeout` is set.
    pub timeout: Option<Duration>,
    /// Whole-run deadline overriding `timeout` for that purpose.
    pub run_timeout: Option<Duration>,
    /// `Some(n)` selects the concurrent executor with at most `n` nodes in flight.
    pub max_concurrency: Option<usize>,
    /// Seed the run from a snapshot supplied by the caller.
    pub external_checkpoint: Option<Checkpoint>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            retry_failed_nodes: false,
            max_retries: default_max_retries(),
            retry_base_delay: Duration::from_millis(default_retry_base_delay_ms()),
            graceful_degradation: false,
            required_nodes: Vec::new(),
            checkpoint_id: None,
            resume_from_checkpoint: false,
            timeout: None,
            run_timeout: None,
            max_concurrency: None,
            external_checkpoint: None,
        }
    }
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable retries with `max_retries` total attempts.
    pub fn with_retry(mut self, max_retries: u32) -> Self {
        self.retry_failed_nodes = true;
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_graceful_degradation(mut self, enabled: bool) -> Self {
        self.graceful_degradation = enabled;
        self
    }

    pub fn with_required_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.required_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_checkpoint(mut self, id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(id.into());
        self
    }

    /// Resume from the checkpoint named by `checkpoint_id`.
    pub fn resuming(mut self) -> Self {
        self.resume_from_checkpoint = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    pub fn with_external_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.external_checkpoint = Some(checkpoint);
        self
    }

    /// Whether any option that switches the run to "full results" mode is set.
    pub fn uses_advanced_options(&self) -> bool {
        self.retry_failed_nodes
            || self.graceful_degradation
            || self.checkpoint_id.is_some()
            || !self.required_nodes.is_empty()
            || self.resumes()
    }

    /// Whether a lone failing node keeps its raw error. Checkpointing and
    /// resume do not count; they only change the return shape.
    pub fn rethrows_sole_failure(&self) -> bool {
        !(self.retry_failed_nodes
            || self.graceful_degradation
            || !self.required_nodes.is_empty())
    }

    /// Whole-run deadline: `run_timeout` when set, otherwise `timeout`.
    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_timeout.or(self.timeout)
    }

    /// Whether the run is seeded from a checkpoint.
    pub fn resumes(&self) -> bool {
        self.resume_from_checkpoint || self.external_checkpoint.is_some()
    }

    /// A node is required when no list is given, or when it is listed.
    pub fn is_required(&self, node: &str) -> bool {
        self.required_nodes.is_empty() || self.is_listed_required(node)
    }

    pub fn is_listed_required(&self, node: &str) -> bool {
        self.required_nodes.iter().any(|n| n == node)
    }

    /// Attempts allowed per node.
    pub fn max_attempts(&self) -> u32 {
        if self.retry_failed_nodes {
            self.max_retries.max(1)
        } else {
            1
        }
    }
}
