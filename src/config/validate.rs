// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ExecuteOptions, RawOptionsFile};
use crate::errors::{DagError, Result};

impl TryFrom<RawOptionsFile> for ExecuteOptions {
    type Error = DagError;

    fn try_from(raw: RawOptionsFile) -> std::result::Result<Self, Self::Error> {
        let section = raw.execution;
        let options = ExecuteOptions {
            retry_failed_nodes: section.retry_failed_nodes,
            max_retries: section.max_retries,
            retry_base_delay: Duration::from_millis(section.retry_base_delay_ms),
            graceful_degradation: section.graceful_degradation,
            required_nodes: section.required_nodes,
            checkpoint_id: section.checkpoint_id,
            resume_from_checkpoint: section.resume_from_checkpoint,
            timeout: section.timeout_ms.map(Duration::from_millis),
            run_timeout: section.run_timeout_ms.map(Duration::from_millis),
            max_concurrency: section.max_concurrency,
            external_checkpoint: None,
        };

        validate_options(&options)?;
        Ok(options)
    }
}

/// Reject option combinations that cannot describe a meaningful run.
///
/// Called by `execute` as well, so options assembled with the builder
/// methods get the same checks as options loaded from TOML.
pub fn validate_options(options: &ExecuteOptions) -> Result<()> {
    validate_retry(options)?;
    validate_concurrency(options)?;
    validate_deadlines(options)?;
    validate_resume(options)?;
    Ok(())
}

fn validate_retry(options: &ExecuteOptions) -> Result<()> {
    if options.retry_failed_nodes && options.max_retries == 0 {
        return Err(DagError::ConfigError(
            "max_retries must be >= 1 when retry_failed_nodes is enabled (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_concurrency(options: &ExecuteOptions) -> Result<()> {
    if options.max_concurrency == Some(0) {
        return Err(DagError::ConfigError(
            "max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_deadlines(options: &ExecuteOptions) -> Result<()> {
    if options.timeout == Some(Duration::ZERO) {
        return Err(DagError::ConfigError(
            "timeout must be greater than zero".to_string(),
        ));
    }
    if options.run_timeout == Some(Duration::ZERO) {
        return Err(DagError::ConfigError(
            "run_timeout must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_resume(options: &ExecuteOptions) -> Result<()> {
    if options.resume_from_checkpoint
        && options.checkpoint_id.is_none()
        && options.external_checkpoint.is_none()
    {
        return Err(DagError::ConfigError(
            "resume_from_checkpoint requires a checkpoint_id or external checkpoint data"
                .to_string(),
        ));
    }
    Ok(())
}
