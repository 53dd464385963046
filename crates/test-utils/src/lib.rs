//! Shared helpers for `dagrun` integration tests: graph builders, scripted
//! work functions and test-scoped tracing.

pub mod builders;
pub mod work;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Upper bound on any single graph run in a test.
pub const RUN_LIMIT: Duration = Duration::from_secs(5);

/// Route executor logs to the test harness, once per test binary.
///
/// Level comes from `RUST_LOG` (default `info`); output only shows for
/// failing tests unless `--nocapture` is passed.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await a graph run, failing the test if it outlives [`RUN_LIMIT`].
///
/// Node deadlines are detached rather than aborted, so a stuck run would
/// otherwise hang the test binary.
pub async fn with_timeout<F, T>(run: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(RUN_LIMIT, run)
        .await
        .unwrap_or_else(|_| panic!("graph run exceeded {RUN_LIMIT:?}"))
}
