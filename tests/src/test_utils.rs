//! Test utility functions for integration tests
//!
//! Provides common utilities for test setup, logging, and waiting.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing_subscriber::{fmt, EnvFilter};

/// Result type for integration tests
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize logging for tests
///
/// Uses RUST_LOG environment variable if set, otherwise defaults to "info"
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Lets every queued engine task run to completion.
///
/// Meant for tests with a paused clock: the runtime only advances time once
/// all tasks are idle, so a short sleep returns after the queues drained.
pub async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

/// Wait for a condition to become true with timeout
pub async fn wait_for_condition<F>(mut condition: F, timeout_duration: Duration) -> TestResult
where
    F: FnMut() -> bool,
{
    let result = timeout(timeout_duration, async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => Err("Condition not met within timeout".into()),
    }
}
