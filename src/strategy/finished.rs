// ABOUTME: Wait strategy for one-shot containers that run to completion.
// ABOUTME: Ready when the container has stopped with a successful exit code.

use super::poll::{POLL_INTERVAL, poll_until_ready};
use super::{DEFAULT_STARTUP_TIMEOUT, WaitStrategy};
use crate::error::Result;
use crate::rate_limiter::RateLimiter;
use crate::target::WaitStrategyTarget;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Waits until a batch-job container has stopped and its exit code
/// indicates success.
///
/// A container observed stopped with a non-zero exit code does not fail the
/// wait; polling continues until the deadline, since a restart policy may
/// still bring it to a successful finish. Callers who want fail-fast
/// semantics on a failed exit should inspect the container state themselves
/// after the timeout.
#[derive(Debug)]
pub struct ContainerFinishedWaitStrategy {
    rate_limiter: Arc<RateLimiter>,
    startup_timeout: Duration,
}

impl Default for ContainerFinishedWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerFinishedWaitStrategy {
    pub fn new() -> Self {
        Self {
            rate_limiter: RateLimiter::shared(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}

#[async_trait]
impl WaitStrategy for ContainerFinishedWaitStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        poll_until_ready(
            self.startup_timeout,
            POLL_INTERVAL,
            || async move {
                self.rate_limiter.acquire().await;
                match target.state().await {
                    Ok(state) => !state.running && state.exit_code == Some(0),
                    Err(_) => false,
                }
            },
            || {
                format!(
                    "container {} did not stop with a successful exit code",
                    target.container_id()
                )
            },
        )
        .await
    }

    fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    fn set_startup_timeout(&mut self, timeout: Duration) {
        self.startup_timeout = timeout;
    }
}
