// ABOUTME: Wait strategy delegating readiness to the runtime's own healthcheck.
// ABOUTME: Polls the target's reported health status until it turns healthy.

use super::poll::{POLL_INTERVAL, poll_until_ready};
use super::{DEFAULT_STARTUP_TIMEOUT, WaitStrategy};
use crate::error::Result;
use crate::rate_limiter::RateLimiter;
use crate::target::WaitStrategyTarget;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Waits until the container runtime reports the container healthy.
///
/// The readiness condition is entirely the image's own HEALTHCHECK; this
/// strategy adds no protocol logic of its own. A target that cannot report
/// health (no healthcheck configured) never becomes ready and times out.
#[derive(Debug)]
pub struct DockerHealthcheckWaitStrategy {
    rate_limiter: Arc<RateLimiter>,
    startup_timeout: Duration,
}

impl Default for DockerHealthcheckWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerHealthcheckWaitStrategy {
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
impl WaitStrategy for DockerHealthcheckWaitStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        poll_until_ready(
            self.startup_timeout,
            POLL_INTERVAL,
            || async move {
                self.rate_limiter.acquire().await;
                target.is_healthy().await.unwrap_or(false)
            },
            || {
                format!(
                    "container {} did not report a healthy status",
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
