// ABOUTME: Wait strategy running a shell command inside the container.
// ABOUTME: Readiness is a zero exit code; command output is ignored.

use super::poll::{POLL_INTERVAL, poll_until_ready};
use super::{DEFAULT_STARTUP_TIMEOUT, WaitStrategy};
use crate::error::Result;
use crate::rate_limiter::RateLimiter;
use crate::target::WaitStrategyTarget;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Waits until a command run inside the container via `/bin/sh -c` exits
/// with status zero.
#[derive(Debug)]
pub struct ShellWaitStrategy {
    command: String,
    rate_limiter: Arc<RateLimiter>,
    startup_timeout: Duration,
}

impl ShellWaitStrategy {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
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
impl WaitStrategy for ShellWaitStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        let command = vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            self.command.clone(),
        ];
        let command = &command;

        poll_until_ready(
            self.startup_timeout,
            POLL_INTERVAL,
            || async move {
                self.rate_limiter.acquire().await;
                match target.exec(command).await {
                    Ok(result) => result.success(),
                    // Exec failures (container still starting) are "not yet".
                    Err(_) => false,
                }
            },
            || {
                format!(
                    "command '{}' in container {} did not exit with status 0",
                    self.command,
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
