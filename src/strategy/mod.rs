// ABOUTME: Wait strategy trait and the built-in probe implementations.
// ABOUTME: Each probe polls the target until ready or the startup deadline elapses.

mod finished;
mod healthcheck;
mod host_port;
mod http;
mod log;
mod poll;
mod shell;
mod wait_all;

pub use finished::ContainerFinishedWaitStrategy;
pub use healthcheck::DockerHealthcheckWaitStrategy;
pub use host_port::HostPortWaitStrategy;
pub use http::HttpWaitStrategy;
pub use log::{LogMessageWaitStrategy, MultiLogMessageWaitStrategy};
pub use shell::ShellWaitStrategy;
pub use wait_all::{WaitAllMode, WaitAllStrategy};

use crate::error::Result;
use crate::target::WaitStrategyTarget;
use async_trait::async_trait;
use std::time::Duration;

/// Startup timeout applied to every strategy unless overridden.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// A readiness probe for a started container.
///
/// Implementations block (asynchronously) until the container satisfies
/// their readiness condition, or fail with
/// [`WaitError::StartupTimeout`](crate::WaitError::StartupTimeout) once the
/// startup deadline elapses. Transient failures along the way are retried,
/// never surfaced.
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    /// Poll the target until it is ready.
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()>;

    /// The configured startup deadline.
    fn startup_timeout(&self) -> Duration;

    /// Replace the startup deadline. Composite strategies use this to
    /// propagate their outer deadline onto children.
    fn set_startup_timeout(&mut self, timeout: Duration);
}
