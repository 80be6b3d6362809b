// ABOUTME: Convenience constructors for the built-in wait strategies.
// ABOUTME: The usual entry point for test authors configuring a container.

use crate::error::Result;
use crate::strategy::{
    DockerHealthcheckWaitStrategy, HostPortWaitStrategy, HttpWaitStrategy, LogMessageWaitStrategy,
    ShellWaitStrategy,
};

/// Factory for the built-in wait strategies.
///
/// ```no_run
/// use vigla::Wait;
///
/// let strategy = Wait::for_http("/health").with_status_code(204);
/// ```
#[derive(Debug)]
pub struct Wait;

impl Wait {
    /// The strategy applied when a caller configures nothing: wait for the
    /// liveness ports to start listening.
    pub fn default_strategy() -> HostPortWaitStrategy {
        Self::for_listening_port()
    }

    /// Wait for all liveness-check ports to accept TCP connections.
    pub fn for_listening_port() -> HostPortWaitStrategy {
        HostPortWaitStrategy::new()
    }

    /// Wait for container output matching `pattern` at least `times` times.
    ///
    /// # Errors
    ///
    /// Returns `WaitError::InvalidConfig` if the pattern does not compile.
    pub fn for_log_message(pattern: &str, times: usize) -> Result<LogMessageWaitStrategy> {
        Ok(LogMessageWaitStrategy::new(pattern)?.with_times(times))
    }

    /// Wait for an HTTP endpoint at `path` to answer acceptably.
    pub fn for_http(path: &str) -> HttpWaitStrategy {
        HttpWaitStrategy::new().with_path(path)
    }

    /// Wait for an HTTPS endpoint at `path` to answer acceptably.
    pub fn for_https(path: &str) -> HttpWaitStrategy {
        HttpWaitStrategy::new().with_path(path).using_tls()
    }

    /// Wait for the container runtime to report the container healthy.
    pub fn for_healthcheck() -> DockerHealthcheckWaitStrategy {
        DockerHealthcheckWaitStrategy::new()
    }

    /// Wait for a shell command inside the container to succeed.
    pub fn for_successful_command(command: &str) -> ShellWaitStrategy {
        ShellWaitStrategy::new(command)
    }
}
