// ABOUTME: Host port wait strategy checking TCP reachability of liveness ports.
// ABOUTME: Requires both an external socket connect and an in-container check to pass.

use super::poll::{POLL_INTERVAL, poll_until_ready};
use super::{DEFAULT_STARTUP_TIMEOUT, WaitStrategy};
use crate::error::{Result, WaitError};
use crate::rate_limiter::RateLimiter;
use crate::target::WaitStrategyTarget;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// Cap on a single external connect attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Waits until every liveness-check port accepts TCP connections, both from
/// outside the container (via its mapped host port) and from inside the
/// container's own network namespace.
///
/// The dual check exists because a port can be listening inside the
/// container yet not be forwarded externally yet, or the other way around
/// while a proxy is still starting.
#[derive(Debug)]
pub struct HostPortWaitStrategy {
    ports: Option<Vec<u16>>,
    rate_limiter: Arc<RateLimiter>,
    startup_timeout: Duration,
}

impl Default for HostPortWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPortWaitStrategy {
    pub fn new() -> Self {
        Self {
            ports: None,
            rate_limiter: RateLimiter::shared(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Check these container ports instead of the target's liveness set.
    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = Some(ports);
        self
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
impl WaitStrategy for HostPortWaitStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        let container_ports: Vec<u16> = match &self.ports {
            Some(ports) if !ports.is_empty() => ports.clone(),
            _ => target
                .liveness_check_ports()
                .await
                .map_err(|e| WaitError::Target(e.to_string()))?
                .into_iter()
                .collect(),
        };

        if container_ports.is_empty() {
            tracing::warn!(
                container = %target.container_id(),
                "no exposed or mapped ports to check, not waiting"
            );
            return Ok(());
        }

        let host = target.host();
        let internal_command = internal_check_command(&container_ports);

        tracing::info!(
            container = %target.container_id(),
            host = %host,
            ports = ?container_ports,
            "waiting for ports to start listening"
        );

        let host_ref = host.as_str();
        let ports = container_ports.as_slice();
        let command = internal_command.as_slice();

        poll_until_ready(
            self.startup_timeout,
            POLL_INTERVAL,
            || async move {
                self.rate_limiter.acquire().await;
                externally_listening(target, host_ref, ports).await
                    && internally_listening(target, command).await
            },
            || {
                format!(
                    "ports {:?} on {} were not listening (external and in-container checks must both pass)",
                    container_ports, host
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

/// Try a TCP connect to every mapped port from the caller's process.
async fn externally_listening(
    target: &dyn WaitStrategyTarget,
    host: &str,
    container_ports: &[u16],
) -> bool {
    for &port in container_ports {
        let mapped = match target.mapped_port(port).await {
            Ok(mapped) => mapped,
            // Not mapped yet counts as not listening.
            Err(_) => return false,
        };
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, mapped))).await {
            Ok(Ok(_)) => {}
            _ => return false,
        }
    }
    true
}

/// Run the combined per-port check inside the container's namespace.
async fn internally_listening(target: &dyn WaitStrategyTarget, command: &[String]) -> bool {
    match target.exec(command).await {
        Ok(result) => result.success(),
        Err(_) => false,
    }
}

/// Build a single shell command verifying every port from inside the
/// container. Each port clause tries three mechanisms, since minimal images
/// carry different tooling: a /proc/net/tcp hex scan, netcat, and the bash
/// /dev/tcp redirect.
fn internal_check_command(container_ports: &[u16]) -> Vec<String> {
    let mut command = String::from("true");
    for &port in container_ports {
        command.push_str(&format!(
            " && (cat /proc/net/tcp* | awk '{{print $2}}' | grep -i :{port:x} || nc -vz -w 1 localhost {port} || /bin/bash -c '</dev/tcp/localhost/{port}')"
        ));
    }
    vec!["/bin/sh".to_string(), "-c".to_string(), command]
}
