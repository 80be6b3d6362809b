// ABOUTME: Target contract consumed by wait strategies.
// ABOUTME: A capability view of a running container: ports, health, exec, log stream.

mod types;

pub use types::{ContainerStateSnapshot, ExecResult, OutputFrame, OutputSource};

use async_trait::async_trait;
use futures::Stream;
use std::collections::BTreeSet;
use std::pin::Pin;

/// Combined stdout+stderr output of a container, replayed from the beginning
/// of output and followed live thereafter.
pub type OutputStream = Pin<Box<dyn Stream<Item = OutputFrame> + Send>>;

/// The capability surface a wait strategy may query on a running container.
///
/// The container orchestration layer owns the container; strategies only
/// borrow this view per `wait_until_ready` call. All methods are read-only
/// queries except [`exec`](WaitStrategyTarget::exec), which runs a command
/// inside the container.
#[async_trait]
pub trait WaitStrategyTarget: Send + Sync {
    /// Identifier of the container under test.
    fn container_id(&self) -> String;

    /// Host or IP address from which mapped ports are reachable.
    fn host(&self) -> String;

    /// Container ports the image exposes.
    async fn exposed_ports(&self) -> Result<Vec<u16>, TargetError>;

    /// Host port a container port is mapped to.
    async fn mapped_port(&self, container_port: u16) -> Result<u16, TargetError>;

    /// Container ports declared relevant for readiness: the mapped exposed
    /// ports united with any explicitly bound ports.
    async fn liveness_check_ports(&self) -> Result<BTreeSet<u16>, TargetError>;

    /// Health status as reported by the container runtime's own healthcheck.
    async fn is_healthy(&self) -> Result<bool, TargetError>;

    /// Run a command inside the container and collect its output.
    async fn exec(&self, cmd: &[String]) -> Result<ExecResult, TargetError>;

    /// Subscribe to the container's combined stdout+stderr.
    ///
    /// The stream must start at the beginning of output (since container
    /// start), so output emitted before the subscription is still observed.
    async fn follow_output(&self) -> Result<OutputStream, TargetError>;

    /// Snapshot of the container's run state.
    async fn state(&self) -> Result<ContainerStateSnapshot, TargetError>;
}

/// Errors from target queries.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("port {0} is not mapped")]
    PortNotMapped(u16),

    #[error("no healthcheck configured: {0}")]
    NoHealthcheck(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
