// ABOUTME: Shared types used across the target contract.
// ABOUTME: ExecResult, ContainerStateSnapshot, OutputFrame, OutputSource.

use bytes::Bytes;
use std::borrow::Cow;

/// Result of a command executed inside a container.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Exit code.
    pub exit_code: i64,
    /// Standard output.
    pub stdout: Vec<u8>,
    /// Standard error.
    pub stderr: Vec<u8>,
}

impl ExecResult {
    /// Whether the command exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Point-in-time view of a container's run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStateSnapshot {
    /// Whether the container is currently running.
    pub running: bool,
    /// Exit code, once the container has stopped.
    pub exit_code: Option<i64>,
}

/// Which stream a chunk of container output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// One chunk of container output, usually a line.
#[derive(Debug, Clone)]
pub struct OutputFrame {
    /// Originating stream.
    pub source: OutputSource,
    /// Raw payload, trailing newline included if the runtime emitted one.
    pub bytes: Bytes,
}

impl OutputFrame {
    pub fn stdout(bytes: impl Into<Bytes>) -> Self {
        Self {
            source: OutputSource::Stdout,
            bytes: bytes.into(),
        }
    }

    pub fn stderr(bytes: impl Into<Bytes>) -> Self {
        Self {
            source: OutputSource::Stderr,
            bytes: bytes.into(),
        }
    }

    /// Payload as UTF-8 text, with invalid sequences replaced.
    pub fn utf8(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}
