// ABOUTME: Application-wide error types for vigla.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by wait strategies.
///
/// Transient probe failures (connection refused, non-matching output,
/// non-zero exit codes, not-yet-healthy) are absorbed inside the polling
/// loop and never reach the caller. The only failure a caller sees for a
/// container that simply is not ready is `StartupTimeout`.
#[derive(Debug, Error)]
pub enum WaitError {
    /// The startup deadline elapsed before the readiness condition held.
    ///
    /// `details` describes the unmet condition (pattern text, expected
    /// status codes, port set, or command) so the check can be reproduced
    /// manually.
    #[error("timed out after {timeout:?} waiting for container readiness: {details}")]
    StartupTimeout { timeout: Duration, details: String },

    /// The strategy was misconfigured. Raised before any waiting begins.
    #[error("invalid wait strategy configuration: {0}")]
    InvalidConfig(String),

    /// The target capability surface failed in a way that makes probing
    /// impossible, e.g. the output stream could not be subscribed.
    #[error("wait target error: {0}")]
    Target(String),
}

pub type Result<T> = std::result::Result<T, WaitError>;
