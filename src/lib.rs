// ABOUTME: Library root for vigla - readiness wait strategies for test containers.
// ABOUTME: Exposes the strategy trait, probe implementations, and the target contract.

pub mod error;
pub mod rate_limiter;
pub mod strategy;
pub mod target;
pub mod wait;

pub use error::{Result, WaitError};
pub use rate_limiter::RateLimiter;
pub use strategy::WaitStrategy;
pub use target::WaitStrategyTarget;
pub use wait::Wait;
