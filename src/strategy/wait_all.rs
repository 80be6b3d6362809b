// ABOUTME: Composite wait strategy running children in order under one deadline.
// ABOUTME: The outer deadline preempts children mid-poll, not at child boundaries.

use super::WaitStrategy;
use crate::error::{Result, WaitError};
use crate::target::WaitStrategyTarget;
use async_trait::async_trait;
use std::time::Duration;

/// How a [`WaitAllStrategy`] treats timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitAllMode {
    /// The composite owns a single overall deadline. Setting the startup
    /// timeout propagates it onto every child, overriding whatever the
    /// children had configured themselves.
    #[default]
    WithOuterTimeout,
    /// No outer deadline; each child relies on its own configured timeout.
    /// Setting a startup timeout on the composite is a configuration error
    /// in this mode.
    WithIndividualTimeoutsOnly,
}

/// Runs an ordered list of wait strategies sequentially.
///
/// In the default [`WaitAllMode::WithOuterTimeout`] mode the whole sequence
/// executes under one wall-clock deadline (30 seconds unless overridden):
/// when it elapses, a child still mid-poll is cancelled immediately and the
/// composite fails with a startup timeout.
pub struct WaitAllStrategy {
    mode: WaitAllMode,
    children: Vec<Box<dyn WaitStrategy>>,
    timeout: Duration,
    config_error: Option<String>,
}

impl std::fmt::Debug for WaitAllStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitAllStrategy")
            .field("mode", &self.mode)
            .field("children", &self.children.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for WaitAllStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitAllStrategy {
    pub fn new() -> Self {
        Self::with_mode(WaitAllMode::WithOuterTimeout)
    }

    pub fn with_mode(mode: WaitAllMode) -> Self {
        Self {
            mode,
            children: Vec::new(),
            timeout: Duration::from_secs(30),
            config_error: None,
        }
    }

    /// Append a child strategy. Children run in registration order.
    pub fn with_strategy(mut self, strategy: impl WaitStrategy + 'static) -> Self {
        let mut child: Box<dyn WaitStrategy> = Box::new(strategy);
        if self.mode == WaitAllMode::WithOuterTimeout {
            // A child cannot be allowed to outlive the composite deadline,
            // so its own timeout is overwritten with the outer one.
            child.set_startup_timeout(self.timeout);
        }
        self.children.push(child);
        self
    }

    /// Set the overall deadline and propagate it onto every child.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.apply_timeout(timeout);
        self
    }

    fn apply_timeout(&mut self, timeout: Duration) {
        match self.mode {
            WaitAllMode::WithOuterTimeout => {
                self.timeout = timeout;
                for child in &mut self.children {
                    child.set_startup_timeout(timeout);
                }
            }
            WaitAllMode::WithIndividualTimeoutsOnly => {
                // Surfaced on the next wait_until_ready call; misconfiguring
                // a strategy must not silently change timeout semantics.
                self.config_error = Some(
                    "cannot set a startup timeout on a WaitAllStrategy using individual timeouts"
                        .to_string(),
                );
            }
        }
    }

    async fn run_children(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        for child in &self.children {
            child.wait_until_ready(target).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl WaitStrategy for WaitAllStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        if let Some(message) = &self.config_error {
            return Err(WaitError::InvalidConfig(message.clone()));
        }

        match self.mode {
            WaitAllMode::WithOuterTimeout => {
                tokio::time::timeout(self.timeout, self.run_children(target))
                    .await
                    .map_err(|_| WaitError::StartupTimeout {
                        timeout: self.timeout,
                        details: format!(
                            "composite wait over {} strategies did not complete",
                            self.children.len()
                        ),
                    })?
            }
            WaitAllMode::WithIndividualTimeoutsOnly => self.run_children(target).await,
        }
    }

    fn startup_timeout(&self) -> Duration {
        self.timeout
    }

    fn set_startup_timeout(&mut self, timeout: Duration) {
        self.apply_timeout(timeout);
    }
}
