// ABOUTME: Log-based wait strategies matching container output against regexes.
// ABOUTME: Single-pattern with a match count, and multi-pattern AND semantics.

use super::{DEFAULT_STARTUP_TIMEOUT, WaitStrategy};
use crate::error::{Result, WaitError};
use crate::target::WaitStrategyTarget;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::time::Duration;

fn compile(pattern: &str) -> Result<Regex> {
    // Startup banners are commonly multi-line, so `.` must match newlines.
    RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| WaitError::InvalidConfig(format!("invalid log pattern '{}': {}", pattern, e)))
}

/// Waits until the container's combined stdout+stderr has emitted output
/// matching a pattern a required number of times.
///
/// The output stream is subscribed from the beginning of output, so log
/// lines emitted before the wait started still count.
#[derive(Debug)]
pub struct LogMessageWaitStrategy {
    pattern: Regex,
    times: usize,
    startup_timeout: Duration,
}

impl LogMessageWaitStrategy {
    /// Wait for output matching `pattern` (DOTALL semantics) at least once.
    ///
    /// # Errors
    ///
    /// Returns `WaitError::InvalidConfig` if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            times: 1,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        })
    }

    /// Require the pattern to match at least `times` distinct output frames.
    /// Values below 1 are clamped to 1.
    pub fn with_times(mut self, times: usize) -> Self {
        self.times = times.max(1);
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}

#[async_trait]
impl WaitStrategy for LogMessageWaitStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        let mut stream = target
            .follow_output()
            .await
            .map_err(|e| WaitError::Target(e.to_string()))?;

        let wait_for_matches = async {
            let mut matched = 0usize;
            while let Some(frame) = stream.next().await {
                let text = frame.utf8();
                tracing::debug!(source = ?frame.source, "{}", text.trim_end_matches('\n'));
                if self.pattern.is_match(&text) {
                    matched += 1;
                    if matched >= self.times {
                        return;
                    }
                }
            }
            // The stream closed before enough matches. Absence of output is
            // not evidence of readiness; hold until the deadline trips.
            futures::future::pending::<()>().await;
        };

        tokio::time::timeout(self.startup_timeout, wait_for_matches)
            .await
            .map_err(|_| WaitError::StartupTimeout {
                timeout: self.startup_timeout,
                details: format!(
                    "container {} did not emit output matching '{}' {} time(s)",
                    target.container_id(),
                    self.pattern.as_str(),
                    self.times
                ),
            })
    }

    fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    fn set_startup_timeout(&mut self, timeout: Duration) {
        self.startup_timeout = timeout;
    }
}

#[derive(Debug)]
struct PatternState {
    regex: Regex,
    matched: bool,
}

/// Waits until every configured pattern has matched at least once, in any
/// order and regardless of how often each matches beyond the first time.
///
/// The match table survives across invocations so a satisfied strategy
/// stays satisfied; [`reset`](MultiLogMessageWaitStrategy::reset) re-arms
/// all patterns for reuse across a container restart.
#[derive(Debug)]
pub struct MultiLogMessageWaitStrategy {
    patterns: Mutex<Vec<PatternState>>,
    startup_timeout: Duration,
}

impl Default for MultiLogMessageWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiLogMessageWaitStrategy {
    pub fn new() -> Self {
        Self {
            patterns: Mutex::new(Vec::new()),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Add a required pattern (DOTALL semantics).
    ///
    /// # Errors
    ///
    /// Returns `WaitError::InvalidConfig` if the pattern does not compile.
    pub fn with_pattern(self, pattern: &str) -> Result<Self> {
        self.patterns.lock().push(PatternState {
            regex: compile(pattern)?,
            matched: false,
        });
        Ok(self)
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Re-arm every pattern to unmatched, so the strategy can be reused for
    /// a restarted container. The output subscription is made fresh on each
    /// `wait_until_ready` call and needs no re-registration.
    pub fn reset(&self) {
        for state in self.patterns.lock().iter_mut() {
            state.matched = false;
        }
    }

    fn all_matched(&self) -> bool {
        self.patterns.lock().iter().all(|state| state.matched)
    }

    /// Feed one output frame through the match table. Flags flip true
    /// monotonically; returns whether every pattern has now matched.
    fn observe(&self, text: &str) -> bool {
        let mut patterns = self.patterns.lock();
        for state in patterns.iter_mut() {
            if !state.matched && state.regex.is_match(text) {
                state.matched = true;
            }
        }
        patterns.iter().all(|state| state.matched)
    }

    fn unmatched_patterns(&self) -> Vec<String> {
        self.patterns
            .lock()
            .iter()
            .filter(|state| !state.matched)
            .map(|state| state.regex.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl WaitStrategy for MultiLogMessageWaitStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        // Vacuously true for an empty pattern set; also short-circuits a
        // strategy already satisfied and not reset since.
        if self.all_matched() {
            tracing::debug!(
                container = %target.container_id(),
                "all log patterns already satisfied, continuing"
            );
            return Ok(());
        }

        let mut stream = target
            .follow_output()
            .await
            .map_err(|e| WaitError::Target(e.to_string()))?;

        let wait_for_all = async {
            while let Some(frame) = stream.next().await {
                let text = frame.utf8();
                tracing::debug!(source = ?frame.source, "{}", text.trim_end_matches('\n'));
                if self.observe(&text) {
                    return;
                }
            }
            futures::future::pending::<()>().await;
        };

        tokio::time::timeout(self.startup_timeout, wait_for_all)
            .await
            .map_err(|_| WaitError::StartupTimeout {
                timeout: self.startup_timeout,
                details: format!(
                    "container {} did not emit output matching all patterns; still unmatched: {:?}",
                    target.container_id(),
                    self.unmatched_patterns()
                ),
            })
    }

    fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    fn set_startup_timeout(&mut self, timeout: Duration) {
        self.startup_timeout = timeout;
    }
}
