// ABOUTME: Shared polling loop for wait strategies.
// ABOUTME: Retries a readiness check until success or the startup deadline elapses.

use crate::error::{Result, WaitError};
use std::future::Future;
use std::time::Duration;

/// Delay between check attempts for probes that are not otherwise gated by
/// a rate limiter.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run `check` repeatedly until it reports ready, sleeping `interval`
/// between attempts, all under a single deadline.
///
/// `check` builds a fresh attempt future per call; the future must own its
/// captures (callers hand it plain references, which are `Copy`) so it can
/// cross the `Send` boxing of the strategy trait's async methods.
///
/// The deadline is enforced with `tokio::time::timeout`, which drops the
/// in-flight attempt future when it fires. A check blocked on a socket
/// connect or an HTTP round trip is therefore abandoned promptly at the
/// deadline rather than being allowed to finish its attempt.
///
/// On timeout, `describe` supplies the diagnostic for the resulting
/// [`WaitError::StartupTimeout`].
pub(crate) async fn poll_until_ready<C, F>(
    timeout: Duration,
    interval: Duration,
    mut check: C,
    describe: impl FnOnce() -> String,
) -> Result<()>
where
    C: FnMut() -> F,
    F: Future<Output = bool>,
{
    let polling = async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(interval).await;
        }
    };

    tokio::time::timeout(timeout, polling)
        .await
        .map_err(|_| WaitError::StartupTimeout {
            timeout,
            details: describe(),
        })
}
