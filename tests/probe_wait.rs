// ABOUTME: Integration tests for the healthcheck, shell, and finished-container probes.
// ABOUTME: All run on a paused clock; includes the timeout fidelity check.

mod support;

use std::sync::Arc;
use std::time::Duration;
use support::MockTarget;
use vigla::strategy::{
    ContainerFinishedWaitStrategy, DockerHealthcheckWaitStrategy, ShellWaitStrategy,
};
use vigla::{RateLimiter, WaitError, WaitStrategy};

// Per-test limiter: the process-wide shared one would couple parallel
// tests' virtual clocks together.
fn limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::per_second(1))
}

#[tokio::test(start_paused = true)]
async fn healthcheck_completes_when_container_turns_healthy() {
    let target = Arc::new(MockTarget::new());
    let strategy = DockerHealthcheckWaitStrategy::new()
        .with_rate_limiter(limiter())
        .with_startup_timeout(Duration::from_secs(30));

    let flipper = Arc::clone(&target);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        flipper.set_healthy(true);
    });

    strategy
        .wait_until_ready(target.as_ref())
        .await
        .expect("healthy status should complete the wait");
}

#[tokio::test(start_paused = true)]
async fn healthcheck_timeout_matches_the_configured_deadline() {
    let target = MockTarget::new();
    let timeout = Duration::from_secs(2);
    let strategy = DockerHealthcheckWaitStrategy::new()
        .with_rate_limiter(limiter())
        .with_startup_timeout(timeout);

    let started = tokio::time::Instant::now();
    let result = strategy.wait_until_ready(&target).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(WaitError::StartupTimeout { .. })));
    // Not immediately, not indefinitely: within scheduling slack of 2s.
    assert!(elapsed >= timeout, "{:?}", elapsed);
    assert!(elapsed < timeout + Duration::from_millis(500), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn shell_completes_on_zero_exit() {
    let target = MockTarget::new();
    let strategy =
        ShellWaitStrategy::new("test -f /tmp/ready")
        .with_rate_limiter(limiter())
        .with_startup_timeout(Duration::from_secs(5));

    strategy
        .wait_until_ready(&target)
        .await
        .expect("exit code 0 is ready");
}

#[tokio::test(start_paused = true)]
async fn shell_retries_nonzero_exit_until_timeout() {
    let target = MockTarget::new();
    target.set_exec_exit_code(1);

    let strategy =
        ShellWaitStrategy::new("test -f /tmp/ready")
        .with_rate_limiter(limiter())
        .with_startup_timeout(Duration::from_secs(2));

    match strategy.wait_until_ready(&target).await {
        Err(WaitError::StartupTimeout { details, .. }) => {
            assert!(details.contains("test -f /tmp/ready"), "details: {}", details);
        }
        other => panic!("expected StartupTimeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn shell_completes_once_command_starts_succeeding() {
    let target = Arc::new(MockTarget::new());
    target.set_exec_exit_code(127);

    let strategy =
        ShellWaitStrategy::new("curl -sf localhost:8080")
        .with_rate_limiter(limiter())
        .with_startup_timeout(Duration::from_secs(30));

    let flipper = Arc::clone(&target);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(4)).await;
        flipper.set_exec_exit_code(0);
    });

    strategy
        .wait_until_ready(target.as_ref())
        .await
        .expect("command eventually succeeds");
}

#[tokio::test(start_paused = true)]
async fn finished_completes_on_successful_exit() {
    let target = Arc::new(MockTarget::new());
    let strategy =
        ContainerFinishedWaitStrategy::new()
        .with_rate_limiter(limiter())
        .with_startup_timeout(Duration::from_secs(30));

    let stopper = Arc::clone(&target);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        stopper.set_state(false, Some(0));
    });

    strategy
        .wait_until_ready(target.as_ref())
        .await
        .expect("stopped with exit code 0 is ready");
}

#[tokio::test(start_paused = true)]
async fn finished_keeps_polling_after_a_failed_exit() {
    let target = MockTarget::new();
    // Stopped with a failure: not ready, but also not a hard error.
    target.set_state(false, Some(1));

    let timeout = Duration::from_secs(2);
    let strategy = ContainerFinishedWaitStrategy::new()
        .with_rate_limiter(limiter())
        .with_startup_timeout(timeout);

    let started = tokio::time::Instant::now();
    let result = strategy.wait_until_ready(&target).await;

    assert!(matches!(result, Err(WaitError::StartupTimeout { .. })));
    // The failed state must not fail fast; polling continues to the deadline.
    assert!(started.elapsed() >= timeout);
}

#[tokio::test(start_paused = true)]
async fn finished_observes_a_restart_that_eventually_succeeds() {
    let target = Arc::new(MockTarget::new());
    target.set_state(false, Some(1));

    let strategy =
        ContainerFinishedWaitStrategy::new()
        .with_rate_limiter(limiter())
        .with_startup_timeout(Duration::from_secs(30));

    // A restart policy brings the job back and it finishes cleanly.
    let restarter = Arc::clone(&target);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        restarter.set_state(true, None);
        tokio::time::sleep(Duration::from_secs(3)).await;
        restarter.set_state(false, Some(0));
    });

    strategy
        .wait_until_ready(target.as_ref())
        .await
        .expect("second attempt finished successfully");
}

#[tokio::test(start_paused = true)]
async fn running_container_is_not_finished() {
    let target = MockTarget::new();
    let strategy =
        ContainerFinishedWaitStrategy::new()
        .with_rate_limiter(limiter())
        .with_startup_timeout(Duration::from_secs(1));

    let result = strategy.wait_until_ready(&target).await;
    assert!(matches!(result, Err(WaitError::StartupTimeout { .. })));
}
