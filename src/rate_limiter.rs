// ABOUTME: Constant-throughput rate limiter shared across wait strategy probes.
// ABOUTME: Bounds aggregate call pressure on the container runtime API.

use parking_lot::Mutex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::time::Instant;

/// Default shared limiter: one runtime API call per second across all
/// probes that do not override it.
static SHARED: LazyLock<Arc<RateLimiter>> = LazyLock::new(|| Arc::new(RateLimiter::per_second(1)));

/// A constant-throughput throttle with no bursting.
///
/// Each `acquire` reserves the next free slot and sleeps until it arrives,
/// so concurrent callers are spaced at least `min_interval` apart no matter
/// how many there are.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limiter allowing `ops` operations per second, evenly spaced.
    pub fn per_second(ops: u32) -> Self {
        let ops = ops.max(1);
        Self::with_interval(Duration::from_secs(1) / ops)
    }

    /// Limiter allowing one operation per `min_interval`.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// The process-wide default limiter (1 operation/second).
    pub fn shared() -> Arc<RateLimiter> {
        Arc::clone(&SHARED)
    }

    /// Wait until the next slot is free, then claim it.
    pub async fn acquire(&self) {
        let now = Instant::now();
        let wake = {
            let mut next = self.next_slot.lock();
            let wake = next.map_or(now, |slot| slot.max(now));
            *next = Some(wake + self.min_interval);
            wake
        };
        if wake > now {
            tokio::time::sleep_until(wake).await;
        }
    }
}
