use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Time source for the panel. Monotonic milliseconds drive timers and
/// flags; wall time stamps snapshots.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Backed by tokio's clock so paused-time tests stay deterministic.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
