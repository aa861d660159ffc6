use std::sync::atomic::{AtomicI64, Ordering};

use rust_extensions::date_time::DateTimeAsMicroseconds;

pub trait MetricsClock: Send + Sync {
    /// Milliseconds since an arbitrary but fixed origin.
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl MetricsClock for SystemClock {
    fn now_ms(&self) -> i64 {
        DateTimeAsMicroseconds::now().unix_microseconds / 1000
    }
}

/// Clock which only moves when told to. Used to replay event streams with exact timings.
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl MetricsClock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn elapsed_ms(now: i64, since: i64) -> u64 {
    if now <= since {
        return 0;
    }

    (now - since) as u64
}
