//! The shared sample-counter clock.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::SAMPLE_RATE;

/// Monotonic time base derived from samples rendered.
///
/// Advanced exclusively by the block-fill step; every other consumer
/// (scheduling, sync, ping emission) reads it. Cloning shares the counter.
#[derive(Clone, Debug, Default)]
pub struct Sysclock {
    samples: Arc<AtomicU64>,
}

impl Sysclock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `n` rendered samples. Block-fill only.
    pub fn advance(&self, n: u64) {
        self.samples.fetch_add(n, Ordering::Relaxed);
    }

    /// Total samples rendered.
    pub fn now_samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Current time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_samples() * 1000 / SAMPLE_RATE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_monotonically() {
        let clock = Sysclock::new();
        assert_eq!(clock.now_ms(), 0);
        clock.advance(SAMPLE_RATE as u64);
        assert_eq!(clock.now_ms(), 1000);
        clock.advance(SAMPLE_RATE as u64 / 2);
        assert_eq!(clock.now_ms(), 1500);
    }

    #[test]
    fn clones_share_the_counter() {
        let a = Sysclock::new();
        let b = a.clone();
        a.advance(44_100);
        assert_eq!(b.now_ms(), 1000);
    }
}
