//! Rolling latency instrumentation for session creation and close.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Fixed-capacity ring of the most recent operation durations.
///
/// `record` writes at an atomically advanced cursor; `average_ms` is a
/// plain mean over the whole buffer, including zero-initialized slots
/// before the ring first wraps. This is an approximate diagnostic
/// metric: reads may observe a half-updated window and the cold-start
/// bias is accepted, so no locking is taken on either path.
pub struct RollingLatency {
    slots: Box<[AtomicU64]>,
    cursor: AtomicUsize,
}

impl RollingLatency {
    /// Create a tracker remembering the last `window` durations.
    ///
    /// A zero window is rounded up to one slot.
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        let slots = (0..window).map(|_| AtomicU64::new(0)).collect();
        Self {
            slots,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Record one operation duration, overwriting the oldest slot.
    pub fn record(&self, duration: Duration) {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        self.slots[index].store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Mean duration in milliseconds over the whole window.
    #[must_use]
    pub fn average_ms(&self) -> f64 {
        let sum: u64 = self.slots.iter().map(|slot| slot.load(Ordering::Relaxed)).sum();
        sum as f64 / self.slots.len() as f64
    }

    /// Number of slots in the window.
    #[must_use]
    pub fn window(&self) -> usize {
        self.slots.len()
    }
}
