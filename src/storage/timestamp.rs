//! Monotonic write-timestamp generator
//!
//! Microseconds since the epoch, strictly increasing even when the wall clock stalls
//! or steps backwards.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default)]
pub struct MonotonicTimestamps {
    last: AtomicI64,
}

impl MonotonicTimestamps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after `last` (e.g. the highest timestamp found in a snapshot)
    pub fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }

    pub fn next(&self) -> i64 {
        let now = Self::wall_clock_micros();
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            let candidate = if now > current { now } else { current + 1 };
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn last(&self) -> i64 {
        self.last.load(Ordering::Acquire)
    }

    fn wall_clock_micros() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_strictly_increasing() {
        let clock = MonotonicTimestamps::new();
        let mut previous = clock.next();
        for _ in 0..1000 {
            let next = clock.next();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_starting_after_future_value() {
        let far_future = i64::MAX / 2;
        let clock = MonotonicTimestamps::starting_after(far_future);
        assert_eq!(clock.next(), far_future + 1);
    }

    #[test]
    fn test_concurrent_uniqueness() {
        let clock = Arc::new(MonotonicTimestamps::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || (0..500).map(|_| clock.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
