//! Timer-reset debouncing.
//!
//! Each pushed event replaces the pending one and restarts the quiet period.
//! The pending event becomes ready only once the quiet period elapses with no
//! further pushes.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Collapses bursts of events into the last one
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    /// Latest event and the time it arrived
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an event, replacing any pending one and restarting the timer
    pub fn push(&mut self, event: T, now: Instant) {
        if self.pending.is_some() {
            trace!("Debounce reset ({:?})", self.delay);
        }
        self.pending = Some((event, now));
    }

    /// When the pending event fires if nothing else arrives
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    /// Take the pending event if its quiet period has elapsed
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.pending.take().map(|(event, _)| event),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    #[test]
    fn test_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.push("a", start);
        assert_eq!(debouncer.take_ready(start + Duration::from_millis(99)), None);
        assert_eq!(debouncer.take_ready(start + DELAY), Some("a"));
        // Fires once
        assert_eq!(debouncer.take_ready(start + DELAY * 2), None);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_push_resets_timer_and_keeps_latest() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.push(1, start);
        debouncer.push(2, start + Duration::from_millis(60));
        debouncer.push(3, start + Duration::from_millis(120));

        assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(220)));
        assert_eq!(debouncer.take_ready(start + Duration::from_millis(200)), None);
        assert_eq!(debouncer.take_ready(start + Duration::from_millis(220)), Some(3));
    }
}
