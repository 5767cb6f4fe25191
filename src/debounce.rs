//! Quiescence debouncer for settings input

use std::time::{Duration, Instant};

/// Wait applied to bonus form input before recomputing
pub const BONUS_DEBOUNCE: Duration = Duration::from_millis(100);

/// Holds the latest value until no new value has arrived for `window`
///
/// Time is passed in by the caller so the event loop owns the clock.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the quiet period
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((now, value));
    }

    /// Releases the pending value once the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((at, _)) if now.saturating_duration_since(*at) >= self.window => {
                self.pending.take().map(|(_, value)| value)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_latest_value_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(BONUS_DEBOUNCE);

        debouncer.push(1, start);
        debouncer.push(2, start + Duration::from_millis(60));
        assert_eq!(debouncer.poll(start + Duration::from_millis(120)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(160)), Some(2));
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn nothing_pending_yields_nothing() {
        let mut debouncer: Debouncer<u8> = Debouncer::new(BONUS_DEBOUNCE);
        assert_eq!(debouncer.poll(Instant::now()), None);
    }
}
