use std::time::{Duration, Instant};

/// Default time a "copied" marker stays visible.
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(900);

/// Single-slot deferred reset.
///
/// At most one reset is pending. Scheduling a new one replaces the old one,
/// which the caller should then reset right away. The owner drives it by
/// calling [`FeedbackTimer::poll`] from its event loop.
#[derive(Debug, Clone)]
pub struct FeedbackTimer<K> {
    delay: Duration,
    pending: Option<(K, Instant)>,
}

impl<K> Default for FeedbackTimer<K> {
    fn default() -> Self {
        FeedbackTimer::new(DEFAULT_FEEDBACK_DELAY)
    }
}

impl<K> FeedbackTimer<K> {
    pub fn new(delay: Duration) -> Self {
        FeedbackTimer {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm a reset for `key` at `now + delay`. Returns the key it displaced.
    pub fn schedule(&mut self, key: K, now: Instant) -> Option<K> {
        self.pending
            .replace((key, now + self.delay))
            .map(|(old, _)| old)
    }

    /// Drop the pending reset without firing it.
    pub fn cancel(&mut self) -> Option<K> {
        self.pending.take().map(|(key, _)| key)
    }

    pub fn pending(&self) -> Option<&K> {
        self.pending.as_ref().map(|(key, _)| key)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Fire the pending reset if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<K> {
        match &self.pending {
            Some((_, at)) if now >= *at => self.pending.take().map(|(key, _)| key),
            _ => None,
        }
    }
}
