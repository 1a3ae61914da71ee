//! Keystroke debouncing.

use std::fmt;
use std::time::{Duration, Instant};

/// Quiet interval used when no delay is configured.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// Delays a value until input has been quiet for a fixed interval.
///
/// At most one entry is ever pending: scheduling a new value replaces the
/// armed one, so only the last value handed to [`schedule`](Self::schedule)
/// within the window comes out of [`take_due`](Self::take_due).
///
/// The debouncer owns no timer thread. The event loop driving it asks for
/// [`deadline`](Self::deadline), sleeps at most that long, then calls
/// [`take_due`](Self::take_due). One instance serves one input stream.
///
/// ```
/// use std::time::{Duration, Instant};
/// use handle_avail::debounce::Debouncer;
///
/// let start = Instant::now();
/// let mut debouncer = Debouncer::new(Duration::from_millis(300));
/// debouncer.schedule_at("a", start);
/// debouncer.schedule_at("al", start + Duration::from_millis(100));
///
/// assert_eq!(debouncer.take_due(start + Duration::from_millis(350)), None);
/// assert_eq!(debouncer.take_due(start + Duration::from_millis(400)), Some("al"));
/// ```
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

struct Pending<T> {
    due: Instant,
    value: T,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet interval.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// The configured quiet interval.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the debouncer with `value`, superseding anything already pending.
    pub fn schedule(&mut self, value: T) {
        self.schedule_at(value, Instant::now());
    }

    /// Like [`schedule`](Self::schedule), measuring the window from `now`.
    pub fn schedule_at(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            due: now + self.delay,
            value,
        });
    }

    /// Disarm without firing, returning the superseded value.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    /// Whether a value is waiting for its window to elapse.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due, if anything is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Take the pending value if its window has elapsed at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(p) if p.due <= now => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }
}

impl<F: FnOnce()> Debouncer<F> {
    /// Invoke the pending callback if it is due. Returns whether it ran.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.take_due(now) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl<T> fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("deadline", &self.deadline())
            .finish()
    }
}
