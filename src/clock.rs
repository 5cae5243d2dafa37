//! Virtual clock and timers
//!
//! Controllers never start platform timers themselves. They hold [`Ticker`]s
//! (fixed-period repeating) and [`Deadline`]s (one-shot) measured against an
//! injected [`Clock`], and a host drives them by calling `poll()` often enough
//! (the browser demo polls every 50 ms). Tests use [`ManualClock`] to step
//! time deterministically.
//!
//! ```rust
//! use pronunciation_guide::clock::{Clock, ManualClock, Ticker};
//!
//! let clock = ManualClock::new();
//! let mut ticker = Ticker::new(100);
//! ticker.start(clock.now_ms());
//!
//! clock.advance(250);
//! assert_eq!(ticker.due(clock.now_ms()), 2);
//! ```

use std::cell::Cell;
use std::rc::Rc;

/// Milliseconds on a monotonic clock
pub type Millis = u64;

/// Monotonic millisecond time source
pub trait Clock {
    /// Current time in milliseconds since an arbitrary origin
    fn now_ms(&self) -> Millis;
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}

/// Manually stepped clock
///
/// Clones share the same time, so a test keeps one handle and gives another
/// to the controller under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    /// Create a clock at time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock at the given time
    #[must_use]
    pub fn at(now: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    /// Move time forward
    pub fn advance(&self, ms: Millis) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    /// Jump to an absolute time (never moves backwards)
    pub fn set(&self, now: Millis) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// Wall clock backed by `std::time::Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Fixed-period repeating timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    period: Millis,
    next_due: Option<Millis>,
}

impl Ticker {
    /// Create a stopped ticker; a zero period is treated as 1 ms
    #[must_use]
    pub fn new(period: Millis) -> Self {
        Self {
            period: period.max(1),
            next_due: None,
        }
    }

    /// Tick period in milliseconds
    #[must_use]
    pub const fn period(&self) -> Millis {
        self.period
    }

    /// (Re)start the ticker; the first tick is one period after `now`
    pub fn start(&mut self, now: Millis) {
        self.next_due = Some(now.saturating_add(self.period));
    }

    /// Stop the ticker, discarding any pending ticks
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Whether the ticker is running
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Consume and count the ticks that have elapsed by `now`
    ///
    /// A host that polls late still observes every tick, so simulated progress
    /// never skips ahead of the tick count.
    pub fn due(&mut self, now: Millis) -> u32 {
        let Some(next) = self.next_due else {
            return 0;
        };
        if now < next {
            return 0;
        }
        let ticks = (now - next) / self.period + 1;
        self.next_due = Some(next + ticks * self.period);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

/// One-shot timer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deadline {
    due: Option<Millis>,
}

impl Deadline {
    /// Create a disarmed deadline
    #[must_use]
    pub const fn new() -> Self {
        Self { due: None }
    }

    /// Arm the deadline to fire `after` ms from `now`
    pub fn arm(&mut self, now: Millis, after: Millis) {
        self.due = Some(now.saturating_add(after));
    }

    /// Disarm without firing
    pub fn disarm(&mut self) {
        self.due = None;
    }

    /// Whether the deadline is armed
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    /// Returns true exactly once, the first time `now` reaches the deadline
    pub fn fire(&mut self, now: Millis) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // ManualClock
    // =========================================================================

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        clock.advance(1500);
        assert_eq!(handle.now_ms(), 1500);
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::at(1000);
        clock.set(500);
        assert_eq!(clock.now_ms(), 1000);
        clock.set(2000);
        assert_eq!(clock.now_ms(), 2000);
    }

    #[test]
    fn test_clock_through_rc() {
        let clock = Rc::new(ManualClock::at(42));
        assert_eq!(clock.now_ms(), 42);
    }

    // =========================================================================
    // Ticker
    // =========================================================================

    #[test]
    fn test_ticker_stopped_by_default() {
        let mut ticker = Ticker::new(100);
        assert!(!ticker.is_running());
        assert_eq!(ticker.due(10_000), 0);
    }

    #[test]
    fn test_ticker_first_tick_after_one_period() {
        let mut ticker = Ticker::new(100);
        ticker.start(0);
        assert_eq!(ticker.due(99), 0);
        assert_eq!(ticker.due(100), 1);
        assert_eq!(ticker.due(150), 0);
        assert_eq!(ticker.due(200), 1);
    }

    #[test]
    fn test_ticker_counts_missed_ticks() {
        let mut ticker = Ticker::new(1000);
        ticker.start(500);
        assert_eq!(ticker.due(3_600), 3);
        assert_eq!(ticker.due(4_499), 0);
        assert_eq!(ticker.due(4_500), 1);
    }

    #[test]
    fn test_ticker_stop_discards_pending() {
        let mut ticker = Ticker::new(100);
        ticker.start(0);
        ticker.stop();
        assert_eq!(ticker.due(1_000), 0);
    }

    #[test]
    fn test_ticker_zero_period_clamped() {
        let ticker = Ticker::new(0);
        assert_eq!(ticker.period(), 1);
    }

    // =========================================================================
    // Deadline
    // =========================================================================

    #[test]
    fn test_deadline_fires_once() {
        let mut deadline = Deadline::new();
        deadline.arm(0, 3000);
        assert!(!deadline.fire(2999));
        assert!(deadline.fire(3000));
        assert!(!deadline.fire(5000));
        assert!(!deadline.is_armed());
    }

    #[test]
    fn test_deadline_disarm() {
        let mut deadline = Deadline::new();
        deadline.arm(100, 100);
        deadline.disarm();
        assert!(!deadline.fire(10_000));
    }
}
