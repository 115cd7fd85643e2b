//! Time management for the node
//!
//! Provides clock implementations for the [`TimeSource`] trait:
//! - Monotonic host clock (when `std` is available)
//! - Fixed clock (for unit tests)
//! - Simulated clock that advances when the node waits
//!
//! The main loop measures every interval as the saturating difference of two
//! timestamps, see [`elapsed_ms`].

use core::cell::Cell;

use embedded_hal::delay::DelayNs;

pub use crate::traits::TimeSource;

/// Timestamp in milliseconds since an arbitrary epoch (usually boot)
pub type Timestamp = u64;

/// Milliseconds elapsed from `earlier` to `later`
///
/// Saturates at zero if the clock appears to run backwards.
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

/// Monotonic time source backed by `std::time::Instant`
///
/// Starts at 0 when created.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Start a clock at zero
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.start.elapsed().as_millis() as Timestamp
    }
}

/// Blocking delay for host builds, backed by `std::thread::sleep`
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

#[cfg(feature = "std")]
impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Create a clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute timestamp
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `ms`
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Simulated clock over a shared tick counter
///
/// Copies share the same counter. Waiting through the [`DelayNs`] impl
/// advances the counter instead of blocking, so a whole node can run against
/// simulated time on the host:
///
/// ```rust
/// use core::cell::Cell;
/// use dropsense_core::time::{SimClock, TimeSource};
/// use embedded_hal::delay::DelayNs;
///
/// let ticks = Cell::new(0);
/// let clock = SimClock::new(&ticks);
/// let mut delay = clock;
///
/// delay.delay_ms(250);
/// assert_eq!(clock.now(), 250);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SimClock<'a> {
    ticks: &'a Cell<Timestamp>,
}

impl<'a> SimClock<'a> {
    /// Create a clock over `ticks`
    pub fn new(ticks: &'a Cell<Timestamp>) -> Self {
        Self { ticks }
    }

    /// Move forward by `ms` without going through a delay
    pub fn advance(&self, ms: u64) {
        self.ticks.set(self.ticks.get() + ms);
    }
}

impl TimeSource for SimClock<'_> {
    fn now(&self) -> Timestamp {
        self.ticks.get()
    }
}

impl DelayNs for SimClock<'_> {
    fn delay_ns(&mut self, ns: u32) {
        // Sub-millisecond waits are rounded up so that no wait is free.
        self.advance(u64::from(ns.div_ceil(1_000_000)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_advances() {
        let mut time = FixedTime::new(1000);
        assert_eq!(time.now(), 1000);

        time.advance(500);
        assert_eq!(time.now(), 1500);
    }

    #[test]
    fn elapsed_saturates_backwards() {
        assert_eq!(elapsed_ms(1000, 1500), 500);
        assert_eq!(elapsed_ms(1500, 1000), 0);
    }

    #[test]
    fn sim_clock_copies_share_ticks() {
        let ticks = Cell::new(0);
        let clock = SimClock::new(&ticks);
        let mut delay = clock;

        delay.delay_ms(20);
        delay.delay_us(10);
        assert_eq!(clock.now(), 21);
    }
}
