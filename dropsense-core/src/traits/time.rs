//! Time Source Abstraction for Embedded Systems
//!
//! This module provides the `TimeSource` trait which abstracts the tick
//! counter used by the main loop.
//!
//! ## Design Goals
//!
//! - **Platform Independence**: Works on bare metal, RTOS, and Linux
//! - **Testability**: Easy to mock for deterministic testing
//! - **Efficiency**: Zero allocation, minimal overhead
//!
//! ## Common Implementations
//!
//! - `MonotonicClock`: `std::time::Instant` based, for host builds
//! - `FixedTime`: value set by hand, for unit tests
//! - `SimClock`: shared tick counter that also implements `DelayNs`, so a
//!   simulated node advances time by waiting

use crate::time::Timestamp;

/// Source of time for the system
///
/// All interval arithmetic in the crate is done on differences of two
/// `now()` values, so the epoch is irrelevant.
///
/// ## Implementation Requirements
///
/// - `now()` must never go backwards for the lifetime of the node
/// - Resolution should be documented for each implementation
///
/// ## Example Implementation
///
/// ```rust
/// use dropsense_core::traits::TimeSource;
/// use dropsense_core::time::Timestamp;
///
/// struct TickCounter {
///     ticks: u64,
/// }
///
/// impl TimeSource for TickCounter {
///     fn now(&self) -> Timestamp {
///         self.ticks
///     }
/// }
/// ```
///
/// ## Platform-Specific Considerations
///
/// ### Bare Metal (no_std)
/// - Use a hardware timer peripheral directly
/// - Consider timer overflow and wraparound; widen to 64 bits
///
/// ### Linux/Unix
/// - Use a monotonic clock, never wall time
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
