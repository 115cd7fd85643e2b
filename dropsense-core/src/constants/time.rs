//! Time-Related Constants
//!
//! Intervals and timeouts of the main loop. All values are milliseconds.

// ===== MONITORING =====

/// Interval between altitude checks while monitoring pressure.
pub const PRESSURE_MONITOR_INTERVAL_MS: u32 = 1000;

/// Monitoring window without a trigger before returning to idle.
///
/// Five poll intervals: long enough to follow an object carried down a
/// flight of stairs, short enough to return to low power quickly.
pub const PRESSURE_MONITOR_TIMEOUT_MS: u32 = PRESSURE_MONITOR_INTERVAL_MS * 5;

/// Wait between loop iterations while monitoring and no check is due.
pub const MONITOR_TICK_MS: u32 = 10;

// ===== IDLE AND RECOVERY =====

/// Low-power wait after an idle poll that saw no movement.
pub const IDLE_SLEEP_MS: u32 = 200;

/// Backoff after a main loop error.
pub const ERROR_BACKOFF_MS: u32 = 1000;

/// Pause after recovering from an unexpected ACTION state.
pub const ACTION_RECOVERY_MS: u32 = 100;

/// Sleep period of the halt loop entered after a fatal start-up error.
pub const HALT_SLEEP_MS: u32 = 1000;

// ===== BATTERY =====

/// Interval between battery checks, independent of state.
pub const BATTERY_CHECK_INTERVAL_MS: u32 = 5000;
