//! Constants for DropSense Core
//!
//! Every tuning value of the node is a named constant in this module. They
//! are fixed at build time; [`DetectorConfig`](crate::config::DetectorConfig)
//! gathers them into defaults that tests and host simulations may override.
//!
//! ## Organization
//!
//! - **Sensors**: bus addresses, registers, calibration and filter parameters
//! - **Physics**: barometric formula and altitude threshold
//! - **Time**: loop intervals, timeouts and backoffs
//! - **Power**: battery sense, audio output and event log
//!
//! Names include units (`_MS`, `_MG`, `_PA`, `_V`).

/// Sensor addresses, registers and sampling parameters.
pub mod sensors;

/// Barometric formula constants.
pub mod physics;

/// Loop intervals and timeouts.
pub mod time;

/// Battery, audio output and log constants.
pub mod power;

pub use physics::{ALTITUDE_CHANGE_THRESHOLD_M, SEA_LEVEL_PRESSURE_PA};
pub use sensors::{BMP280_ADDRESS, LSM6DS3_ADDRESS};
pub use time::{PRESSURE_MONITOR_INTERVAL_MS, PRESSURE_MONITOR_TIMEOUT_MS};
