//! Motion-gated altitude change detector for battery-powered sensor nodes
//!
//! An accelerometer wakes the node, a barometer decides whether something
//! actually fell or was lifted, and an audio alert is played when the
//! altitude change crosses a threshold. Every transition is logged with a
//! relative timestamp and the supply voltage.
//!
//! Key constraints:
//! - Runs without an allocator (`no_std`, `heapless` buffers)
//! - No global state: every component is an owned struct
//! - Hardware reached only through `embedded-hal` traits
//!
//! ## Layers
//!
//! - [`bus`], [`sensors`]: register access to the LSM6DS3 and BMP280
//! - [`motion`]: offset calibration and gravity removal
//! - [`altitude`]: averaged forced-mode pressure reads and the barometric formula
//! - [`machine`]: the event state machine
//! - [`audio`], [`telemetry`], [`battery`], [`indicator`]: outputs
//!
//! ```no_run
//! use dropsense_core::altitude::pressure_to_altitude;
//! use dropsense_core::constants::SEA_LEVEL_PRESSURE_PA;
//!
//! let altitude = pressure_to_altitude(Some(100_129.0), SEA_LEVEL_PRESSURE_PA);
//! assert!(altitude.is_some());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod altitude;
pub mod audio;
pub mod battery;
pub mod bus;
pub mod config;
pub mod constants;
pub mod errors;
pub mod indicator;
pub mod machine;
pub mod motion;
pub mod sensors;
pub mod telemetry;
pub mod time;
pub mod traits;
pub mod types;

// Public API
pub use altitude::{pressure_to_altitude, AltitudeEstimator};
pub use config::DetectorConfig;
pub use errors::{ConfigError, InitError, InitResult, LoopError, PlaybackError, ReadError};
pub use machine::{AbortSignal, EventState, EventStateMachine, MonitoringContext, Peripherals};
pub use motion::MotionFilter;
pub use traits::{ActionTrigger, AltitudeSource, MovementDetector, TelemetrySink, TimeSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
