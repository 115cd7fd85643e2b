//! Error Types for the Drop Detection Controller
//!
//! ## Design Philosophy
//!
//! Errors follow the same rules as every other hot-path type on the node:
//!
//! 1. **Small Size**: Variants carry a few bytes of context at most.
//! 2. **No Heap Allocation**: Only `&'static str` reasons, never `String`.
//! 3. **Copy Semantics**: Every error is `Copy` so it can be logged and then
//!    returned without cloning.
//!
//! ## Error Categories
//!
//! Errors are split by how far they are allowed to travel:
//!
//! | Type | Raised by | Handling |
//! |------|-----------|----------|
//! | [`InitError`] | sensor bring-up | fatal, the node halts with the indicator off |
//! | [`ReadError`] | a single sensor read | recovered locally, the sample is skipped |
//! | [`PlaybackError`] | the alert output | logged, monitoring resumes |
//! | [`LoopError`] | one main loop iteration | logged, ERROR state, fixed backoff |
//! | [`ConfigError`] | [`DetectorConfig::validate`](crate::config::DetectorConfig::validate) | rejected before start-up |
//!
//! Bus failures are classified with [`embedded_hal::i2c::ErrorKind`] so the
//! error types stay independent of the concrete HAL.

use embedded_hal::i2c::ErrorKind;
use thiserror_no_std::Error;

/// Result type for start-up operations
pub type InitResult<T> = Result<T, InitError>;

/// Fatal start-up failures. Any of these stops forward progress.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum InitError {
    /// Scanning the bus did not find the expected peripheral
    #[error("device 0x{address:02X} not found on bus")]
    DeviceNotFound {
        /// 7-bit address that was expected to answer
        address: u8,
    },

    /// A register read or write failed during bring-up
    #[error("bus error: {0:?}")]
    Bus(ErrorKind),

    /// Peripheral answered but identified as something else
    #[error("unexpected chip id 0x{found:02X} (expected 0x{expected:02X})")]
    WrongChip {
        /// Identifier that should have been read
        expected: u8,
        /// Identifier actually read
        found: u8,
    },

    /// Driver rejected its configuration
    #[error("sensor configuration failed: {reason}")]
    Configuration {
        reason: &'static str,
    },

    /// Offset calibration could not complete
    #[error("calibration failed: {reason}")]
    Calibration {
        reason: &'static str,
    },

    /// Supplied configuration is inconsistent
    #[error("invalid configuration: {0}")]
    Config(ConfigError),
}

impl From<ConfigError> for InitError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl From<ErrorKind> for InitError {
    fn from(kind: ErrorKind) -> Self {
        Self::Bus(kind)
    }
}

impl From<ErrorKind> for ReadError {
    fn from(kind: ErrorKind) -> Self {
        Self::Bus(kind)
    }
}

/// Transient failure of a single measurement
///
/// Never propagated past the component that produced it: the caller logs it
/// and skips the sample or iteration.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ReadError {
    /// Component has not completed initialization
    #[error("sensor not initialized")]
    NotInitialized,

    /// Bus transfer failed
    #[error("bus error: {0:?}")]
    Bus(ErrorKind),

    /// Every sample of an averaged read failed
    #[error("no valid samples ({attempted} attempted)")]
    NoValidSamples {
        /// Number of samples that were attempted
        attempted: u8,
    },

    /// Reading cannot be converted to altitude (non-positive or non-finite)
    #[error("altitude undefined for pressure reading")]
    AltitudeUndefined,

    /// Sensor reported that the conversion was skipped
    #[error("measurement not available")]
    NoData,
}

/// Alert playback failure. Logged by the state machine, never fatal.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PlaybackError {
    /// Asset could not be opened or read
    #[error("asset read failed: {reason}")]
    Source {
        reason: &'static str,
    },

    /// Asset is not a well-formed RIFF/WAVE file
    #[error("invalid WAV file: {reason}")]
    InvalidWav {
        reason: &'static str,
    },

    /// WAV file is valid but cannot be played by this output
    #[error("unsupported audio: {reason}")]
    Unsupported {
        reason: &'static str,
    },

    /// Audio output peripheral failed
    #[error("audio output error: {reason}")]
    Output {
        reason: &'static str,
    },
}

/// Failure inside one iteration of the main loop
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LoopError {
    /// Status indicator pin could not be driven
    #[error("indicator pin error")]
    Indicator,

    /// Loop was stepped before a successful start-up
    #[error("state machine not started")]
    NotStarted,

    /// Start-up failed; the node no longer iterates
    #[error("state machine halted after failed start-up")]
    Halted,
}

/// Inconsistent tuning parameters
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Filter coefficient outside (0, 1]
    #[error("gravity filter alpha {0} outside (0, 1]")]
    FilterAlpha(f32),

    /// Threshold that must be strictly positive is not
    #[error("{name} must be positive")]
    NonPositive {
        name: &'static str,
    },

    /// Calibration would average zero samples
    #[error("offset sample count {count} does not exceed discard window {discard}")]
    CalibrationWindow {
        /// Total samples taken
        count: u16,
        /// Leading samples discarded
        discard: u16,
    },

    /// Monitoring timeout shorter than one poll interval
    #[error("timeout {timeout_ms}ms shorter than poll interval {interval_ms}ms")]
    TimeoutTooShort {
        /// Configured timeout
        timeout_ms: u32,
        /// Configured poll interval
        interval_ms: u32,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for InitError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::DeviceNotFound { address } =>
                defmt::write!(fmt, "Device {=u8:#x} not found", address),
            Self::Bus(kind) =>
                defmt::write!(fmt, "Bus error: {}", kind),
            Self::WrongChip { expected, found } =>
                defmt::write!(fmt, "Chip id {=u8:#x}, expected {=u8:#x}", found, expected),
            Self::Configuration { reason } =>
                defmt::write!(fmt, "Configuration: {}", reason),
            Self::Calibration { reason } =>
                defmt::write!(fmt, "Calibration: {}", reason),
            Self::Config(error) =>
                defmt::write!(fmt, "Config: {}", error),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReadError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NotInitialized => defmt::write!(fmt, "Not initialized"),
            Self::Bus(kind) => defmt::write!(fmt, "Bus error: {}", kind),
            Self::NoValidSamples { attempted } =>
                defmt::write!(fmt, "No valid samples of {}", attempted),
            Self::AltitudeUndefined => defmt::write!(fmt, "Altitude undefined"),
            Self::NoData => defmt::write!(fmt, "No data"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PlaybackError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Source { reason } => defmt::write!(fmt, "Source: {}", reason),
            Self::InvalidWav { reason } => defmt::write!(fmt, "Invalid WAV: {}", reason),
            Self::Unsupported { reason } => defmt::write!(fmt, "Unsupported: {}", reason),
            Self::Output { reason } => defmt::write!(fmt, "Output: {}", reason),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LoopError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Indicator => defmt::write!(fmt, "Indicator pin error"),
            Self::NotStarted => defmt::write!(fmt, "Not started"),
            Self::Halted => defmt::write!(fmt, "Halted"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::FilterAlpha(alpha) => defmt::write!(fmt, "Filter alpha {}", alpha),
            Self::NonPositive { name } => defmt::write!(fmt, "{} must be positive", name),
            Self::CalibrationWindow { count, discard } =>
                defmt::write!(fmt, "Sample count {} <= discard {}", count, discard),
            Self::TimeoutTooShort { timeout_ms, interval_ms } =>
                defmt::write!(fmt, "Timeout {}ms < interval {}ms", timeout_ms, interval_ms),
        }
    }
}
