//! Sensor Component Traits
//!
//! The state machine never talks to a bus. It sees the accelerometer side
//! as a [`MovementDetector`] and the barometer side as an
//! [`AltitudeSource`]; the concrete components
//! ([`MotionFilter`](crate::motion::MotionFilter),
//! [`AltitudeEstimator`](crate::altitude::AltitudeEstimator)) implement
//! these, and tests substitute scripted sensors.
//!
//! Below the estimator sits the [`Barometer`] driver contract: a pressure
//! sensor with a forced (single-shot) mode, oversampling and an IIR filter.

use crate::errors::{InitError, InitResult, ReadError};

/// Produces a boolean "movement detected" signal
pub trait MovementDetector {
    /// Bring up the sensor and calibrate
    fn initialize(&mut self) -> InitResult<()>;

    /// Whether calibration has completed
    fn is_ready(&self) -> bool;

    /// Sample once and decide whether the node is moving
    ///
    /// Advances internal filter state on every call, so callers must call it
    /// at a steady cadence.
    fn check_for_movement(&mut self) -> bool;
}

/// One altitude measurement and the pressure it was derived from
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltitudeReading {
    /// Averaged pressure (Pa)
    pub pressure_pa: f32,
    /// Altitude relative to the sea level reference (m)
    pub altitude_m: f32,
}

/// Produces altitude readings on demand
pub trait AltitudeSource {
    /// Bring up the sensor and leave it asleep
    fn initialize(&mut self) -> InitResult<()>;

    /// Measure pressure and convert it to altitude
    fn read_altitude(&mut self) -> Result<AltitudeReading, ReadError>;
}

/// Oversampling setting of one barometer channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Oversampling {
    /// Channel disabled
    Skip,
    /// ×1
    X1,
    /// ×2
    X2,
    /// ×4
    X4,
    /// ×8
    X8,
    /// ×16
    X16,
}

impl Oversampling {
    /// Number of conversions averaged by the sensor
    pub const fn factor(self) -> u8 {
        match self {
            Oversampling::Skip => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

/// On-chip IIR filter coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IirFilter {
    /// Filter bypassed
    Off,
    /// Coefficient 2
    X2,
    /// Coefficient 4
    X4,
    /// Coefficient 8
    X8,
    /// Coefficient 16
    X16,
}

/// Pressure and temperature oversampling pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OversamplingProfile {
    /// Pressure channel
    pub pressure: Oversampling,
    /// Temperature channel (used for compensation)
    pub temperature: Oversampling,
}

impl OversamplingProfile {
    /// "Standard resolution": pressure ×4, temperature ×1
    pub const STANDARD: Self = Self {
        pressure: Oversampling::X4,
        temperature: Oversampling::X1,
    };
}

/// Pressure sensor driver with a forced measurement mode
pub trait Barometer {
    /// Driver error
    type Error: core::fmt::Debug + Into<InitError> + Into<ReadError>;

    /// Identify the device and load its compensation data
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Apply oversampling and IIR filter settings
    fn configure(
        &mut self,
        profile: OversamplingProfile,
        filter: IirFilter,
    ) -> Result<(), Self::Error>;

    /// Enter the low-power sleep mode
    fn sleep(&mut self) -> Result<(), Self::Error>;

    /// Start exactly one conversion; the device returns to sleep afterwards
    fn force_measurement(&mut self) -> Result<(), Self::Error>;

    /// Worst-case conversion time for the current settings, if known
    fn measurement_wait_ms(&self) -> Option<u32>;

    /// Read the compensated pressure of the last conversion (Pa)
    fn read_pressure(&mut self) -> Result<f32, Self::Error>;
}
