//! Altitude Estimation from Barometric Pressure
//!
//! ## Overview
//!
//! The barometer spends almost all of its time asleep. Each altitude read
//! wakes it for a short burst of forced-mode conversions, averages them and
//! converts the mean to altitude with the international barometric formula:
//!
//! ```text
//! h = 44330 · (1 − (p / p0)^(1 / 5.257))
//! ```
//!
//! with `p0` the sea-level reference (101325 Pa by default). Only altitude
//! *differences* matter to the state machine, so an uncalibrated `p0` shifts
//! every reading by the same amount and is harmless.
//!
//! ## Sleep guarantee
//!
//! The sensor is put back to sleep on every exit path of
//! [`AltitudeEstimator::sample_pressure`], including early returns, through a
//! guard that issues the sleep command when dropped.

use core::ops::{Deref, DerefMut};

use embedded_hal::delay::DelayNs;

use crate::config::BarometerConfig;
use crate::constants::physics::{BAROMETRIC_EXPONENT_DIVISOR, BAROMETRIC_SCALE_M};
use crate::errors::{InitError, InitResult, ReadError};
use crate::traits::{AltitudeReading, AltitudeSource, Barometer, TelemetrySink};

/// Convert a pressure reading to altitude above the `sea_level_pa` reference
///
/// Returns `None` when there is no reading or when the formula is undefined
/// for it (non-positive or non-finite pressure, non-positive reference).
///
/// # Example
///
/// ```rust
/// use dropsense_core::altitude::pressure_to_altitude;
///
/// assert_eq!(pressure_to_altitude(Some(101_325.0), 101_325.0), Some(0.0));
/// assert_eq!(pressure_to_altitude(None, 101_325.0), None);
/// assert_eq!(pressure_to_altitude(Some(0.0), 101_325.0), None);
/// ```
pub fn pressure_to_altitude(pressure: Option<f32>, sea_level_pa: f32) -> Option<f32> {
    let p = pressure?;
    if !p.is_finite() || p <= 0.0 || !sea_level_pa.is_finite() || sea_level_pa <= 0.0 {
        return None;
    }
    let ratio = libm::powf(p / sea_level_pa, 1.0 / BAROMETRIC_EXPONENT_DIVISOR);
    Some(BAROMETRIC_SCALE_M * (1.0 - ratio))
}

/// Returns the sensor to sleep when dropped
struct SleepGuard<'a, P: Barometer> {
    sensor: &'a mut P,
}

impl<P: Barometer> Deref for SleepGuard<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.sensor
    }
}

impl<P: Barometer> DerefMut for SleepGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.sensor
    }
}

impl<P: Barometer> Drop for SleepGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.sensor.sleep() {
            log_warn!("barometer did not return to sleep: {:?}", e);
        }
    }
}

/// Averaged forced-mode altitude reader
pub struct AltitudeEstimator<P, S, D> {
    sensor: P,
    sink: S,
    delay: D,
    config: BarometerConfig,
    initialized: bool,
}

impl<P, S, D> AltitudeEstimator<P, S, D>
where
    P: Barometer,
    S: TelemetrySink,
    D: DelayNs,
{
    /// Estimator over an uninitialized barometer driver
    pub fn new(sensor: P, config: BarometerConfig, sink: S, delay: D) -> Self {
        Self {
            sensor,
            sink,
            delay,
            config,
            initialized: false,
        }
    }

    /// Whether [`initialize`](AltitudeSource::initialize) has succeeded
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Barometer settings in use
    pub fn config(&self) -> &BarometerConfig {
        &self.config
    }

    /// Average `samples` forced-mode pressure reads
    ///
    /// Failed reads are logged and left out of the mean. Returns `None` if
    /// every read failed (or `samples` is zero). The sensor is asleep again
    /// when this returns.
    pub fn sample_pressure(&mut self, samples: u8) -> Option<f32> {
        let wait_ms = self
            .sensor
            .measurement_wait_ms()
            .unwrap_or(self.config.default_wait_ms);
        let interval_ms = self.config.sample_interval_ms;

        let mut sensor = SleepGuard {
            sensor: &mut self.sensor,
        };
        let mut total = 0.0f32;
        let mut valid = 0u8;

        for i in 0..samples {
            let reading = sensor.force_measurement().and_then(|_| {
                self.delay.delay_ms(wait_ms);
                sensor.read_pressure()
            });

            match reading {
                Ok(pressure) if pressure.is_finite() => {
                    total += pressure;
                    valid += 1;
                }
                Ok(pressure) => {
                    record!(self.sink, "[Altitude] discarded reading {}", pressure);
                }
                Err(e) => {
                    record!(self.sink, "[Altitude] sample {} failed: {:?}", i + 1, e);
                }
            }

            if i + 1 < samples {
                self.delay.delay_ms(interval_ms);
            }
        }

        if valid == 0 {
            return None;
        }
        Some(total / f32::from(valid))
    }

    /// Give the barometer driver back
    pub fn release(self) -> P {
        self.sensor
    }
}

impl<P, S, D> AltitudeSource for AltitudeEstimator<P, S, D>
where
    P: Barometer,
    S: TelemetrySink,
    D: DelayNs,
{
    fn initialize(&mut self) -> InitResult<()> {
        self.initialized = false;
        let result = self
            .config
            .validate()
            .map_err(InitError::from)
            .and_then(|_| self.sensor.init().map_err(Into::into))
            .and_then(|_| {
                self.sensor
                    .configure(self.config.oversampling, self.config.filter)
                    .map_err(Into::into)
            })
            .and_then(|_| self.sensor.sleep().map_err(Into::into));

        match result {
            Ok(()) => {
                self.initialized = true;
                record!(self.sink, "[Altitude] barometer initialized (forced mode)");
                Ok(())
            }
            Err(error) => {
                record!(self.sink, "[Altitude] initialization failed: {}", error);
                Err(error)
            }
        }
    }

    fn read_altitude(&mut self) -> Result<AltitudeReading, ReadError> {
        if !self.initialized {
            return Err(ReadError::NotInitialized);
        }
        let samples = self.config.samples;
        let pressure_pa = self
            .sample_pressure(samples)
            .ok_or(ReadError::NoValidSamples { attempted: samples })?;
        let altitude_m = pressure_to_altitude(Some(pressure_pa), self.config.sea_level_pa)
            .ok_or(ReadError::AltitudeUndefined)?;
        Ok(AltitudeReading {
            pressure_pa,
            altitude_m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEA_LEVEL: f32 = 101_325.0;

    #[test]
    fn sea_level_is_zero_altitude() {
        let h = pressure_to_altitude(Some(SEA_LEVEL), SEA_LEVEL).unwrap();
        assert!(h.abs() < 1e-3);
    }

    #[test]
    fn hundred_metres_above_sea_level() {
        let h = pressure_to_altitude(Some(100_129.0), SEA_LEVEL).unwrap();
        assert!((h - 100.0).abs() < 1.0, "got {h}");
    }

    #[test]
    fn undefined_inputs_give_none() {
        assert_eq!(pressure_to_altitude(None, SEA_LEVEL), None);
        assert_eq!(pressure_to_altitude(Some(0.0), SEA_LEVEL), None);
        assert_eq!(pressure_to_altitude(Some(-5.0), SEA_LEVEL), None);
        assert_eq!(pressure_to_altitude(Some(f32::NAN), SEA_LEVEL), None);
        assert_eq!(pressure_to_altitude(Some(f32::INFINITY), SEA_LEVEL), None);
        assert_eq!(pressure_to_altitude(Some(SEA_LEVEL), 0.0), None);
    }

    proptest! {
        #[test]
        fn altitude_decreases_with_pressure(p in 30_000.0f32..110_000.0, dp in 10.0f32..5_000.0) {
            let high = pressure_to_altitude(Some(p), SEA_LEVEL).unwrap();
            let low = pressure_to_altitude(Some(p + dp), SEA_LEVEL).unwrap();
            prop_assert!(high > low);
        }
    }
}
