//! Motion Filter: Gravity Removal and Movement Detection
//!
//! ## Overview
//!
//! A resting accelerometer still reads 1 g, split across the axes according
//! to how the node is lying. To detect *movement* rather than orientation the
//! filter tracks the slowly varying gravity component with an exponential
//! low-pass filter and looks only at what is left over:
//!
//! ```text
//! corrected = raw · sensitivity − offset
//! gravity'  = α · corrected + (1 − α) · gravity
//! dynamic   = corrected − gravity'
//! moving    = |dynamic|² > threshold²
//! ```
//!
//! ## Calibration
//!
//! At start-up the filter averages `offset_sample_count` raw samples, minus
//! the first `offset_discard_count` which still carry the power-up
//! transient, to obtain a per-axis bias. The next sample seeds the gravity
//! estimate so the first movement check starts from zero dynamic
//! acceleration. The node must be at rest while this runs.
//!
//! ## Cadence
//!
//! The gravity filter's time constant is expressed in *calls*, not seconds.
//! [`MotionFilter::check_for_movement`] always advances the filter, so it
//! must be called at the steady rate of the idle loop.

use embedded_hal::delay::DelayNs;

use crate::bus::{error_kind, Bus};
use crate::config::MotionConfig;
use crate::errors::{InitError, InitResult};
use crate::sensors::Lsm6ds3;
use crate::traits::{MovementDetector, TelemetrySink};
use crate::types::{RawSample, Vector3};

/// Running per-axis mean of raw samples with a discarded settling window
#[derive(Debug, Clone)]
pub struct OffsetCalibrator {
    discard: u16,
    seen: u16,
    kept: u32,
    sum: [i64; 3],
}

impl OffsetCalibrator {
    /// Calibrator that ignores the first `discard` samples
    pub fn new(discard: u16) -> Self {
        Self {
            discard,
            seen: 0,
            kept: 0,
            sum: [0; 3],
        }
    }

    /// Feed one raw sample
    pub fn push(&mut self, sample: RawSample) {
        self.seen = self.seen.saturating_add(1);
        if self.seen <= self.discard {
            return;
        }
        self.kept += 1;
        self.sum[0] += i64::from(sample.x);
        self.sum[1] += i64::from(sample.y);
        self.sum[2] += i64::from(sample.z);
    }

    /// Samples that contribute to the mean
    pub fn kept(&self) -> u32 {
        self.kept
    }

    /// Mean of the kept samples in physical units, `None` if none were kept
    pub fn finish(&self, sensitivity: f32) -> Option<Vector3> {
        if self.kept == 0 {
            return None;
        }
        let n = self.kept as f32;
        Some(Vector3::new(
            self.sum[0] as f32 / n * sensitivity,
            self.sum[1] as f32 / n * sensitivity,
            self.sum[2] as f32 / n * sensitivity,
        ))
    }
}

/// Exponential low-pass estimate of the gravity vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityFilter {
    alpha: f32,
    gravity: Vector3,
}

impl GravityFilter {
    /// Filter seeded at `initial`
    pub fn new(alpha: f32, initial: Vector3) -> Self {
        Self {
            alpha,
            gravity: initial,
        }
    }

    /// Current gravity estimate
    pub fn gravity(&self) -> Vector3 {
        self.gravity
    }

    /// Fold in one corrected sample and return the dynamic acceleration
    pub fn update(&mut self, corrected: Vector3) -> Vector3 {
        self.gravity = corrected * self.alpha + self.gravity * (1.0 - self.alpha);
        corrected - self.gravity
    }
}

/// Filter state once calibration has succeeded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibrated {
    /// Per-axis bias (mg)
    pub offset: Vector3,
    /// Gravity tracker
    pub filter: GravityFilter,
    /// Dynamic acceleration of the latest sample (mg)
    pub dynamic: Vector3,
}

impl Calibrated {
    /// Process one raw sample; returns whether it exceeds `threshold_sq`
    pub fn process(&mut self, sample: RawSample, sensitivity: f32, threshold_sq: f32) -> bool {
        let corrected = sample.scaled(sensitivity) - self.offset;
        self.dynamic = self.filter.update(corrected);
        self.dynamic.magnitude_squared() > threshold_sq
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FilterState {
    Uninitialized,
    Ready(Calibrated),
}

/// Accelerometer-based movement detector
///
/// Owns its bus handle for the lifetime of the node; [`release`](Self::release)
/// hands it back at shutdown.
pub struct MotionFilter<B, S, D> {
    device: Lsm6ds3<B>,
    sink: S,
    delay: D,
    config: MotionConfig,
    state: FilterState,
}

impl<B, S, D> MotionFilter<B, S, D>
where
    B: Bus,
    S: TelemetrySink,
    D: DelayNs,
{
    /// Uncalibrated filter; no bus traffic until [`initialize`](MovementDetector::initialize)
    pub fn new(bus: B, config: MotionConfig, sink: S, delay: D) -> Self {
        Self {
            device: Lsm6ds3::new(bus, config.address),
            sink,
            delay,
            config,
            state: FilterState::Uninitialized,
        }
    }

    /// Calibration result, `None` before initialization
    pub fn calibration(&self) -> Option<&Calibrated> {
        match &self.state {
            FilterState::Ready(calibrated) => Some(calibrated),
            FilterState::Uninitialized => None,
        }
    }

    /// Per-axis bias (mg), once calibrated
    pub fn offset(&self) -> Option<Vector3> {
        self.calibration().map(|c| c.offset)
    }

    /// Gravity estimate (mg), once calibrated
    pub fn gravity(&self) -> Option<Vector3> {
        self.calibration().map(|c| c.filter.gravity())
    }

    /// Dynamic acceleration of the latest sample (mg), once calibrated
    pub fn dynamic_acceleration(&self) -> Option<Vector3> {
        self.calibration().map(|c| c.dynamic)
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.device.release()
    }

    fn configure_device(&mut self) -> InitResult<()> {
        let present = self
            .device
            .is_present()
            .map_err(|e| InitError::Bus(error_kind(&e)))?;
        if !present {
            return Err(InitError::DeviceNotFound {
                address: self.device.address(),
            });
        }

        self.device
            .configure_accelerometer()
            .map_err(|e| InitError::Bus(error_kind(&e)))?;
        self.delay.delay_ms(self.config.accel_settle_ms);
        self.device
            .disable_gyroscope()
            .map_err(|e| InitError::Bus(error_kind(&e)))?;
        self.delay.delay_ms(self.config.gyro_settle_ms);
        record!(self.sink, "[MotionFilter] registers configured (gyro disabled)");
        Ok(())
    }

    fn calibrate(&mut self) -> InitResult<Calibrated> {
        record!(self.sink, "[MotionFilter] offset calibration started");
        let mut calibrator = OffsetCalibrator::new(self.config.offset_discard_count);
        for _ in 0..self.config.offset_sample_count {
            let sample = self.device.read_raw().map_err(|e| {
                log_warn!("calibration read failed: {:?}", e);
                InitError::Calibration {
                    reason: "accelerometer read failed",
                }
            })?;
            calibrator.push(sample);
            self.delay.delay_ms(self.config.offset_sample_interval_ms);
        }

        let sensitivity = self.config.sensitivity_mg_per_lsb;
        let offset = calibrator.finish(sensitivity).ok_or(InitError::Calibration {
            reason: "no samples after settling window",
        })?;
        record!(
            self.sink,
            "[MotionFilter] offset x={:.2} y={:.2} z={:.2} mg ({} samples)",
            offset.x,
            offset.y,
            offset.z,
            calibrator.kept()
        );

        let seed = self.device.read_raw().map_err(|_| InitError::Calibration {
            reason: "gravity seed read failed",
        })?;
        let initial = seed.scaled(sensitivity) - offset;
        record!(self.sink, "[MotionFilter] gravity filter seeded");
        Ok(Calibrated {
            offset,
            filter: GravityFilter::new(self.config.gravity_alpha, initial),
            dynamic: Vector3::ZERO,
        })
    }
}

impl<B, S, D> MovementDetector for MotionFilter<B, S, D>
where
    B: Bus,
    S: TelemetrySink,
    D: DelayNs,
{
    fn initialize(&mut self) -> InitResult<()> {
        self.state = FilterState::Uninitialized;
        let result = self
            .config
            .validate()
            .map_err(InitError::from)
            .and_then(|_| self.configure_device())
            .and_then(|_| self.calibrate());

        match result {
            Ok(calibrated) => {
                self.state = FilterState::Ready(calibrated);
                record!(self.sink, "[MotionFilter] initialized (accelerometer only)");
                Ok(())
            }
            Err(error) => {
                record!(self.sink, "[MotionFilter] initialization failed: {}", error);
                Err(error)
            }
        }
    }

    fn is_ready(&self) -> bool {
        matches!(self.state, FilterState::Ready(_))
    }

    fn check_for_movement(&mut self) -> bool {
        let FilterState::Ready(mut calibrated) = self.state else {
            record!(self.sink, "[MotionFilter] not initialized");
            return false;
        };

        let sample = match self.device.read_raw() {
            Ok(sample) => sample,
            Err(e) => {
                record!(self.sink, "[MotionFilter] read failed: {:?}", error_kind(&e));
                return false;
            }
        };

        let moving = calibrated.process(
            sample,
            self.config.sensitivity_mg_per_lsb,
            self.config.threshold_squared(),
        );
        self.state = FilterState::Ready(calibrated);
        if moving {
            log_debug!(
                "movement: |a_dyn| = {:.1} mg (threshold {} mg)",
                calibrated.dynamic.magnitude(),
                self.config.threshold_mg
            );
        }
        moving
    }
}
