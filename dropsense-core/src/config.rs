//! Detector Configuration
//!
//! Groups the build-time constants from [`constants`](crate::constants) into
//! per-component structs. The defaults are the values flashed on the
//! reference node; the node never reconfigures itself at runtime, but host
//! simulations and tests override individual fields with the `with_*`
//! setters.
//!
//! Each struct is handed to the component that reads it:
//! [`MotionConfig`] to the motion filter, [`BarometerConfig`] to the
//! altitude estimator and [`DetectorConfig`] to the state machine.
//!
//! ```rust
//! use dropsense_core::config::{DetectorConfig, MotionConfig};
//!
//! let motion = MotionConfig::default().with_threshold_mg(120.0);
//! assert!(motion.validate().is_ok());
//!
//! let detector = DetectorConfig::default().with_altitude_threshold_m(0.8);
//! assert!(detector.validate().is_ok());
//! ```

use crate::constants::physics::{ALTITUDE_CHANGE_THRESHOLD_M, SEA_LEVEL_PRESSURE_PA};
use crate::constants::power::{ALERT_ASSET_PATH, LOW_BATTERY_THRESHOLD_V};
use crate::constants::sensors::{
    GRAVITY_FILTER_ALPHA, LSM6DS3_ACCEL_SETTLE_MS, LSM6DS3_ADDRESS,
    LSM6DS3_GYRO_SETTLE_MS, LSM6DS3_SENSITIVITY_MG_PER_LSB, MOTION_THRESHOLD_MG,
    OFFSET_DISCARD_COUNT, OFFSET_SAMPLE_COUNT, OFFSET_SAMPLE_INTERVAL_MS, PRESSURE_AVG_SAMPLES,
    PRESSURE_DEFAULT_WAIT_MS, PRESSURE_SAMPLE_INTERVAL_MS,
};
use crate::constants::time::{
    ACTION_RECOVERY_MS, BATTERY_CHECK_INTERVAL_MS, ERROR_BACKOFF_MS, IDLE_SLEEP_MS,
    MONITOR_TICK_MS, PRESSURE_MONITOR_INTERVAL_MS, PRESSURE_MONITOR_TIMEOUT_MS,
};
use crate::errors::ConfigError;
use crate::traits::{IirFilter, OversamplingProfile};

/// Accelerometer and gravity filter settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionConfig {
    /// Accelerometer bus address
    pub address: u8,
    /// Sensitivity (mg/LSB)
    pub sensitivity_mg_per_lsb: f32,
    /// Samples taken for offset calibration
    pub offset_sample_count: u16,
    /// Leading calibration samples discarded
    pub offset_discard_count: u16,
    /// Delay between calibration samples (ms)
    pub offset_sample_interval_ms: u32,
    /// Gravity estimate smoothing factor, in (0, 1]
    pub gravity_alpha: f32,
    /// Dynamic acceleration that counts as movement (mg)
    pub threshold_mg: f32,
    /// Wait after configuring the accelerometer (ms)
    pub accel_settle_ms: u32,
    /// Wait after powering down the gyroscope (ms)
    pub gyro_settle_ms: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            address: LSM6DS3_ADDRESS,
            sensitivity_mg_per_lsb: LSM6DS3_SENSITIVITY_MG_PER_LSB,
            offset_sample_count: OFFSET_SAMPLE_COUNT,
            offset_discard_count: OFFSET_DISCARD_COUNT,
            offset_sample_interval_ms: OFFSET_SAMPLE_INTERVAL_MS,
            gravity_alpha: GRAVITY_FILTER_ALPHA,
            threshold_mg: MOTION_THRESHOLD_MG,
            accel_settle_ms: LSM6DS3_ACCEL_SETTLE_MS,
            gyro_settle_ms: LSM6DS3_GYRO_SETTLE_MS,
        }
    }
}

impl MotionConfig {
    /// Set the movement threshold (mg)
    pub fn with_threshold_mg(mut self, threshold_mg: f32) -> Self {
        self.threshold_mg = threshold_mg;
        self
    }

    /// Squared movement threshold (mg²)
    pub fn threshold_squared(&self) -> f32 {
        self.threshold_mg * self.threshold_mg
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.gravity_alpha > 0.0 && self.gravity_alpha <= 1.0) {
            return Err(ConfigError::FilterAlpha(self.gravity_alpha));
        }
        if self.offset_sample_count <= self.offset_discard_count {
            return Err(ConfigError::CalibrationWindow {
                count: self.offset_sample_count,
                discard: self.offset_discard_count,
            });
        }
        if !(self.threshold_mg > 0.0) {
            return Err(ConfigError::NonPositive { name: "motion threshold" });
        }
        if !(self.sensitivity_mg_per_lsb > 0.0) {
            return Err(ConfigError::NonPositive { name: "accelerometer sensitivity" });
        }
        Ok(())
    }
}

/// Barometer sampling settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BarometerConfig {
    /// Oversampling applied at start-up
    pub oversampling: OversamplingProfile,
    /// IIR filter applied at start-up
    pub filter: IirFilter,
    /// Forced measurements averaged per reading
    pub samples: u8,
    /// Delay between averaged measurements (ms)
    pub sample_interval_ms: u32,
    /// Conversion wait when the driver cannot compute one (ms)
    pub default_wait_ms: u32,
    /// Sea level reference for altitude conversion (Pa)
    pub sea_level_pa: f32,
}

impl Default for BarometerConfig {
    fn default() -> Self {
        Self {
            oversampling: OversamplingProfile::STANDARD,
            filter: IirFilter::X4,
            samples: PRESSURE_AVG_SAMPLES,
            sample_interval_ms: PRESSURE_SAMPLE_INTERVAL_MS,
            default_wait_ms: PRESSURE_DEFAULT_WAIT_MS,
            sea_level_pa: SEA_LEVEL_PRESSURE_PA,
        }
    }
}

impl BarometerConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::NonPositive { name: "pressure sample count" });
        }
        if !(self.sea_level_pa > 0.0) {
            return Err(ConfigError::NonPositive { name: "sea level pressure" });
        }
        Ok(())
    }
}

/// Main loop timing and decision thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitorConfig {
    /// Interval between altitude checks (ms)
    pub poll_interval_ms: u32,
    /// Monitoring window without a trigger before returning to idle (ms)
    pub timeout_ms: u32,
    /// Altitude change that triggers the alert (m)
    pub altitude_threshold_m: f32,
    /// Low-power wait after an idle poll without movement (ms)
    pub idle_sleep_ms: u32,
    /// Wait between iterations while monitoring and no check is due (ms)
    pub monitor_tick_ms: u32,
    /// Backoff after a loop error (ms)
    pub error_backoff_ms: u32,
    /// Pause after recovering from an unexpected ACTION state (ms)
    pub action_recovery_ms: u32,
    /// Interval between battery checks (ms)
    pub battery_check_interval_ms: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: PRESSURE_MONITOR_INTERVAL_MS,
            timeout_ms: PRESSURE_MONITOR_TIMEOUT_MS,
            altitude_threshold_m: ALTITUDE_CHANGE_THRESHOLD_M,
            idle_sleep_ms: IDLE_SLEEP_MS,
            monitor_tick_ms: MONITOR_TICK_MS,
            error_backoff_ms: ERROR_BACKOFF_MS,
            action_recovery_ms: ACTION_RECOVERY_MS,
            battery_check_interval_ms: BATTERY_CHECK_INTERVAL_MS,
        }
    }
}

impl MonitorConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NonPositive { name: "poll interval" });
        }
        if self.timeout_ms < self.poll_interval_ms {
            return Err(ConfigError::TimeoutTooShort {
                timeout_ms: self.timeout_ms,
                interval_ms: self.poll_interval_ms,
            });
        }
        if !(self.altitude_threshold_m > 0.0) {
            return Err(ConfigError::NonPositive { name: "altitude threshold" });
        }
        Ok(())
    }
}

/// Battery overlay settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatteryConfig {
    /// Supply voltage below which the low-battery overlay is shown (V)
    pub low_threshold_v: f32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            low_threshold_v: LOW_BATTERY_THRESHOLD_V,
        }
    }
}

/// State machine configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    /// Loop timing and thresholds
    pub monitor: MonitorConfig,
    /// Battery overlay
    pub battery: BatteryConfig,
    /// Asset played by the action trigger
    #[cfg_attr(feature = "serde", serde(skip, default = "default_alert_asset"))]
    pub alert_asset: &'static str,
}

#[cfg(feature = "serde")]
fn default_alert_asset() -> &'static str {
    ALERT_ASSET_PATH
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            battery: BatteryConfig::default(),
            alert_asset: ALERT_ASSET_PATH,
        }
    }
}

impl DetectorConfig {
    /// Set the altitude change threshold (m)
    pub fn with_altitude_threshold_m(mut self, threshold_m: f32) -> Self {
        self.monitor.altitude_threshold_m = threshold_m;
        self
    }

    /// Set the poll interval and derive the timeout as five intervals
    pub fn with_poll_interval_ms(mut self, interval_ms: u32) -> Self {
        self.monitor.poll_interval_ms = interval_ms;
        self.monitor.timeout_ms = interval_ms.saturating_mul(5);
        self
    }

    /// Set the asset played on a trigger
    pub fn with_alert_asset(mut self, asset: &'static str) -> Self {
        self.alert_asset = asset;
        self
    }

    /// Check loop timing and thresholds
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_node() {
        let config = DetectorConfig::default();
        assert_eq!(config.monitor.timeout_ms, 5 * config.monitor.poll_interval_ms);
        assert!(config.validate().is_ok());

        let motion = MotionConfig::default();
        assert_eq!(motion.address, 0x6A);
        assert_eq!(motion.threshold_squared(), 150.0 * 150.0);
        assert!(motion.validate().is_ok());
        assert!(BarometerConfig::default().validate().is_ok());
    }

    #[test]
    fn motion_threshold_setter_updates_squared_threshold() {
        let motion = MotionConfig::default().with_threshold_mg(120.0);
        assert_eq!(motion.threshold_squared(), 120.0 * 120.0);
    }

    #[test]
    fn rejects_alpha_outside_unit_interval() {
        let mut config = MotionConfig::default();
        config.gravity_alpha = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::FilterAlpha(0.0)));

        config.gravity_alpha = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_calibration_window() {
        let mut config = MotionConfig::default();
        config.offset_sample_count = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CalibrationWindow { count: 5, discard: 5 })
        ));
    }

    #[test]
    fn poll_interval_setter_keeps_timeout_ratio() {
        let config = DetectorConfig::default().with_poll_interval_ms(200);
        assert_eq!(config.monitor.timeout_ms, 1000);
        assert!(config.validate().is_ok());
    }
}
