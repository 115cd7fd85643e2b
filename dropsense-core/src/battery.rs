//! Battery Voltage Sensing
//!
//! The supply is measured through a resistive divider on an ADC input:
//!
//! ```text
//! V = raw × 3.3 / 65535 × 3.0
//! ```
//!
//! A failed conversion yields 0.0 V, which [`BatteryMonitor`] treats as
//! "unknown" rather than "low".

use crate::config::BatteryConfig;
use crate::constants::power::{ADC_FULL_SCALE, ADC_REF_VOLTAGE, VOLTAGE_DIVIDER_RATIO};
use crate::traits::VoltageSource;

/// 16-bit ADC channel
pub trait AdcChannel {
    /// Conversion failure
    type Error: core::fmt::Debug;

    /// One conversion, scaled to the full 16-bit range
    fn read_u16(&mut self) -> Result<u16, Self::Error>;
}

/// ADC input behind a voltage divider
#[derive(Debug)]
pub struct AdcVoltageDivider<A> {
    adc: A,
    reference_v: f32,
    ratio: f32,
}

impl<A: AdcChannel> AdcVoltageDivider<A> {
    /// Divider with the reference board's 3.3 V reference and 1:3 ratio
    pub fn new(adc: A) -> Self {
        Self::with_ratio(adc, ADC_REF_VOLTAGE, VOLTAGE_DIVIDER_RATIO)
    }

    /// Divider with an explicit reference and ratio
    pub fn with_ratio(adc: A, reference_v: f32, ratio: f32) -> Self {
        Self {
            adc,
            reference_v,
            ratio,
        }
    }

    /// Convert a raw reading to volts
    pub fn to_volts(&self, raw: u16) -> f32 {
        f32::from(raw) * self.reference_v / ADC_FULL_SCALE * self.ratio
    }

    /// Give the ADC channel back
    pub fn release(self) -> A {
        self.adc
    }
}

impl<A: AdcChannel> VoltageSource for AdcVoltageDivider<A> {
    fn read_voltage(&mut self) -> f32 {
        match self.adc.read_u16() {
            Ok(raw) => self.to_volts(raw),
            Err(e) => {
                log_warn!("battery ADC read failed: {:?}", e);
                0.0
            }
        }
    }
}

/// Change of the low-battery condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryTransition {
    /// Voltage fell below the threshold
    EnteredLow,
    /// Voltage rose back to or above the threshold
    Recovered,
}

/// Tracks the low-battery condition across checks
#[derive(Debug, Clone, Copy)]
pub struct BatteryMonitor {
    threshold_v: f32,
    low: bool,
}

impl BatteryMonitor {
    /// Monitor starting in the "not low" condition
    pub fn new(config: &BatteryConfig) -> Self {
        Self {
            threshold_v: config.low_threshold_v,
            low: false,
        }
    }

    /// Whether `volts` counts as low; 0.0 (unmeasured) never does
    pub fn is_low_voltage(&self, volts: f32) -> bool {
        volts > 0.0 && volts < self.threshold_v
    }

    /// Current condition
    pub fn is_low(&self) -> bool {
        self.low
    }

    /// Fold in a measurement, reporting a change of condition
    pub fn update(&mut self, volts: f32) -> Option<BatteryTransition> {
        let low = self.is_low_voltage(volts);
        if low == self.low {
            return None;
        }
        self.low = low;
        Some(if low {
            BatteryTransition::EnteredLow
        } else {
            BatteryTransition::Recovered
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAdc(Result<u16, ()>);

    impl AdcChannel for FixedAdc {
        type Error = ();

        fn read_u16(&mut self) -> Result<u16, ()> {
            self.0
        }
    }

    #[test]
    fn full_scale_reads_divider_maximum() {
        let mut divider = AdcVoltageDivider::new(FixedAdc(Ok(u16::MAX)));
        assert!((divider.read_voltage() - 9.9).abs() < 1e-4);
    }

    #[test]
    fn failed_conversion_reads_zero() {
        let mut divider = AdcVoltageDivider::new(FixedAdc(Err(())));
        assert_eq!(divider.read_voltage(), 0.0);
    }

    #[test]
    fn transitions_are_reported_once() {
        let mut monitor = BatteryMonitor::new(&BatteryConfig::default());

        assert_eq!(monitor.update(3.9), None);
        assert_eq!(monitor.update(3.4), Some(BatteryTransition::EnteredLow));
        assert_eq!(monitor.update(3.3), None);
        assert_eq!(monitor.update(3.6), Some(BatteryTransition::Recovered));
    }

    #[test]
    fn unmeasured_voltage_is_not_low() {
        let mut monitor = BatteryMonitor::new(&BatteryConfig::default());
        assert_eq!(monitor.update(0.0), None);
        assert!(!monitor.is_low());
    }
}
