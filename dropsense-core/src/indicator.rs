//! Status indicator LED
//!
//! Lit while the node is monitoring pressure or playing an alert, dark
//! otherwise. A low battery overlays its own signal (dark) without changing
//! the machine's state; when the battery recovers the pin is restored to
//! whatever the current state calls for.

use embedded_hal::digital::OutputPin;

use crate::errors::LoopError;
use crate::machine::EventState;

/// Indicator pin driven from the event state
pub struct Indicator<P> {
    pin: P,
    state_level: bool,
    low_battery: bool,
}

impl<P: OutputPin> Indicator<P> {
    /// Indicator over `pin`; the pin is not touched until first shown
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            state_level: false,
            low_battery: false,
        }
    }

    /// Drive the pin for `state`
    pub fn show(&mut self, state: EventState) -> Result<(), LoopError> {
        self.state_level = state.indicator_on();
        self.drive(self.state_level)
    }

    /// Apply or lift the low-battery overlay
    pub fn set_low_battery(&mut self, low: bool) -> Result<(), LoopError> {
        self.low_battery = low;
        if low {
            self.drive(false)
        } else {
            self.drive(self.state_level)
        }
    }

    /// Whether the low-battery overlay is applied
    pub fn low_battery(&self) -> bool {
        self.low_battery
    }

    /// Level the current state calls for
    pub fn state_level(&self) -> bool {
        self.state_level
    }

    /// Turn the pin off regardless of state
    pub fn off(&mut self) -> Result<(), LoopError> {
        self.state_level = false;
        self.drive(false)
    }

    /// Underlying pin
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Give the pin back
    pub fn release(self) -> P {
        self.pin
    }

    fn drive(&mut self, on: bool) -> Result<(), LoopError> {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| {
            log_warn!("indicator pin error: {:?}", e);
            LoopError::Indicator
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Default)]
    struct Led {
        high: bool,
        writes: usize,
    }

    impl ErrorType for Led {
        type Error = Infallible;
    }

    impl OutputPin for Led {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn lit_only_while_monitoring_or_acting() {
        let mut indicator = Indicator::new(Led::default());
        for (state, lit) in [
            (EventState::Init, false),
            (EventState::Idle, false),
            (EventState::MonitoringPressure, true),
            (EventState::Action, true),
            (EventState::Error, false),
        ] {
            indicator.show(state).unwrap();
            assert_eq!(indicator.pin().high, lit, "{state:?}");
        }
    }

    #[test]
    fn recovery_restores_state_level() {
        let mut indicator = Indicator::new(Led::default());
        indicator.show(EventState::MonitoringPressure).unwrap();

        indicator.set_low_battery(true).unwrap();
        assert!(!indicator.pin().high);

        indicator.set_low_battery(false).unwrap();
        assert!(indicator.pin().high);
    }
}
