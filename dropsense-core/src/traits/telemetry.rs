//! Telemetry Traits
//!
//! Every component logs through a [`TelemetrySink`] handed to it at
//! construction. On a single-threaded node one sink is usually shared by
//! everything, which the `&RefCell<T>` forwarding impl makes possible without
//! any global state:
//!
//! ```rust
//! use core::cell::RefCell;
//! use dropsense_core::telemetry::ConsoleSink;
//! use dropsense_core::traits::TelemetrySink;
//!
//! let shared = RefCell::new(ConsoleSink::default());
//! let mut for_motion = &shared;
//! let mut for_machine = &shared;
//!
//! for_motion.record(format_args!("calibrated"));
//! for_machine.record(format_args!("idle"));
//! ```

use core::cell::RefCell;
use core::fmt;

/// Timestamped event log with battery sampling
pub trait TelemetrySink {
    /// Append one event
    fn record(&mut self, message: fmt::Arguments<'_>);

    /// Current supply voltage (V); 0.0 when it cannot be measured
    fn battery_voltage(&mut self) -> f32 {
        0.0
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &mut T {
    fn record(&mut self, message: fmt::Arguments<'_>) {
        (**self).record(message)
    }

    fn battery_voltage(&mut self) -> f32 {
        (**self).battery_voltage()
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &RefCell<T> {
    fn record(&mut self, message: fmt::Arguments<'_>) {
        // A re-entrant record (a sink logging into itself) is dropped.
        if let Ok(mut sink) = self.try_borrow_mut() {
            sink.record(message);
        }
    }

    fn battery_voltage(&mut self) -> f32 {
        self.try_borrow_mut()
            .map(|mut sink| sink.battery_voltage())
            .unwrap_or(0.0)
    }
}

/// Supply voltage measurement that fails soft
pub trait VoltageSource {
    /// Voltage in volts, or 0.0 if the measurement failed
    fn read_voltage(&mut self) -> f32;
}

/// Destination for formatted event log lines
pub trait LogWriter {
    /// Write failure
    type Error: fmt::Debug;

    /// Append one line (without trailing newline)
    fn write_line(&mut self, line: &str) -> Result<(), Self::Error>;
}
