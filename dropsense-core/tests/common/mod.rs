//! Common test utilities for integration tests
//!
//! This module provides:
//! - Scripted stand-ins for every component the state machine drives
//! - A simulated I2C controller with LSM6DS3 and BMP280 register maps
//! - Altitude and acceleration profile generators
//!
//! Time is simulated: every wait advances a shared tick counter, so whole
//! monitoring windows run in microseconds.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use dropsense_core::{
    errors::{InitError, PlaybackError, ReadError},
    machine::{EventStateMachine, Peripherals},
    time::SimClock,
    traits::{
        ActionTrigger, AltitudeReading, AltitudeSource, MovementDetector, TelemetrySink,
    },
    DetectorConfig,
};
use embedded_hal::digital::{ErrorKind as PinErrorKind, ErrorType, OutputPin};

pub mod generators;
pub mod i2c;

use generators::pressure_at_altitude;

/// Movement detector that replays a script, then repeats a fallback
pub struct ScriptedMotion {
    script: VecDeque<bool>,
    fallback: bool,
    init_result: Result<(), InitError>,
    ready: bool,
    pub checks: usize,
}

impl ScriptedMotion {
    pub fn new(script: &[bool]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            fallback: false,
            init_result: Ok(()),
            ready: false,
            checks: 0,
        }
    }

    pub fn always_moving() -> Self {
        Self::new(&[]).with_fallback(true)
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn failing_init(error: InitError) -> Self {
        Self {
            init_result: Err(error),
            ..Self::new(&[])
        }
    }
}

impl MovementDetector for ScriptedMotion {
    fn initialize(&mut self) -> Result<(), InitError> {
        self.ready = self.init_result.is_ok();
        self.init_result
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn check_for_movement(&mut self) -> bool {
        self.checks += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

/// Altitude source that replays a script of readings, then repeats a fallback
pub struct ScriptedAltitude {
    script: VecDeque<Result<f32, ReadError>>,
    fallback: Result<f32, ReadError>,
    init_result: Result<(), InitError>,
    pub reads: usize,
}

impl ScriptedAltitude {
    pub fn new(script: &[Result<f32, ReadError>]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            fallback: Err(ReadError::NoValidSamples { attempted: 3 }),
            init_result: Ok(()),
            reads: 0,
        }
    }

    pub fn steady(altitude_m: f32) -> Self {
        Self::new(&[]).with_fallback(Ok(altitude_m))
    }

    pub fn with_fallback(mut self, fallback: Result<f32, ReadError>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn failing_init(error: InitError) -> Self {
        Self {
            init_result: Err(error),
            ..Self::new(&[])
        }
    }
}

impl AltitudeSource for ScriptedAltitude {
    fn initialize(&mut self) -> Result<(), InitError> {
        self.init_result
    }

    fn read_altitude(&mut self) -> Result<AltitudeReading, ReadError> {
        self.reads += 1;
        let altitude_m = self.script.pop_front().unwrap_or(self.fallback)?;
        Ok(AltitudeReading {
            pressure_pa: pressure_at_altitude(altitude_m),
            altitude_m,
        })
    }
}

/// Action trigger that records every asset it is asked to play
#[derive(Default)]
pub struct RecordingAction {
    pub played: Vec<String>,
    pub result: Option<PlaybackError>,
}

impl ActionTrigger for RecordingAction {
    fn play(&mut self, asset: &str) -> Result<(), PlaybackError> {
        self.played.push(asset.to_string());
        match self.result {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Event log that keeps every message in memory
#[derive(Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
    pub voltage: f32,
}

impl RecordingSink {
    pub fn with_voltage(voltage: f32) -> Self {
        Self {
            lines: Vec::new(),
            voltage,
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines.iter().filter(|line| line.contains(needle)).count()
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&mut self, message: fmt::Arguments<'_>) {
        self.lines.push(message.to_string());
    }

    fn battery_voltage(&mut self) -> f32 {
        self.voltage
    }
}

/// Shared level and fault injection for [`MockPin`]
#[derive(Default)]
pub struct PinState {
    pub high: Cell<bool>,
    pub writes: Cell<usize>,
    pub fail_next: Cell<usize>,
}

/// Indicator pin backed by a [`PinState`] the test keeps hold of
pub struct MockPin<'a>(pub &'a PinState);

#[derive(Debug)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> PinErrorKind {
        PinErrorKind::Other
    }
}

impl ErrorType for MockPin<'_> {
    type Error = PinFault;
}

impl MockPin<'_> {
    fn set(&mut self, high: bool) -> Result<(), PinFault> {
        let state = self.0;
        if state.fail_next.get() > 0 {
            state.fail_next.set(state.fail_next.get() - 1);
            return Err(PinFault);
        }
        state.high.set(high);
        state.writes.set(state.writes.get() + 1);
        Ok(())
    }
}

impl OutputPin for MockPin<'_> {
    fn set_low(&mut self) -> Result<(), PinFault> {
        self.set(false)
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        self.set(true)
    }
}

/// State machine over scripted components and simulated time
pub type TestMachine<'a> = EventStateMachine<
    ScriptedMotion,
    ScriptedAltitude,
    RecordingAction,
    &'a RefCell<RecordingSink>,
    MockPin<'a>,
    SimClock<'a>,
    SimClock<'a>,
>;

/// Shared state a test machine runs against
#[derive(Default)]
pub struct Bench {
    pub ticks: Cell<u64>,
    pub sink: RefCell<RecordingSink>,
    pub pin: PinState,
}

impl Bench {
    pub fn now(&self) -> u64 {
        self.ticks.get()
    }

    pub fn logged(&self, needle: &str) -> bool {
        self.sink.borrow().contains(needle)
    }

    pub fn set_voltage(&self, volts: f32) {
        self.sink.borrow_mut().voltage = volts;
    }

    pub fn led(&self) -> bool {
        self.pin.high.get()
    }
}

/// Build a machine over scripted components
pub fn machine<'a>(
    bench: &'a Bench,
    motion: ScriptedMotion,
    altitude: ScriptedAltitude,
    config: DetectorConfig,
) -> TestMachine<'a> {
    machine_with_action(bench, motion, altitude, RecordingAction::default(), config)
}

/// Build a machine with a prepared action trigger
pub fn machine_with_action<'a>(
    bench: &'a Bench,
    motion: ScriptedMotion,
    altitude: ScriptedAltitude,
    action: RecordingAction,
    config: DetectorConfig,
) -> TestMachine<'a> {
    let clock = SimClock::new(&bench.ticks);
    EventStateMachine::new(
        Peripherals {
            motion,
            altitude,
            action,
            sink: &bench.sink,
            indicator: MockPin(&bench.pin),
            clock,
            delay: clock,
        },
        config,
    )
}

/// Step until `done` holds or `max_steps` is reached; returns steps taken
pub fn step_until(
    machine: &mut TestMachine<'_>,
    max_steps: usize,
    mut done: impl FnMut(&TestMachine<'_>) -> bool,
) -> usize {
    for n in 0..max_steps {
        if done(machine) {
            return n;
        }
        if let Err(e) = machine.step() {
            machine.recover(e);
        }
    }
    max_steps
}
