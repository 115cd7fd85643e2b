//! Event State Machine
//!
//! ## Overview
//!
//! The orchestrator of the node. It sequences the two sensor components and
//! the alert output through a small set of states:
//!
//! ```text
//!            start() ok                  movement + altitude read
//!   INIT ───────────────▶ IDLE ─────────────────────────────▶ MONITORING_PRESSURE
//!    │                     ▲                                     │        ▲
//!    │ start() failed      │ timeout                             │ |Δh| ≥ threshold
//!    ▼                     └─────────────────────────────────────┤        │
//!  ERROR (halt)                                                  ▼        │
//!                                                              ACTION ────┘
//!                                                        (blocking playback)
//! ```
//!
//! A failed iteration drops the machine into `ERROR`, waits for the backoff
//! and resumes from `IDLE` on the next iteration. A start-up failure is
//! permanent: the state stays `ERROR`, [`step`](EventStateMachine::step)
//! returns [`LoopError::Halted`] and [`run`](EventStateMachine::run) exits
//! without iterating. [`EventStateMachine::halt`] parks the node.
//!
//! ## Iteration
//!
//! Every [`step`](EventStateMachine::step) first runs the battery check when
//! it is due, then handles the current state:
//!
//! - **IDLE**: one movement check. On movement, read altitude; success
//!   captures the reference and starts monitoring, failure is logged and the
//!   machine stays idle. No movement ends in a low-power wait.
//! - **MONITORING_PRESSURE**: when a poll is due, read altitude; a change of
//!   at least the threshold (either direction) plays the alert and
//!   re-baselines the reference and the monitoring window. Afterwards, in the
//!   same iteration, a window older than the timeout returns to IDLE. The
//!   window is measured from entry or the last trigger, never from the last
//!   successful read, so a failing barometer still times out.
//! - **ACTION**: only ever held for the duration of playback. If an
//!   iteration starts in it the machine forces IDLE.
//!
//! ## Low battery
//!
//! `LOW_BATTERY` is an overlay on the indicator, never the current state.
//! See [`Indicator`](crate::indicator::Indicator).

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::battery::{BatteryMonitor, BatteryTransition};
use crate::config::DetectorConfig;
use crate::constants::time::HALT_SLEEP_MS;
use crate::errors::{InitError, InitResult, LoopError};
use crate::indicator::Indicator;
use crate::time::{elapsed_ms, Timestamp};
use crate::traits::{ActionTrigger, AltitudeSource, MovementDetector, TelemetrySink, TimeSource};

/// Externally visible node state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventState {
    /// Sensors not yet brought up
    Init,
    /// Polling for movement
    Idle,
    /// Watching for an altitude change
    MonitoringPressure,
    /// Alert playing
    Action,
    /// Indicator overlay for a low supply; never the current state
    LowBattery,
    /// A loop iteration failed, or start-up failed
    Error,
}

impl EventState {
    /// Log name of the state
    pub const fn name(self) -> &'static str {
        match self {
            EventState::Init => "INIT",
            EventState::Idle => "IDLE",
            EventState::MonitoringPressure => "MONITORING_PRESSURE",
            EventState::Action => "ACTION",
            EventState::LowBattery => "LOW_BATTERY",
            EventState::Error => "ERROR",
        }
    }

    /// Whether the indicator is lit in this state
    pub const fn indicator_on(self) -> bool {
        matches!(self, EventState::MonitoringPressure | EventState::Action)
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference and timers of one monitoring window
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitoringContext {
    /// Altitude captured at entry or at the last trigger (m)
    pub reference_altitude_m: f32,
    /// Start of the window, for the timeout
    pub monitor_start: Timestamp,
    /// Last successful altitude check, for the poll interval
    pub last_check: Timestamp,
}

impl MonitoringContext {
    /// Window starting at `now` around `reference_altitude_m`
    pub fn new(reference_altitude_m: f32, now: Timestamp) -> Self {
        Self {
            reference_altitude_m,
            monitor_start: now,
            last_check: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Init,
    Idle,
    Monitoring(MonitoringContext),
    Action,
    Error,
    // Start-up failed; never left
    Halted,
}

impl Phase {
    fn state(&self) -> EventState {
        match self {
            Phase::Init => EventState::Init,
            Phase::Idle => EventState::Idle,
            Phase::Monitoring(_) => EventState::MonitoringPressure,
            Phase::Action => EventState::Action,
            Phase::Error | Phase::Halted => EventState::Error,
        }
    }
}

/// Loop termination request
pub trait AbortSignal {
    /// Whether the loop should stop before the next iteration
    fn is_aborted(&self) -> bool;
}

impl AbortSignal for core::sync::atomic::AtomicBool {
    fn is_aborted(&self) -> bool {
        self.load(core::sync::atomic::Ordering::Relaxed)
    }
}

impl AbortSignal for core::cell::Cell<bool> {
    fn is_aborted(&self) -> bool {
        self.get()
    }
}

/// Everything the state machine drives, handed back on shutdown
pub struct Peripherals<M, A, T, S, P, C, D> {
    /// Accelerometer side
    pub motion: M,
    /// Barometer side
    pub altitude: A,
    /// Alert output
    pub action: T,
    /// Event log
    pub sink: S,
    /// Indicator pin
    pub indicator: P,
    /// Loop clock
    pub clock: C,
    /// Loop waits
    pub delay: D,
}

/// Motion-gated altitude change detector
pub struct EventStateMachine<M, A, T, S, P, C, D> {
    motion: M,
    altitude: A,
    action: T,
    sink: S,
    indicator: Indicator<P>,
    clock: C,
    delay: D,
    config: DetectorConfig,
    battery: BatteryMonitor,
    last_battery_check: Timestamp,
    phase: Phase,
}

impl<M, A, T, S, P, C, D> EventStateMachine<M, A, T, S, P, C, D>
where
    M: MovementDetector,
    A: AltitudeSource,
    T: ActionTrigger,
    S: TelemetrySink,
    P: OutputPin,
    C: TimeSource,
    D: DelayNs,
{
    /// Machine in INIT; nothing is touched until [`start`](Self::start)
    pub fn new(parts: Peripherals<M, A, T, S, P, C, D>, config: DetectorConfig) -> Self {
        let now = parts.clock.now();
        Self {
            motion: parts.motion,
            altitude: parts.altitude,
            action: parts.action,
            sink: parts.sink,
            indicator: Indicator::new(parts.indicator),
            clock: parts.clock,
            delay: parts.delay,
            battery: BatteryMonitor::new(&config.battery),
            config,
            last_battery_check: now,
            phase: Phase::Init,
        }
    }

    /// Current state
    pub fn state(&self) -> EventState {
        self.phase.state()
    }

    /// State shown on the indicator, including the low-battery overlay
    pub fn display_state(&self) -> EventState {
        if self.indicator.low_battery() {
            EventState::LowBattery
        } else {
            self.state()
        }
    }

    /// Monitoring window, only while monitoring
    pub fn monitoring_context(&self) -> Option<&MonitoringContext> {
        match &self.phase {
            Phase::Monitoring(context) => Some(context),
            _ => None,
        }
    }

    /// Whether start-up failed and the machine refuses to iterate
    pub fn is_halted(&self) -> bool {
        self.phase == Phase::Halted
    }

    /// Whether the low-battery overlay is active
    pub fn is_low_battery(&self) -> bool {
        self.battery.is_low()
    }

    /// Indicator driver
    pub fn indicator(&self) -> &Indicator<P> {
        &self.indicator
    }

    /// Event log
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Movement detector
    pub fn motion(&self) -> &M {
        &self.motion
    }

    /// Altitude source
    pub fn altitude(&self) -> &A {
        &self.altitude
    }

    /// Alert output
    pub fn action(&self) -> &T {
        &self.action
    }

    /// Configuration in use
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Bring up both sensors: INIT → IDLE, or INIT → ERROR on failure
    ///
    /// A failure is terminal: the machine never leaves ERROR and the caller
    /// is expected to [`halt`](Self::halt).
    pub fn start(&mut self) -> InitResult<()> {
        record!(self.sink, "[System] starting");
        if let Err(e) = self.indicator.off() {
            record!(self.sink, "[System] indicator unavailable: {}", e);
        }

        let volts = self.sink.battery_voltage();
        if self.battery.update(volts) == Some(BatteryTransition::EnteredLow) {
            record!(self.sink, "[Battery] initial voltage low: {:.2} V", volts);
            if let Err(e) = self.indicator.set_low_battery(true) {
                record!(self.sink, "[System] indicator unavailable: {}", e);
            }
        }

        let result = self
            .config
            .validate()
            .map_err(InitError::from)
            .and_then(|_| self.motion.initialize())
            .and_then(|_| self.altitude.initialize());

        match result {
            Ok(()) => {
                record!(self.sink, "[System] all sensors initialized, entering main loop");
                self.last_battery_check = self.clock.now();
                if let Err(e) = self.enter(Phase::Idle) {
                    record!(self.sink, "[System] indicator unavailable: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                record!(self.sink, "[System] sensor initialization failed: {}", e);
                self.phase = Phase::Halted;
                if let Err(pin) = self.indicator.off() {
                    record!(self.sink, "[System] indicator unavailable: {}", pin);
                }
                record!(self.sink, "[State] INIT -> ERROR");
                Err(e)
            }
        }
    }

    /// Run one loop iteration
    pub fn step(&mut self) -> Result<(), LoopError> {
        match self.phase {
            Phase::Init => return Err(LoopError::NotStarted),
            Phase::Halted => return Err(LoopError::Halted),
            _ => {}
        }
        let now = self.clock.now();

        if elapsed_ms(self.last_battery_check, now)
            > u64::from(self.config.monitor.battery_check_interval_ms)
        {
            self.last_battery_check = now;
            self.check_battery()?;
        }

        match self.phase {
            Phase::Init => Err(LoopError::NotStarted),
            Phase::Halted => Err(LoopError::Halted),
            Phase::Idle => self.idle(now),
            Phase::Monitoring(context) => self.monitor(now, context),
            Phase::Action => {
                record!(self.sink, "[State] unexpected ACTION, forcing IDLE");
                self.enter(Phase::Idle)?;
                self.delay.delay_ms(self.config.monitor.action_recovery_ms);
                Ok(())
            }
            Phase::Error => {
                record!(self.sink, "[State] recovering from ERROR");
                self.enter(Phase::Idle)
            }
        }
    }

    /// Handle a failed iteration: ERROR, indicator off, backoff
    ///
    /// A machine that never started, or failed to, keeps its phase but still
    /// backs off.
    pub fn recover(&mut self, error: LoopError) {
        record!(self.sink, "[System] main loop error: {}", error);
        if !matches!(self.phase, Phase::Init | Phase::Halted) {
            let from = self.phase.state();
            self.phase = Phase::Error;
            record!(self.sink, "[State] {} -> ERROR", from);
        }
        if let Err(e) = self.indicator.off() {
            log_warn!("indicator off failed: {}", e);
        }
        self.delay.delay_ms(self.config.monitor.error_backoff_ms);
    }

    /// Iterate until `abort` is raised, then shut down
    ///
    /// Returns at once if start-up failed.
    pub fn run<G: AbortSignal + ?Sized>(mut self, abort: &G) -> Peripherals<M, A, T, S, P, C, D> {
        while !self.is_halted() {
            if abort.is_aborted() {
                record!(self.sink, "[System] abort requested");
                break;
            }
            if let Err(e) = self.step() {
                self.recover(e);
            }
        }
        self.shutdown()
    }

    /// Indicator off and hand everything back
    pub fn shutdown(mut self) -> Peripherals<M, A, T, S, P, C, D> {
        record!(self.sink, "[System] shutting down");
        if let Err(e) = self.indicator.off() {
            record!(self.sink, "[System] indicator off failed: {}", e);
        }
        record!(self.sink, "[System] resources released");
        Peripherals {
            motion: self.motion,
            altitude: self.altitude,
            action: self.action,
            sink: self.sink,
            indicator: self.indicator.release(),
            clock: self.clock,
            delay: self.delay,
        }
    }

    /// Park the node forever after a fatal start-up error
    pub fn halt(mut self) -> ! {
        record!(self.sink, "[System] halted");
        if let Err(e) = self.indicator.off() {
            log_warn!("indicator off failed: {}", e);
        }
        loop {
            self.delay.delay_ms(HALT_SLEEP_MS);
        }
    }

    fn enter(&mut self, next: Phase) -> Result<(), LoopError> {
        let from = self.phase.state();
        let to = next.state();
        self.phase = next;
        if from != to {
            record!(self.sink, "[State] {} -> {}", from, to);
        }
        self.indicator.show(to)
    }

    fn check_battery(&mut self) -> Result<(), LoopError> {
        let volts = self.sink.battery_voltage();
        match self.battery.update(volts) {
            Some(BatteryTransition::EnteredLow) => {
                record!(self.sink, "[Battery] low voltage warning: {:.2} V", volts);
                self.indicator.set_low_battery(true)
            }
            Some(BatteryTransition::Recovered) => {
                record!(self.sink, "[Battery] low voltage cleared: {:.2} V", volts);
                self.indicator.set_low_battery(false)
            }
            None => Ok(()),
        }
    }

    fn idle(&mut self, now: Timestamp) -> Result<(), LoopError> {
        if !self.motion.check_for_movement() {
            self.delay.delay_ms(self.config.monitor.idle_sleep_ms);
            return Ok(());
        }

        record!(self.sink, "[Motion] movement detected, starting pressure monitoring");
        match self.altitude.read_altitude() {
            Ok(reading) => {
                record!(
                    self.sink,
                    "[Monitor] reference altitude {:.2} m (P={:.1} Pa)",
                    reading.altitude_m,
                    reading.pressure_pa
                );
                self.enter(Phase::Monitoring(MonitoringContext::new(reading.altitude_m, now)))
            }
            Err(e) => {
                record!(self.sink, "[Monitor] initial altitude read failed: {}", e);
                Ok(())
            }
        }
    }

    fn monitor(&mut self, now: Timestamp, mut context: MonitoringContext) -> Result<(), LoopError> {
        let monitor = self.config.monitor;

        if elapsed_ms(context.last_check, now) >= u64::from(monitor.poll_interval_ms) {
            match self.altitude.read_altitude() {
                Ok(reading) => {
                    context.last_check = now;
                    let change = libm::fabsf(reading.altitude_m - context.reference_altitude_m);
                    record!(
                        self.sink,
                        "[Monitor] altitude {:.2} m, reference {:.2} m, change {:.2} m",
                        reading.altitude_m,
                        context.reference_altitude_m,
                        change
                    );

                    if change >= monitor.altitude_threshold_m {
                        record!(
                            self.sink,
                            "[Monitor] change reached {:.2} m threshold, playing alert",
                            monitor.altitude_threshold_m
                        );
                        self.trigger()?;
                        context = MonitoringContext::new(reading.altitude_m, now);
                        self.enter(Phase::Monitoring(context))?;
                    } else {
                        self.phase = Phase::Monitoring(context);
                    }
                }
                Err(e) => {
                    record!(self.sink, "[Monitor] altitude read failed: {}", e);
                }
            }
        }

        if elapsed_ms(context.monitor_start, now) > u64::from(monitor.timeout_ms) {
            record!(self.sink, "[Monitor] timeout, returning to IDLE");
            return self.enter(Phase::Idle);
        }

        self.delay.delay_ms(monitor.monitor_tick_ms);
        Ok(())
    }

    fn trigger(&mut self) -> Result<(), LoopError> {
        self.enter(Phase::Action)?;
        if let Err(e) = self.action.play(self.config.alert_asset) {
            record!(self.sink, "[Action] playback failed: {}", e);
        }
        Ok(())
    }
}
