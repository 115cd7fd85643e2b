//! Core Traits and Abstractions for DropSense
//!
//! This module provides the trait definitions at the seams between the
//! state machine and the hardware it drives.
//!
//! ## Module Organization
//!
//! - [`sensing`] - Movement detector, altitude source and barometer driver
//! - [`action`] - Alert output
//! - [`telemetry`] - Event log, voltage source and log writer
//! - [`time`] - Time source abstraction for embedded systems
//!
//! ## Design Philosophy
//!
//! Components are generic over these traits rather than boxed, so a board
//! build monomorphizes down to direct calls and a test build swaps in
//! scripted fakes:
//!
//! - **Static Dispatch**: No runtime overhead from dynamic dispatch
//! - **No Globals**: Every capability is passed in at construction
//! - **Testability**: Each seam can be driven deterministically

pub mod action;
pub mod sensing;
pub mod telemetry;
pub mod time;

pub use action::ActionTrigger;
pub use sensing::{
    AltitudeReading, AltitudeSource, Barometer, IirFilter, MovementDetector, Oversampling,
    OversamplingProfile,
};
pub use telemetry::{LogWriter, TelemetrySink, VoltageSource};
pub use time::TimeSource;
