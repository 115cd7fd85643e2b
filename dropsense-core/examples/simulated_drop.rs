//! Simulated Drop Example
//!
//! Runs the complete detector on the host: a parcel sits on a 1.2 m shelf,
//! is knocked off at t = 2 s and lands on the floor. Sensors, clock and
//! speaker are simulated; the event log, WAV player and state machine are
//! the real components.
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example simulated_drop
//! cargo run --example simulated_drop -- /tmp/events.log   # also append to a file
//! ```

use std::cell::{Cell, RefCell};

use dropsense_core::{
    altitude::pressure_to_altitude,
    audio::{AudioOutput, EmbeddedAsset, PcmFormat, WavPlayer},
    constants::physics::{BAROMETRIC_EXPONENT_DIVISOR, BAROMETRIC_SCALE_M, SEA_LEVEL_PRESSURE_PA},
    constants::power::ALERT_ASSET_PATH,
    errors::{InitError, ReadError},
    telemetry::{EventLog, FileLog, MemoryLog},
    time::{SimClock, Timestamp},
    traits::{AltitudeReading, LogWriter, VoltageSource},
    AltitudeSource, DetectorConfig, EventStateMachine, MovementDetector, Peripherals, TimeSource,
};
use embedded_hal::digital::{ErrorType, OutputPin};

const SHELF_HEIGHT_M: f32 = 1.2;
const KNOCKED_AT_MS: Timestamp = 2_000;
const LANDED_AT_MS: Timestamp = 2_400;
const RUN_FOR_MS: Timestamp = 12_000;

/// Where the parcel is at a given moment
struct Scenario<'a> {
    clock: SimClock<'a>,
}

impl Scenario<'_> {
    fn falling(&self) -> bool {
        (KNOCKED_AT_MS..LANDED_AT_MS).contains(&self.clock.now())
    }

    fn height_m(&self) -> f32 {
        if self.clock.now() < LANDED_AT_MS {
            SHELF_HEIGHT_M
        } else {
            0.0
        }
    }
}

/// Accelerometer side: reports movement while the parcel falls
struct SimulatedMotion<'a>(Scenario<'a>);

impl MovementDetector for SimulatedMotion<'_> {
    fn initialize(&mut self) -> Result<(), InitError> {
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn check_for_movement(&mut self) -> bool {
        self.0.falling()
    }
}

/// Barometer side: site 35 m above sea level
struct SimulatedBarometer<'a>(Scenario<'a>);

impl AltitudeSource for SimulatedBarometer<'_> {
    fn initialize(&mut self) -> Result<(), InitError> {
        Ok(())
    }

    fn read_altitude(&mut self) -> Result<AltitudeReading, ReadError> {
        let altitude = 35.0 + self.0.height_m();
        let pressure_pa = SEA_LEVEL_PRESSURE_PA
            * (1.0 - altitude / BAROMETRIC_SCALE_M).powf(BAROMETRIC_EXPONENT_DIVISOR);
        let altitude_m = pressure_to_altitude(Some(pressure_pa), SEA_LEVEL_PRESSURE_PA)
            .ok_or(ReadError::AltitudeUndefined)?;
        Ok(AltitudeReading {
            pressure_pa,
            altitude_m,
        })
    }
}

/// Fresh LiPo cell
struct Cell392;

impl VoltageSource for Cell392 {
    fn read_voltage(&mut self) -> f32 {
        3.92
    }
}

/// Speaker that only counts the bytes it is fed
#[derive(Default)]
struct CountingSpeaker {
    bytes: usize,
}

impl AudioOutput for CountingSpeaker {
    type Error = std::convert::Infallible;

    fn begin(&mut self, format: PcmFormat) -> Result<(), Self::Error> {
        println!("  speaker: {} Hz, {}-bit", format.sample_rate, format.bits_per_sample);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.bytes += data.len();
        Ok(data.len())
    }

    fn end(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Status LED printed to the console
struct ConsoleLed;

impl ErrorType for ConsoleLed {
    type Error = std::convert::Infallible;
}

impl OutputPin for ConsoleLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        println!("  LED on");
        Ok(())
    }
}

/// Memory log that optionally mirrors every line to a file
struct Tee {
    memory: MemoryLog<64>,
    file: Option<FileLog>,
}

impl LogWriter for Tee {
    type Error = std::io::Error;

    fn write_line(&mut self, line: &str) -> Result<(), Self::Error> {
        let _ = self.memory.write_line(line);
        match &mut self.file {
            Some(file) => file.write_line(line),
            None => Ok(()),
        }
    }
}

/// 16-bit mono 8 kHz square wave
fn alert_tone(duration_ms: u32) -> Vec<u8> {
    let sample_rate = 8_000u32;
    let samples = sample_rate * duration_ms / 1000;
    let data_len = samples * 2;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for i in 0..samples {
        let level: i16 = if (i / 8) % 2 == 0 { 8_000 } else { -8_000 };
        wav.extend_from_slice(&level.to_le_bytes());
    }
    wav
}

fn main() -> std::io::Result<()> {
    println!("DropSense Simulated Drop");
    println!("========================\n");

    let file = std::env::args().nth(1).map(FileLog::open).transpose()?;
    let tone = alert_tone(500);

    let ticks = Cell::new(0);
    let clock = SimClock::new(&ticks);
    let log = RefCell::new(EventLog::new(
        Tee {
            memory: MemoryLog::default(),
            file,
        },
        Cell392,
        clock,
    ));

    let player = WavPlayer::new(
        EmbeddedAsset::new(ALERT_ASSET_PATH, &tone),
        CountingSpeaker::default(),
        clock,
        &log,
    );

    let mut machine = EventStateMachine::new(
        Peripherals {
            motion: SimulatedMotion(Scenario { clock }),
            altitude: SimulatedBarometer(Scenario { clock }),
            action: player,
            sink: &log,
            indicator: ConsoleLed,
            clock,
            delay: clock,
        },
        DetectorConfig::default(),
    );

    if let Err(e) = machine.start() {
        println!("start-up failed: {e}");
        machine.halt();
    }

    while clock.now() < RUN_FOR_MS {
        if let Err(e) = machine.step() {
            machine.recover(e);
        }
    }

    let parts = machine.shutdown();
    let (_, speaker) = parts.action.into_parts();
    println!("\nSpeaker received {} bytes\n", speaker.bytes);

    println!("Event log");
    println!("---------");
    for line in log.borrow().writer().memory.lines() {
        println!("{line}");
    }
    Ok(())
}
