//! Event Log
//!
//! Every state transition, sensor failure and measurement of interest is
//! recorded as one line:
//!
//! ```text
//! [1000ms],[3.92V] | [State] IDLE -> MONITORING_PRESSURE (ref 12.41 m)
//! ```
//!
//! The first field is the time since the previous event (0 for the first),
//! the second the supply voltage at the moment of logging (0.00 when it
//! cannot be measured).
//!
//! ## Sinks
//!
//! - [`ConsoleSink`]: forwards messages to the ambient logger only. The
//!   default when no storage is available.
//! - [`EventLog`]: formats full lines and hands them to a [`LogWriter`]:
//!   [`FileLog`] (append-only file, `std`) or [`MemoryLog`] (bounded ring,
//!   `no_std`).
//!
//! Lines are formatted into a fixed-capacity buffer; a message that does not
//! fit is truncated rather than dropped.

use core::convert::Infallible;
use core::fmt::{self, Write};

use heapless::{Deque, String};

use crate::constants::power::LOG_LINE_CAPACITY;
use crate::time::{elapsed_ms, Timestamp};
use crate::traits::{LogWriter, TelemetrySink, TimeSource, VoltageSource};

/// One formatted log line
pub type LogLine = String<LOG_LINE_CAPACITY>;

/// Sink that only mirrors messages to the ambient logger
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl TelemetrySink for ConsoleSink {
    fn record(&mut self, message: fmt::Arguments<'_>) {
        log_info!("{}", message);
    }
}

/// Voltage source for nodes without battery sensing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVoltage;

impl VoltageSource for NoVoltage {
    fn read_voltage(&mut self) -> f32 {
        0.0
    }
}

/// Writer that keeps what fits and silently discards the rest
struct Truncating<'a> {
    line: &'a mut LogLine,
    truncated: bool,
}

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }
        for ch in s.chars() {
            if self.line.push(ch).is_err() {
                self.truncated = true;
                break;
            }
        }
        Ok(())
    }
}

/// Format one event line into `line`
///
/// Returns `false` if the line had to be truncated.
pub fn format_line(
    line: &mut LogLine,
    delta_ms: u64,
    volts: f32,
    message: fmt::Arguments<'_>,
) -> bool {
    line.clear();
    let mut out = Truncating {
        line,
        truncated: false,
    };
    // Truncating never reports an error.
    let _ = write!(out, "[{}ms],[{:.2}V] | {}", delta_ms, volts, message);
    !out.truncated
}

/// Timestamped, voltage-annotated event log
pub struct EventLog<W, V, C> {
    writer: W,
    voltage: V,
    clock: C,
    last_event: Option<Timestamp>,
    line: LogLine,
}

impl<W, V, C> EventLog<W, V, C>
where
    W: LogWriter,
    V: VoltageSource,
    C: TimeSource,
{
    /// Log writing to `writer`, sampling `voltage` on every event
    pub fn new(writer: W, voltage: V, clock: C) -> Self {
        Self {
            writer,
            voltage,
            clock,
            last_event: None,
            line: LogLine::new(),
        }
    }

    /// Underlying writer
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Last line written
    pub fn last_line(&self) -> &str {
        &self.line
    }

    /// Split into writer, voltage source and clock
    pub fn into_parts(self) -> (W, V, C) {
        (self.writer, self.voltage, self.clock)
    }
}

impl<W, V, C> TelemetrySink for EventLog<W, V, C>
where
    W: LogWriter,
    V: VoltageSource,
    C: TimeSource,
{
    fn record(&mut self, message: fmt::Arguments<'_>) {
        let now = self.clock.now();
        let delta = self.last_event.map_or(0, |last| elapsed_ms(last, now));
        self.last_event = Some(now);
        let volts = self.voltage.read_voltage();

        if !format_line(&mut self.line, delta, volts, message) {
            log_debug!("event log line truncated");
        }
        log_info!("{}", self.line.as_str());

        if let Err(e) = self.writer.write_line(&self.line) {
            log_warn!("event log write failed: {:?}", e);
        }
    }

    fn battery_voltage(&mut self) -> f32 {
        self.voltage.read_voltage()
    }
}

/// Bounded in-memory log keeping the newest `N` lines
pub struct MemoryLog<const N: usize> {
    lines: Deque<LogLine, N>,
    dropped: usize,
}

impl<const N: usize> MemoryLog<N> {
    /// Empty log
    pub const fn new() -> Self {
        Self {
            lines: Deque::new(),
            dropped: 0,
        }
    }

    /// Lines currently held, oldest first
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines.iter().map(|line| line.as_str())
    }

    /// Number of lines held
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no line is held
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines evicted to make room for newer ones
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Whether any held line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().any(|line| line.contains(needle))
    }
}

impl<const N: usize> Default for MemoryLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LogWriter for MemoryLog<N> {
    type Error = Infallible;

    fn write_line(&mut self, line: &str) -> Result<(), Infallible> {
        if N == 0 {
            self.dropped += 1;
            return Ok(());
        }
        if self.lines.is_full() {
            self.lines.pop_front();
            self.dropped += 1;
        }
        let mut owned = LogLine::new();
        // Input comes from EventLog and already fits; truncate anything else.
        for ch in line.chars() {
            if owned.push(ch).is_err() {
                break;
            }
        }
        let _ = self.lines.push_back(owned);
        Ok(())
    }
}

#[cfg(feature = "std")]
pub use file::FileLog;

#[cfg(feature = "std")]
mod file {
    use std::fs::{File, OpenOptions};
    use std::io::{self, Write};
    use std::path::Path;

    use crate::traits::LogWriter;

    /// Append-only event log file
    pub struct FileLog {
        file: File,
    }

    impl FileLog {
        /// Open `path` for appending, creating it if missing
        pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Self { file })
        }
    }

    impl LogWriter for FileLog {
        type Error = io::Error;

        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.file.write_all(line.as_bytes())?;
            self.file.write_all(b"\n")?;
            self.file.flush()
        }
    }
}
