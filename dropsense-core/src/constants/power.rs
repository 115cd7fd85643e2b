//! Power Supply and Audio Output Constants

// ===== BATTERY SENSE =====

/// ADC reference voltage (V).
pub const ADC_REF_VOLTAGE: f32 = 3.3;

/// Full-scale value of a 16-bit ADC reading.
pub const ADC_FULL_SCALE: f32 = 65_535.0;

/// Ratio of the VSYS voltage divider feeding the ADC.
pub const VOLTAGE_DIVIDER_RATIO: f32 = 3.0;

/// Supply voltage below which the low-battery overlay is shown (V).
pub const LOW_BATTERY_THRESHOLD_V: f32 = 3.5;

// ===== AUDIO OUTPUT =====

/// Chunk size streamed to the audio output per write (bytes).
pub const I2S_BUFFER_SIZE: usize = 2048;

/// Pause after a short write to the audio output (ms).
pub const I2S_SHORT_WRITE_PAUSE_MS: u32 = 5;

/// Wait after the last write so the output buffer drains (ms).
pub const I2S_DRAIN_MS: u32 = 200;

/// Alert asset played when an altitude change is detected.
pub const ALERT_ASSET_PATH: &str = "/wav/tower_crane_warning_fast.wav";

// ===== EVENT LOG =====

/// Event log file name.
pub const LOG_FILE_NAME: &str = "log.txt";

/// Maximum length of one formatted event log line (bytes).
pub const LOG_LINE_CAPACITY: usize = 160;
