//! Sensor Addresses, Registers and Sampling Parameters
//!
//! Register values come from the LSM6DS3 and BMP280 datasheets. Addresses
//! are 7-bit I2C addresses.

// ===== LSM6DS3 ACCELEROMETER =====

/// LSM6DS3 address with SA0 tied low.
pub const LSM6DS3_ADDRESS: u8 = 0x6A;

/// Accelerometer control register 1 (ODR, full scale).
pub const LSM6DS3_REG_CTRL1_XL: u8 = 0x10;

/// Gyroscope control register 2 (ODR, full scale).
pub const LSM6DS3_REG_CTRL2_G: u8 = 0x11;

/// First accelerometer output register (X low byte). Six bytes follow.
pub const LSM6DS3_REG_OUTX_L_XL: u8 = 0x28;

/// CTRL1_XL value: 12.5 Hz output data rate, ±2 g full scale.
///
/// Lowest rate that still resolves a hand-held drop; keeps the accelerometer
/// in its low-power operating region.
pub const LSM6DS3_ACCEL_ODR_12HZ5_2G: u8 = 0x10;

/// CTRL2_G value: gyroscope powered down.
pub const LSM6DS3_GYRO_POWER_DOWN: u8 = 0x00;

/// Accelerometer sensitivity at ±2 g (mg/LSB).
///
/// Source: LSM6DS3 datasheet, table 3 (LA_So)
pub const LSM6DS3_SENSITIVITY_MG_PER_LSB: f32 = 0.061;

/// Settling time after writing CTRL1_XL (ms).
pub const LSM6DS3_ACCEL_SETTLE_MS: u32 = 10;

/// Settling time after writing CTRL2_G (ms).
pub const LSM6DS3_GYRO_SETTLE_MS: u32 = 100;

// ===== MOTION FILTER =====

/// Raw samples taken for offset calibration.
pub const OFFSET_SAMPLE_COUNT: u16 = 50;

/// Leading calibration samples discarded as settling transient.
pub const OFFSET_DISCARD_COUNT: u16 = 5;

/// Delay between calibration samples (ms).
pub const OFFSET_SAMPLE_INTERVAL_MS: u32 = 20;

/// Exponential smoothing factor of the gravity estimate.
///
/// At one update per 200 ms idle poll this gives a time constant of roughly
/// two seconds.
pub const GRAVITY_FILTER_ALPHA: f32 = 0.1;

/// Dynamic acceleration magnitude that counts as movement (mg).
pub const MOTION_THRESHOLD_MG: f32 = 150.0;

// ===== BMP280 BAROMETER =====

/// BMP280 address with SDO tied low.
pub const BMP280_ADDRESS: u8 = 0x76;

/// Chip identification register.
pub const BMP280_REG_CHIP_ID: u8 = 0xD0;

/// Value of the chip identification register.
pub const BMP280_CHIP_ID: u8 = 0x58;

/// First trimming parameter register (dig_T1 LSB). 24 bytes follow.
pub const BMP280_REG_CALIB: u8 = 0x88;

/// Measurement control register (oversampling and power mode).
pub const BMP280_REG_CTRL_MEAS: u8 = 0xF4;

/// Configuration register (standby, IIR filter).
pub const BMP280_REG_CONFIG: u8 = 0xF5;

/// First data register (press_msb). Six bytes follow.
pub const BMP280_REG_DATA: u8 = 0xF7;

/// Raw pressure value reported when the conversion was skipped.
pub const BMP280_SKIPPED_READING: i32 = 0x80000;

/// Samples averaged per pressure reading.
pub const PRESSURE_AVG_SAMPLES: u8 = 3;

/// Delay between averaged pressure samples (ms).
pub const PRESSURE_SAMPLE_INTERVAL_MS: u32 = 50;

/// Conversion wait used when the driver cannot compute one (ms).
pub const PRESSURE_DEFAULT_WAIT_MS: u32 = 20;
