//! Physical Constants for Altitude Estimation
//!
//! The barometric formula used here is the simplified international
//! barometric formula for the troposphere:
//!
//! ```text
//! h = 44330 × (1 - (P / P₀)^(1 / 5.257))
//! ```

/// Standard atmospheric pressure at sea level (Pa).
///
/// Source: International Standard Atmosphere (ISA)
pub const SEA_LEVEL_PRESSURE_PA: f32 = 101_325.0;

/// Scale height term of the barometric formula (m).
///
/// Equals T₀ / L = 288.15 K / 0.0065 K/m, rounded.
pub const BAROMETRIC_SCALE_M: f32 = 44_330.0;

/// Exponent divisor of the barometric formula.
///
/// 1 / 5.257 ≈ R·L / (g·M) for dry air.
pub const BAROMETRIC_EXPONENT_DIVISOR: f32 = 5.257;

/// Altitude change that counts as an event (m).
pub const ALTITUDE_CHANGE_THRESHOLD_M: f32 = 1.0;
