//! Physics-aware data generators
//!
//! Pressures are produced with the inverse of the barometric formula used by
//! the estimator, so a generated altitude survives the round trip through a
//! simulated barometer up to float rounding.

use dropsense_core::constants::physics::{
    BAROMETRIC_EXPONENT_DIVISOR, BAROMETRIC_SCALE_M, SEA_LEVEL_PRESSURE_PA,
};

/// Pressure (Pa) at `altitude_m` above the standard sea level reference
pub fn pressure_at_altitude(altitude_m: f32) -> f32 {
    SEA_LEVEL_PRESSURE_PA * (1.0 - altitude_m / BAROMETRIC_SCALE_M).powf(BAROMETRIC_EXPONENT_DIVISOR)
}

/// Raw accelerometer counts for a vector in mg at ±2 g (0.061 mg/LSB)
pub fn counts_for_mg(x_mg: f32, y_mg: f32, z_mg: f32) -> [i16; 3] {
    let to_counts = |mg: f32| (mg / 0.061).round() as i16;
    [to_counts(x_mg), to_counts(y_mg), to_counts(z_mg)]
}

/// Node lying flat at rest: 1 g on Z
pub fn resting_flat() -> [i16; 3] {
    counts_for_mg(0.0, 0.0, 1000.0)
}

/// Altitude profile of an object dropped from `start_m` by `drop_m` over
/// `steps` polls, then lying still
pub fn drop_profile(start_m: f32, drop_m: f32, steps: usize, rest: usize) -> Vec<f32> {
    let mut profile = Vec::with_capacity(steps + rest + 1);
    profile.push(start_m);
    for i in 1..=steps {
        profile.push(start_m - drop_m * i as f32 / steps as f32);
    }
    profile.extend(std::iter::repeat(start_m - drop_m).take(rest));
    profile
}

