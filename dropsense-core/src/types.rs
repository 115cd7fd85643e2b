//! Sample and vector types shared by the sensor components

use core::ops::{Add, Mul, Sub};

/// Raw tri-axis accelerometer sample in LSB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// X axis
    pub x: i16,
    /// Y axis
    pub y: i16,
    /// Z axis
    pub z: i16,
}

impl RawSample {
    /// Build a sample from axis values
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Decode six little-endian output register bytes (X, Y, Z)
    pub fn from_le_bytes(bytes: [u8; 6]) -> Self {
        Self {
            x: i16::from_le_bytes([bytes[0], bytes[1]]),
            y: i16::from_le_bytes([bytes[2], bytes[3]]),
            z: i16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }

    /// Convert to physical units with `sensitivity` per LSB
    pub fn scaled(&self, sensitivity: f32) -> Vector3 {
        Vector3::new(
            f32::from(self.x) * sensitivity,
            f32::from(self.y) * sensitivity,
            f32::from(self.z) * sensitivity,
        )
    }
}

/// Per-axis floating point value (milli-g for acceleration)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    /// X axis
    pub x: f32,
    /// Y axis
    pub y: f32,
    /// Z axis
    pub z: f32,
}

impl Vector3 {
    /// All axes zero
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Build a vector from axis values
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean magnitude
    ///
    /// Thresholds are compared in squared space so the hot path never takes
    /// a square root.
    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Euclidean magnitude
    pub fn magnitude(&self) -> f32 {
        libm::sqrtf(self.magnitude_squared())
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}
