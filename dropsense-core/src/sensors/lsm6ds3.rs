//! LSM6DS3 Accelerometer Register Layer
//!
//! Only the accelerometer half of the IMU is used; the gyroscope is powered
//! down during configuration and never touched again.

use crate::bus::Bus;
use crate::constants::sensors::{
    LSM6DS3_ACCEL_ODR_12HZ5_2G, LSM6DS3_GYRO_POWER_DOWN, LSM6DS3_REG_CTRL1_XL,
    LSM6DS3_REG_CTRL2_G, LSM6DS3_REG_OUTX_L_XL,
};
use crate::types::RawSample;

/// LSM6DS3 accelerometer on a register bus
pub struct Lsm6ds3<B> {
    bus: B,
    address: u8,
}

impl<B: Bus> Lsm6ds3<B> {
    /// Device at `address`; no bus traffic until used
    pub fn new(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    /// Device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Whether the device acknowledges a bus scan
    pub fn is_present(&mut self) -> Result<bool, B::Error> {
        Ok(self.bus.scan()?.contains(&self.address))
    }

    /// Select 12.5 Hz / ±2 g for the accelerometer
    pub fn configure_accelerometer(&mut self) -> Result<(), B::Error> {
        self.bus
            .write(self.address, LSM6DS3_REG_CTRL1_XL, &[LSM6DS3_ACCEL_ODR_12HZ5_2G])
    }

    /// Power down the gyroscope
    pub fn disable_gyroscope(&mut self) -> Result<(), B::Error> {
        self.bus
            .write(self.address, LSM6DS3_REG_CTRL2_G, &[LSM6DS3_GYRO_POWER_DOWN])
    }

    /// Read the latest accelerometer output
    pub fn read_raw(&mut self) -> Result<RawSample, B::Error> {
        let mut bytes = [0u8; 6];
        self.bus
            .read(self.address, LSM6DS3_REG_OUTX_L_XL, &mut bytes)?;
        Ok(RawSample::from_le_bytes(bytes))
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.bus
    }
}
