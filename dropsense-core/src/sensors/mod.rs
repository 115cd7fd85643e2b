//! Sensor Chip Drivers
//!
//! Thin register layers for the two chips on the reference board. The
//! algorithms that consume them live in [`motion`](crate::motion) and
//! [`altitude`](crate::altitude).

pub mod bmp280;
pub mod lsm6ds3;

pub use bmp280::{Bmp280, Bmp280Error, Calibration};
pub use lsm6ds3::Lsm6ds3;
