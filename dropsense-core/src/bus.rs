//! Register-Oriented Bus Primitive
//!
//! The sensor components only need three operations from a bus: find out
//! which addresses answer, write a register block, and read a register
//! block. [`Bus`] captures exactly that, and [`I2cBus`] provides it on top of
//! any `embedded_hal::i2c::I2c` implementation.
//!
//! ## Two Buses, Two Types
//!
//! The accelerometer and the barometer sit on separate buses, and on the
//! reference board the second one is bit-banged because the hardware
//! controller refused to work with the barometer. Each sensor component is
//! therefore generic over its own bus type; nothing assumes both handles are
//! the same transport.
//!
//! ## Error Classification
//!
//! `Bus::Error` must implement [`embedded_hal::i2c::Error`], so every
//! failure can be reduced to an [`ErrorKind`] for logging and for the
//! crate's own error types.

use embedded_hal::i2c::{ErrorKind, I2c, Operation};
use heapless::Vec;

/// First address probed by [`Bus::scan`] (0x00-0x07 are reserved)
pub const SCAN_FIRST_ADDRESS: u8 = 0x08;

/// Last address probed by [`Bus::scan`] (0x78-0x7F are reserved)
pub const SCAN_LAST_ADDRESS: u8 = 0x77;

/// Capacity needed to hold every non-reserved 7-bit address
pub const SCAN_CAPACITY: usize = (SCAN_LAST_ADDRESS - SCAN_FIRST_ADDRESS + 1) as usize;

/// Addresses that acknowledged a scan
pub type ScanResult = Vec<u8, SCAN_CAPACITY>;

/// Short-range synchronous serial bus to fixed peripheral addresses
pub trait Bus {
    /// Transport error
    type Error: embedded_hal::i2c::Error;

    /// List the addresses that acknowledge
    fn scan(&mut self) -> Result<ScanResult, Self::Error>;

    /// Write `bytes` starting at `register`
    fn write(&mut self, address: u8, register: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fill `buf` starting at `register`
    fn read(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Read a single register
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, Self::Error> {
        let mut value = [0u8; 1];
        self.read(address, register, &mut value)?;
        Ok(value[0])
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    type Error = B::Error;

    fn scan(&mut self) -> Result<ScanResult, Self::Error> {
        (**self).scan()
    }

    fn write(&mut self, address: u8, register: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(address, register, bytes)
    }

    fn read(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(address, register, buf)
    }
}

/// Reduce a transport error to its kind
pub fn error_kind<E: embedded_hal::i2c::Error>(error: &E) -> ErrorKind {
    error.kind()
}

/// [`Bus`] over an `embedded_hal` I2C controller
///
/// ```rust,ignore
/// let bus0 = I2cBus::new(hal_i2c0);        // hardware controller, 400 kHz
/// let bus1 = I2cBus::new(bitbanged_i2c1);  // software controller, 100 kHz
/// ```
#[derive(Debug)]
pub struct I2cBus<I> {
    i2c: I,
}

impl<I: I2c> I2cBus<I> {
    /// Wrap an I2C controller
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Give the controller back
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> Bus for I2cBus<I> {
    type Error = I::Error;

    fn scan(&mut self) -> Result<ScanResult, Self::Error> {
        let mut found = ScanResult::new();
        for address in SCAN_FIRST_ADDRESS..=SCAN_LAST_ADDRESS {
            // An empty write is acknowledged only by a present device.
            if self.i2c.write(address, &[]).is_ok() {
                // Capacity covers the whole scanned range.
                let _ = found.push(address);
            }
        }
        Ok(found)
    }

    fn write(&mut self, address: u8, register: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        // Adjacent write operations are sent without a repeated start.
        self.i2c.transaction(
            address,
            &mut [Operation::Write(&[register]), Operation::Write(bytes)],
        )
    }

    fn read(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(address, &[register], buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, NoAcknowledgeSource, SevenBitAddress};

    /// Controller with one device at 0x6A exposing a 256-byte register file
    struct FakeController {
        registers: [u8; 256],
        pointer: usize,
    }

    impl ErrorType for FakeController {
        type Error = ErrorKind;
    }

    impl I2c<SevenBitAddress> for FakeController {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if address != 0x6A {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            let mut pointer_set = false;
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        for byte in bytes.iter() {
                            if pointer_set {
                                self.registers[self.pointer] = *byte;
                                self.pointer = (self.pointer + 1) % 256;
                            } else {
                                self.pointer = usize::from(*byte);
                                pointer_set = true;
                            }
                        }
                    }
                    Operation::Read(buf) => {
                        for byte in buf.iter_mut() {
                            *byte = self.registers[self.pointer];
                            self.pointer = (self.pointer + 1) % 256;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn bus() -> I2cBus<FakeController> {
        I2cBus::new(FakeController { registers: [0; 256], pointer: 0 })
    }

    #[test]
    fn scan_finds_only_present_device() {
        let mut bus = bus();
        let found = bus.scan().unwrap();
        assert_eq!(found.as_slice(), &[0x6A]);
    }

    #[test]
    fn write_then_read_register_block() {
        let mut bus = bus();
        bus.write(0x6A, 0x10, &[0x10, 0x00]).unwrap();

        let mut buf = [0u8; 2];
        bus.read(0x6A, 0x10, &mut buf).unwrap();
        assert_eq!(buf, [0x10, 0x00]);
        assert_eq!(bus.read_register(0x6A, 0x11).unwrap(), 0x00);
    }

    #[test]
    fn absent_device_reports_nack() {
        let mut bus = bus();
        let error = bus.read_register(0x76, 0xD0).unwrap_err();
        assert_eq!(
            error_kind(&error),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
    }
}
