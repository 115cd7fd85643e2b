//! Simulated I2C controller with LSM6DS3 and BMP280 register maps
//!
//! Implements `embedded_hal::i2c::I2c`, so the real drivers run unmodified
//! on top of it through `I2cBus`.

use std::collections::VecDeque;

use dropsense_core::constants::sensors::{
    BMP280_ADDRESS, BMP280_CHIP_ID, BMP280_REG_CALIB, BMP280_REG_CHIP_ID, BMP280_REG_CTRL_MEAS,
    BMP280_REG_DATA, LSM6DS3_ADDRESS, LSM6DS3_REG_OUTX_L_XL,
};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

/// Datasheet trimming parameters (BMP280 section 8.2), little-endian
pub const DATASHEET_TRIM: [u8; 24] = {
    let words: [u16; 12] = [
        27504,
        26435,
        (-1000i16) as u16,
        36477,
        (-10685i16) as u16,
        3024,
        2855,
        140,
        (-7i16) as u16,
        15500,
        (-14600i16) as u16,
        6000,
    ];
    let mut out = [0u8; 24];
    let mut i = 0;
    while i < 12 {
        out[2 * i] = words[i] as u8;
        out[2 * i + 1] = (words[i] >> 8) as u8;
        i += 1;
    }
    out
};

/// Datasheet raw pressure for 100653.27 Pa at 25.08 °C
pub const DATASHEET_ADC_P: i32 = 415_148;

/// Datasheet raw temperature for 25.08 °C
pub const DATASHEET_ADC_T: i32 = 519_888;

/// Compensated pressure of the datasheet example (Pa)
pub const DATASHEET_PRESSURE_PA: f32 = 100_653.27;

/// Accelerometer model: a register file plus a queue of output samples
///
/// Once the queue is empty every read returns the resting sample.
pub struct AccelModel {
    pub regs: [u8; 256],
    pub samples: VecDeque<[i16; 3]>,
    pub resting: [i16; 3],
    /// Output reads (1-based) that fail with a bus error
    pub fail_at: Vec<usize>,
    pub reads: usize,
}

impl AccelModel {
    pub fn resting(sample: [i16; 3]) -> Self {
        Self {
            regs: [0; 256],
            samples: VecDeque::new(),
            resting: sample,
            fail_at: Vec::new(),
            reads: 0,
        }
    }

    pub fn queue(&mut self, samples: impl IntoIterator<Item = [i16; 3]>) {
        self.samples.extend(samples);
    }
}

/// Barometer model: chip id, trimming data and a fixed raw measurement
pub struct BaroModel {
    pub regs: [u8; 256],
    pub forced: usize,
    /// Data register reads (1-based) that fail with a bus error
    pub fail_data_at: Vec<usize>,
    pub data_reads: usize,
}

impl BaroModel {
    pub fn datasheet() -> Self {
        let mut model = Self {
            regs: [0; 256],
            forced: 0,
            fail_data_at: Vec::new(),
            data_reads: 0,
        };
        model.regs[usize::from(BMP280_REG_CHIP_ID)] = BMP280_CHIP_ID;
        let start = usize::from(BMP280_REG_CALIB);
        model.regs[start..start + 24].copy_from_slice(&DATASHEET_TRIM);
        model.set_raw(DATASHEET_ADC_P, DATASHEET_ADC_T);
        model
    }

    pub fn set_raw(&mut self, adc_p: i32, adc_t: i32) {
        let base = usize::from(BMP280_REG_DATA);
        self.regs[base] = (adc_p >> 12) as u8;
        self.regs[base + 1] = (adc_p >> 4) as u8;
        self.regs[base + 2] = ((adc_p & 0xF) << 4) as u8;
        self.regs[base + 3] = (adc_t >> 12) as u8;
        self.regs[base + 4] = (adc_t >> 4) as u8;
        self.regs[base + 5] = ((adc_t & 0xF) << 4) as u8;
    }

    /// Power mode bits of ctrl_meas (0 = sleep, 1 or 2 = forced, 3 = normal)
    pub fn mode(&self) -> u8 {
        self.regs[usize::from(BMP280_REG_CTRL_MEAS)] & 0b11
    }
}

/// I2C controller with up to one accelerometer and one barometer attached
#[derive(Default)]
pub struct SimI2c {
    pub accel: Option<AccelModel>,
    pub baro: Option<BaroModel>,
}

impl SimI2c {
    pub fn with_accel(model: AccelModel) -> Self {
        Self {
            accel: Some(model),
            baro: None,
        }
    }

    pub fn with_baro(model: BaroModel) -> Self {
        Self {
            accel: None,
            baro: Some(model),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn present(&self, address: u8) -> bool {
        (address == LSM6DS3_ADDRESS && self.accel.is_some())
            || (address == BMP280_ADDRESS && self.baro.is_some())
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) {
        if address == LSM6DS3_ADDRESS {
            if let Some(accel) = &mut self.accel {
                accel.regs[usize::from(register)] = value;
            }
        } else if let Some(baro) = &mut self.baro {
            baro.regs[usize::from(register)] = value;
            if register == BMP280_REG_CTRL_MEAS && matches!(value & 0b11, 0b01 | 0b10) {
                baro.forced += 1;
                // Conversion completes instantly; the device drops back to sleep.
                baro.regs[usize::from(register)] = value & !0b11;
            }
        }
    }

    fn read_block(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), ErrorKind> {
        if address == LSM6DS3_ADDRESS {
            let Some(accel) = &mut self.accel else {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            };
            if register == LSM6DS3_REG_OUTX_L_XL && buf.len() == 6 {
                accel.reads += 1;
                if accel.fail_at.contains(&accel.reads) {
                    return Err(ErrorKind::Bus);
                }
                let sample = accel.samples.pop_front().unwrap_or(accel.resting);
                for (axis, value) in sample.iter().enumerate() {
                    buf[2 * axis..2 * axis + 2].copy_from_slice(&value.to_le_bytes());
                }
            } else {
                let start = usize::from(register);
                buf.copy_from_slice(&accel.regs[start..start + buf.len()]);
            }
            return Ok(());
        }

        let Some(baro) = &mut self.baro else {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        };
        if register == BMP280_REG_DATA {
            baro.data_reads += 1;
            if baro.fail_data_at.contains(&baro.data_reads) {
                return Err(ErrorKind::Bus);
            }
        }
        let start = usize::from(register);
        buf.copy_from_slice(&baro.regs[start..start + buf.len()]);
        Ok(())
    }
}

impl ErrorType for SimI2c {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for SimI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if !self.present(address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut pointer: Option<u8> = None;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        match pointer {
                            None => pointer = Some(byte),
                            Some(register) => {
                                self.write_register(address, register, byte);
                                pointer = Some(register.wrapping_add(1));
                            }
                        }
                    }
                }
                Operation::Read(buf) => {
                    let register = pointer.unwrap_or(0);
                    self.read_block(address, register, buf)?;
                }
            }
        }
        Ok(())
    }
}
