//! BMP280 Barometric Pressure Sensor
//!
//! Minimal driver for the forced-mode workflow the altitude estimator uses:
//!
//! ```text
//! init()                 chip id check, 24-byte trimming read
//! configure(profile, f)  IIR filter, oversampling, sleep mode
//! force_measurement()    one conversion, device falls back to sleep
//! read_pressure()        raw 20-bit ADC values → compensated Pa
//! ```
//!
//! ## Compensation
//!
//! Uses the floating point compensation formulas from the datasheet
//! (section 8.1). Temperature is always compensated first because pressure
//! compensation depends on `t_fine`.
//!
//! ## Measurement Time
//!
//! Maximum conversion time from datasheet appendix B:
//!
//! ```text
//! t_max = 1.25 + 2.3·T_os + (2.3·P_os + 0.575)   [ms]
//! ```
//!
//! The pressure term is dropped when pressure sampling is skipped.

use crate::bus::{error_kind, Bus};
use crate::constants::sensors::{
    BMP280_CHIP_ID, BMP280_REG_CALIB, BMP280_REG_CHIP_ID, BMP280_REG_CONFIG,
    BMP280_REG_CTRL_MEAS, BMP280_REG_DATA, BMP280_SKIPPED_READING,
};
use crate::errors::{InitError, ReadError};
use crate::traits::{Barometer, IirFilter, Oversampling, OversamplingProfile};

const MODE_SLEEP: u8 = 0b00;
const MODE_FORCED: u8 = 0b01;

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bmp280Error<E> {
    /// Bus transfer failed
    Bus(E),
    /// Chip id register did not read 0x58
    WrongChip(u8),
    /// Operation needs trimming parameters, call `init` first
    NotCalibrated,
    /// Conversion was skipped (pressure oversampling off or no conversion yet)
    Skipped,
    /// Trimming parameters produce a division by zero
    InvalidCompensation,
}

impl<E: embedded_hal::i2c::Error> From<Bmp280Error<E>> for InitError {
    fn from(error: Bmp280Error<E>) -> Self {
        match error {
            Bmp280Error::Bus(e) => InitError::Bus(error_kind(&e)),
            Bmp280Error::WrongChip(found) => InitError::WrongChip {
                expected: BMP280_CHIP_ID,
                found,
            },
            Bmp280Error::NotCalibrated => InitError::Configuration {
                reason: "barometer trimming parameters missing",
            },
            Bmp280Error::Skipped | Bmp280Error::InvalidCompensation => {
                InitError::Configuration {
                    reason: "barometer trimming parameters invalid",
                }
            }
        }
    }
}

impl<E: embedded_hal::i2c::Error> From<Bmp280Error<E>> for ReadError {
    fn from(error: Bmp280Error<E>) -> Self {
        match error {
            Bmp280Error::Bus(e) => ReadError::Bus(error_kind(&e)),
            Bmp280Error::NotCalibrated | Bmp280Error::WrongChip(_) => ReadError::NotInitialized,
            Bmp280Error::Skipped | Bmp280Error::InvalidCompensation => ReadError::NoData,
        }
    }
}

/// Factory trimming parameters (datasheet table 17)
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

impl Calibration {
    /// Decode the 24 bytes starting at register 0x88
    pub fn from_bytes(b: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([b[i], b[i + 1]]);
        Self {
            dig_t1: u(0),
            dig_t2: s(2),
            dig_t3: s(4),
            dig_p1: u(6),
            dig_p2: s(8),
            dig_p3: s(10),
            dig_p4: s(12),
            dig_p5: s(14),
            dig_p6: s(16),
            dig_p7: s(18),
            dig_p8: s(20),
            dig_p9: s(22),
        }
    }

    /// Compensated temperature (°C) and the shared `t_fine` term
    pub fn compensate_temperature(&self, adc_t: i32) -> (f64, f64) {
        let adc_t = f64::from(adc_t);
        let t1 = f64::from(self.dig_t1);
        let var1 = (adc_t / 16384.0 - t1 / 1024.0) * f64::from(self.dig_t2);
        let x = adc_t / 131072.0 - t1 / 8192.0;
        let var2 = x * x * f64::from(self.dig_t3);
        let t_fine = var1 + var2;
        (t_fine / 5120.0, t_fine)
    }

    /// Compensated pressure (Pa), `None` if the trimming data is degenerate
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: f64) -> Option<f64> {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * f64::from(self.dig_p6) / 32768.0;
        var2 += var1 * f64::from(self.dig_p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.dig_p4) * 65536.0;
        var1 = (f64::from(self.dig_p3) * var1 * var1 / 524288.0 + f64::from(self.dig_p2) * var1)
            / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * f64::from(self.dig_p1);
        if var1 == 0.0 {
            return None;
        }
        let mut p = 1048576.0 - f64::from(adc_p);
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        var1 = f64::from(self.dig_p9) * p * p / 2147483648.0;
        var2 = p * f64::from(self.dig_p8) / 32768.0;
        Some(p + (var1 + var2 + f64::from(self.dig_p7)) / 16.0)
    }
}

/// Register encoding of an oversampling setting
fn osrs_bits(oversampling: Oversampling) -> u8 {
    match oversampling {
        Oversampling::Skip => 0b000,
        Oversampling::X1 => 0b001,
        Oversampling::X2 => 0b010,
        Oversampling::X4 => 0b011,
        Oversampling::X8 => 0b100,
        Oversampling::X16 => 0b101,
    }
}

/// Register encoding of an IIR filter coefficient
fn filter_bits(filter: IirFilter) -> u8 {
    match filter {
        IirFilter::Off => 0b000,
        IirFilter::X2 => 0b001,
        IirFilter::X4 => 0b010,
        IirFilter::X8 => 0b011,
        IirFilter::X16 => 0b100,
    }
}

/// Datasheet maximum conversion time, rounded up to whole milliseconds
pub fn max_measurement_ms(profile: OversamplingProfile) -> u32 {
    let t_os = u32::from(profile.temperature.factor());
    let p_os = u32::from(profile.pressure.factor());
    let mut micros = 1250 + 2300 * t_os;
    if p_os > 0 {
        micros += 2300 * p_os + 575;
    }
    micros.div_ceil(1000)
}

/// BMP280 on a register bus
pub struct Bmp280<B> {
    bus: B,
    address: u8,
    calibration: Option<Calibration>,
    profile: Option<OversamplingProfile>,
}

impl<B: Bus> Bmp280<B> {
    /// Driver for the device at `address`; no bus traffic until `init`
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            bus,
            address,
            calibration: None,
            profile: None,
        }
    }

    /// Trimming parameters, once loaded
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.bus
    }

    fn ctrl_meas(&self, mode: u8) -> u8 {
        let profile = self.profile.unwrap_or(OversamplingProfile::STANDARD);
        (osrs_bits(profile.temperature) << 5) | (osrs_bits(profile.pressure) << 2) | mode
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), Bmp280Error<B::Error>> {
        self.bus
            .write(self.address, register, &[value])
            .map_err(Bmp280Error::Bus)
    }
}

impl<B: Bus> Barometer for Bmp280<B> {
    type Error = Bmp280Error<B::Error>;

    fn init(&mut self) -> Result<(), Self::Error> {
        let id = self
            .bus
            .read_register(self.address, BMP280_REG_CHIP_ID)
            .map_err(Bmp280Error::Bus)?;
        if id != BMP280_CHIP_ID {
            return Err(Bmp280Error::WrongChip(id));
        }

        let mut raw = [0u8; 24];
        self.bus
            .read(self.address, BMP280_REG_CALIB, &mut raw)
            .map_err(Bmp280Error::Bus)?;
        let calibration = Calibration::from_bytes(&raw);
        if calibration.dig_p1 == 0 {
            return Err(Bmp280Error::InvalidCompensation);
        }
        self.calibration = Some(calibration);
        Ok(())
    }

    fn configure(
        &mut self,
        profile: OversamplingProfile,
        filter: IirFilter,
    ) -> Result<(), Self::Error> {
        self.profile = Some(profile);
        // Config writes are only guaranteed to take effect in sleep mode.
        self.write(BMP280_REG_CTRL_MEAS, self.ctrl_meas(MODE_SLEEP))?;
        self.write(BMP280_REG_CONFIG, filter_bits(filter) << 2)?;
        self.write(BMP280_REG_CTRL_MEAS, self.ctrl_meas(MODE_SLEEP))
    }

    fn sleep(&mut self) -> Result<(), Self::Error> {
        self.write(BMP280_REG_CTRL_MEAS, self.ctrl_meas(MODE_SLEEP))
    }

    fn force_measurement(&mut self) -> Result<(), Self::Error> {
        self.write(BMP280_REG_CTRL_MEAS, self.ctrl_meas(MODE_FORCED))
    }

    fn measurement_wait_ms(&self) -> Option<u32> {
        self.profile.map(max_measurement_ms)
    }

    fn read_pressure(&mut self) -> Result<f32, Self::Error> {
        let calibration = self.calibration.ok_or(Bmp280Error::NotCalibrated)?;

        let mut data = [0u8; 6];
        self.bus
            .read(self.address, BMP280_REG_DATA, &mut data)
            .map_err(Bmp280Error::Bus)?;
        let adc_p =
            (i32::from(data[0]) << 12) | (i32::from(data[1]) << 4) | (i32::from(data[2]) >> 4);
        let adc_t =
            (i32::from(data[3]) << 12) | (i32::from(data[4]) << 4) | (i32::from(data[5]) >> 4);
        if adc_p == BMP280_SKIPPED_READING {
            return Err(Bmp280Error::Skipped);
        }

        let (_, t_fine) = calibration.compensate_temperature(adc_t);
        calibration
            .compensate_pressure(adc_p, t_fine)
            .map(|pa| pa as f32)
            .ok_or(Bmp280Error::InvalidCompensation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ScanResult;
    use embedded_hal::i2c::ErrorKind;

    /// Datasheet section 8.2 worked example
    const DATASHEET_TRIM: Calibration = Calibration {
        dig_t1: 27504,
        dig_t2: 26435,
        dig_t3: -1000,
        dig_p1: 36477,
        dig_p2: -10685,
        dig_p3: 3024,
        dig_p4: 2855,
        dig_p5: 140,
        dig_p6: -7,
        dig_p7: 15500,
        dig_p8: -14600,
        dig_p9: 6000,
    };

    fn trim_bytes(c: &Calibration) -> [u8; 24] {
        let mut out = [0u8; 24];
        let words: [[u8; 2]; 12] = [
            c.dig_t1.to_le_bytes(),
            c.dig_t2.to_le_bytes(),
            c.dig_t3.to_le_bytes(),
            c.dig_p1.to_le_bytes(),
            c.dig_p2.to_le_bytes(),
            c.dig_p3.to_le_bytes(),
            c.dig_p4.to_le_bytes(),
            c.dig_p5.to_le_bytes(),
            c.dig_p6.to_le_bytes(),
            c.dig_p7.to_le_bytes(),
            c.dig_p8.to_le_bytes(),
            c.dig_p9.to_le_bytes(),
        ];
        for (i, w) in words.iter().enumerate() {
            out[2 * i] = w[0];
            out[2 * i + 1] = w[1];
        }
        out
    }

    /// 256-byte register file behind one address
    struct RegisterFile {
        regs: [u8; 256],
    }

    impl RegisterFile {
        fn bmp280() -> Self {
            let mut regs = [0u8; 256];
            regs[usize::from(BMP280_REG_CHIP_ID)] = BMP280_CHIP_ID;
            let start = usize::from(BMP280_REG_CALIB);
            regs[start..start + 24].copy_from_slice(&trim_bytes(&DATASHEET_TRIM));
            Self { regs }
        }

        fn set_raw(&mut self, adc_p: i32, adc_t: i32) {
            let base = usize::from(BMP280_REG_DATA);
            self.regs[base] = (adc_p >> 12) as u8;
            self.regs[base + 1] = (adc_p >> 4) as u8;
            self.regs[base + 2] = ((adc_p & 0xF) << 4) as u8;
            self.regs[base + 3] = (adc_t >> 12) as u8;
            self.regs[base + 4] = (adc_t >> 4) as u8;
            self.regs[base + 5] = ((adc_t & 0xF) << 4) as u8;
        }
    }

    impl Bus for RegisterFile {
        type Error = ErrorKind;

        fn scan(&mut self) -> Result<ScanResult, Self::Error> {
            let mut found = ScanResult::new();
            let _ = found.push(0x76);
            Ok(found)
        }

        fn write(&mut self, _address: u8, register: u8, bytes: &[u8]) -> Result<(), Self::Error> {
            let start = usize::from(register);
            self.regs[start..start + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }

        fn read(&mut self, _address: u8, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
            let start = usize::from(register);
            buf.copy_from_slice(&self.regs[start..start + buf.len()]);
            Ok(())
        }
    }

    #[test]
    fn datasheet_compensation_example() {
        let (temperature, t_fine) = DATASHEET_TRIM.compensate_temperature(519888);
        assert!((temperature - 25.08).abs() < 0.01);

        let pressure = DATASHEET_TRIM.compensate_pressure(415148, t_fine).unwrap();
        assert!((pressure - 100653.27).abs() < 1.0);
    }

    #[test]
    fn standard_profile_wait_time() {
        assert_eq!(max_measurement_ms(OversamplingProfile::STANDARD), 14);
        let temperature_only = OversamplingProfile {
            pressure: Oversampling::Skip,
            temperature: Oversampling::X1,
        };
        assert_eq!(max_measurement_ms(temperature_only), 4);
    }

    #[test]
    fn configure_writes_filter_and_sleep_mode() {
        let mut sensor = Bmp280::new(RegisterFile::bmp280(), 0x76);
        sensor.init().unwrap();
        sensor
            .configure(OversamplingProfile::STANDARD, IirFilter::X4)
            .unwrap();

        let regs = sensor.release().regs;
        // osrs_t = x1 (001), osrs_p = x4 (011), mode = sleep (00)
        assert_eq!(regs[usize::from(BMP280_REG_CTRL_MEAS)], 0b001_011_00);
        assert_eq!(regs[usize::from(BMP280_REG_CONFIG)], 0b010 << 2);
    }

    #[test]
    fn forced_measurement_sets_forced_mode() {
        let mut sensor = Bmp280::new(RegisterFile::bmp280(), 0x76);
        sensor.init().unwrap();
        sensor
            .configure(OversamplingProfile::STANDARD, IirFilter::X4)
            .unwrap();
        sensor.force_measurement().unwrap();

        let regs = sensor.release().regs;
        assert_eq!(regs[usize::from(BMP280_REG_CTRL_MEAS)] & 0b11, MODE_FORCED);
    }

    #[test]
    fn reads_compensated_pressure() {
        let mut file = RegisterFile::bmp280();
        file.set_raw(415148, 519888);
        let mut sensor = Bmp280::new(file, 0x76);
        sensor.init().unwrap();

        let pressure = sensor.read_pressure().unwrap();
        assert!((pressure - 100653.27).abs() < 1.0);
    }

    #[test]
    fn skipped_conversion_is_reported() {
        let mut file = RegisterFile::bmp280();
        file.set_raw(BMP280_SKIPPED_READING, 519888);
        let mut sensor = Bmp280::new(file, 0x76);
        sensor.init().unwrap();

        assert_eq!(sensor.read_pressure(), Err(Bmp280Error::Skipped));
    }

    #[test]
    fn wrong_chip_id_rejected() {
        let mut file = RegisterFile::bmp280();
        file.regs[usize::from(BMP280_REG_CHIP_ID)] = 0x60; // BME280
        let mut sensor = Bmp280::new(file, 0x76);

        let error: InitError = sensor.init().unwrap_err().into();
        assert_eq!(error, InitError::WrongChip { expected: 0x58, found: 0x60 });
    }

    #[test]
    fn read_before_init_is_not_calibrated() {
        let mut sensor = Bmp280::new(RegisterFile::bmp280(), 0x76);
        let error: ReadError = sensor.read_pressure().unwrap_err().into();
        assert_eq!(error, ReadError::NotInitialized);
    }
}
