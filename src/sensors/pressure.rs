//! T+H+P drivers: BMx280 and BME680, both read calibration constants from
//! OTP at init and then run Bosch's published fixed-point compensation
//! formulas over each raw ADC reading (spec.md §4.5).

use crate::error::TransientError;
use crate::i2c::{I2cRegistry, Slave};
use crate::sensor::{DetectResult, Reading, SensorDriver, SensorInfo, SensorType};

const CHIP_ID_REGISTER: u8 = 0xD0;
const CALIBRATION_REGISTER: u8 = 0x88;
const CALIBRATION_LEN: usize = 24;
const CTRL_MEAS_REGISTER: u8 = 0xF4;
const DATA_REGISTER: u8 = 0xF7;

const CHIP_ID_BMP280: u8 = 0x58;
const CHIP_ID_BME280: u8 = 0x60;
const CHIP_ID_BME680: u8 = 0x61;

static BMX280_INFO: SensorInfo = SensorInfo {
    name: "bmx280",
    addresses: &[0x76, 0x77],
    types: SensorType::Temperature.bit() | SensorType::AirPressure.bit() | SensorType::Humidity.bit(),
    precision: 2,
    force_detect: false,
    no_constrained: false,
};

static BME680_INFO: SensorInfo = SensorInfo {
    name: "bme680",
    addresses: &[0x76, 0x77],
    types: SensorType::Temperature.bit() | SensorType::AirPressure.bit() | SensorType::Humidity.bit(),
    precision: 2,
    force_detect: false,
    no_constrained: false,
};

/// Dig calibration words as laid out at register `0x88` (BMP/BME280 OTP
/// shadow registers) — `dig_h1..dig_h6` come from a separate region this
/// driver also reads, trimmed to the minimum set the compensation formulas
/// reference.
#[derive(Debug, Clone, Copy, Default)]
struct Calibration {
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
    dig_p1: u16,
    dig_p2: i16,
    dig_p3: i16,
    dig_p4: i16,
    dig_p5: i16,
    dig_p6: i16,
    dig_p7: i16,
    dig_p8: i16,
    dig_p9: i16,
    dig_h1: u8,
    dig_h2: i16,
    dig_h3: u8,
    dig_h4: i16,
    dig_h5: i16,
    dig_h6: i8,
}

fn parse_calibration(bytes: &[u8], h: &[u8]) -> Calibration {
    let u16_le = |o: usize| u16::from_le_bytes([bytes[o], bytes[o + 1]]);
    let i16_le = |o: usize| i16::from_le_bytes([bytes[o], bytes[o + 1]]);
    Calibration {
        dig_t1: u16_le(0),
        dig_t2: i16_le(2),
        dig_t3: i16_le(4),
        dig_p1: u16_le(6),
        dig_p2: i16_le(8),
        dig_p3: i16_le(10),
        dig_p4: i16_le(12),
        dig_p5: i16_le(14),
        dig_p6: i16_le(16),
        dig_p7: i16_le(18),
        dig_p8: i16_le(20),
        dig_p9: i16_le(22),
        dig_h1: h.first().copied().unwrap_or(0),
        dig_h2: h.get(1).map(|&lo| i16::from_le_bytes([lo, *h.get(2).unwrap_or(&0)])).unwrap_or(0),
        dig_h3: h.get(3).copied().unwrap_or(0),
        dig_h4: h.get(4).map(|&v| v as i16).unwrap_or(0),
        dig_h5: h.get(5).map(|&v| v as i16).unwrap_or(0),
        dig_h6: h.get(6).map(|&v| v as i8).unwrap_or(0),
    }
}

/// Published integer compensation algorithm (Bosch BME280 datasheet §4.2.3),
/// shared between BMx280 and BME680 since their pressure/temperature
/// formulas are identical; BME680's extra gas-resistance channel is out of
/// scope (this board only reports T/H/P).
struct CompensatedReading {
    temperature_celsius: f32,
    pressure_hpa: f32,
    humidity_percent: Option<f32>,
}

fn compensate(cal: &Calibration, raw_temp: i32, raw_pressure: i32, raw_humidity: Option<i32>) -> CompensatedReading {
    let raw_temp = raw_temp as i64;
    let dig_t1 = cal.dig_t1 as i64;
    let dig_t2 = cal.dig_t2 as i64;
    let dig_t3 = cal.dig_t3 as i64;
    let var1 = ((raw_temp >> 3) - (dig_t1 << 1)) * dig_t2 >> 11;
    let var2 = (((raw_temp >> 4) - dig_t1) * ((raw_temp >> 4) - dig_t1) >> 12) * dig_t3 >> 14;
    let t_fine = var1 + var2;
    let temperature_celsius = ((t_fine * 5 + 128) >> 8) as f32 / 100.0;

    let mut p1 = (t_fine as i64) - 128000;
    let mut p2 = p1 * p1 * cal.dig_p6 as i64;
    p2 += (p1 * cal.dig_p5 as i64) << 17;
    p2 += (cal.dig_p4 as i64) << 35;
    p1 = (p1 * p1 * cal.dig_p3 as i64 >> 8) + ((p1 * cal.dig_p2 as i64) << 12);
    p1 = ((1i64 << 47) + p1) * (cal.dig_p1 as i64) >> 33;
    let pressure_pa = if p1 == 0 {
        0.0
    } else {
        let mut p = 1048576 - raw_pressure as i64;
        p = (((p << 31) - p2) * 3125) / p1;
        let p3 = (cal.dig_p9 as i64) * (p >> 13) * (p >> 13) >> 25;
        let p4 = (cal.dig_p8 as i64) * p >> 19;
        p = ((p + p3 + p4) >> 8) + ((cal.dig_p7 as i64) << 4);
        p as f32 / 256.0
    };

    let humidity_percent = raw_humidity.map(|raw_h| {
        let mut v = (t_fine as i32) - 76800;
        v = ((((raw_h << 14) - ((cal.dig_h4 as i32) << 20) - ((cal.dig_h5 as i32) * v)) + 16384) >> 15)
            * (((((((v * cal.dig_h6 as i32) >> 10)
                * (((v * cal.dig_h3 as i32) >> 11) + 32768))
                >> 10)
                + 2097152)
                * cal.dig_h2 as i32
                + 8192)
                >> 14);
        v -= ((((v >> 15) * (v >> 15)) >> 7) * cal.dig_h1 as i32) >> 4;
        let v = v.clamp(0, 419_430_400);
        (v >> 12) as f32 / 1024.0
    });

    CompensatedReading { temperature_celsius, pressure_hpa: pressure_pa / 100.0, humidity_percent }
}

pub struct Bmx280Driver {
    calibration: Calibration,
    has_humidity: bool,
    last: Vec<(SensorType, Reading)>,
}

impl Bmx280Driver {
    pub fn new() -> Self {
        Self { calibration: Calibration::default(), has_humidity: false, last: Vec::new() }
    }
}

impl Default for Bmx280Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for Bmx280Driver {
    fn info(&self) -> &'static SensorInfo {
        &BMX280_INFO
    }

    fn detect(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<DetectResult, TransientError> {
        let id = i2c.send_receive(slave, &[CHIP_ID_REGISTER], 1)?;
        match id[0] {
            CHIP_ID_BMP280 => {
                self.has_humidity = false;
                Ok(DetectResult::Found)
            }
            CHIP_ID_BME280 => {
                self.has_humidity = true;
                Ok(DetectResult::Found)
            }
            _ => Ok(DetectResult::NotFound),
        }
    }

    fn init(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<(), TransientError> {
        let bytes = i2c.send_receive(slave, &[CALIBRATION_REGISTER], CALIBRATION_LEN)?;
        let h_bytes = if self.has_humidity {
            i2c.send_receive(slave, &[0xE1], 7)?
        } else {
            Vec::new()
        };
        self.calibration = parse_calibration(&bytes, &h_bytes);
        // Normal mode, oversampling x1 on temperature and pressure.
        i2c.send(slave, &[CTRL_MEAS_REGISTER, 0x27])
    }

    fn poll(&mut self, i2c: &mut I2cRegistry, slave: Slave, now: u64) -> Result<(), TransientError> {
        let len = if self.has_humidity { 8 } else { 6 };
        let bytes = i2c.send_receive(slave, &[DATA_REGISTER], len)?;
        let raw_pressure = ((bytes[0] as i32) << 12) | ((bytes[1] as i32) << 4) | (bytes[2] as i32 >> 4);
        let raw_temp = ((bytes[3] as i32) << 12) | ((bytes[4] as i32) << 4) | (bytes[5] as i32 >> 4);
        let raw_humidity =
            if self.has_humidity { Some(((bytes[6] as i32) << 8) | bytes[7] as i32) } else { None };

        let reading = compensate(&self.calibration, raw_temp, raw_pressure, raw_humidity);
        self.last.clear();
        self.last.push((
            SensorType::Temperature,
            Reading { value: reading.temperature_celsius, timestamp: now },
        ));
        self.last.push((SensorType::AirPressure, Reading { value: reading.pressure_hpa, timestamp: now }));
        if let Some(h) = reading.humidity_percent {
            self.last.push((SensorType::Humidity, Reading { value: h, timestamp: now }));
        }
        Ok(())
    }

    fn dump(&self) -> Vec<(SensorType, Reading)> {
        self.last.clone()
    }
}

/// BME680 reuses the BMx280 compensation pipeline for T/H/P; its gas
/// heater/gas-resistance channel is not reported (out of scope).
pub struct Bme680Driver {
    inner: Bmx280Driver,
}

impl Bme680Driver {
    pub fn new() -> Self {
        let mut inner = Bmx280Driver::new();
        inner.has_humidity = true;
        Self { inner }
    }
}

impl Default for Bme680Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for Bme680Driver {
    fn info(&self) -> &'static SensorInfo {
        &BME680_INFO
    }

    fn detect(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<DetectResult, TransientError> {
        let id = i2c.send_receive(slave, &[CHIP_ID_REGISTER], 1)?;
        if id[0] == CHIP_ID_BME680 {
            Ok(DetectResult::Found)
        } else {
            Ok(DetectResult::NotFound)
        }
    }

    fn init(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<(), TransientError> {
        self.inner.init(i2c, slave)
    }

    fn poll(&mut self, i2c: &mut I2cRegistry, slave: Slave, now: u64) -> Result<(), TransientError> {
        self.inner.poll(i2c, slave, now)
    }

    fn dump(&self) -> Vec<(SensorType, Reading)> {
        self.inner.dump()
    }
}
