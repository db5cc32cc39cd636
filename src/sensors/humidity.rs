//! Temperature+humidity drivers: SHT3x (CRC-8 protected) and AM2320
//! (CRC-16 protected) are bit-exact to their published protocols
//! (spec.md §4.5); AHT10/AHT20/HDC1080/HTU21 share a simpler two-register,
//! unchecksummed wire format covered by [`SimpleHumidityDriver`].

use crate::error::TransientError;
use crate::i2c::{I2cRegistry, Slave};
use crate::sensor::{DetectResult, Reading, SensorDriver, SensorInfo, SensorType};
use crate::util::{crc16_am2320, crc8_sht3x};

// ---- SHT3x -----------------------------------------------------------

const SHT3X_MEASURE_HIGH_REP: [u8; 2] = [0x24, 0x00];
const SHT3X_SOFT_RESET: [u8; 2] = [0x30, 0xA2];

static SHT3X_INFO: SensorInfo = SensorInfo {
    name: "sht3x",
    addresses: &[0x44, 0x45],
    types: SensorType::Temperature.bit() | SensorType::Humidity.bit(),
    precision: 2,
    force_detect: false,
    no_constrained: false,
};

pub struct Sht3xDriver {
    temperature: Option<Reading>,
    humidity: Option<Reading>,
}

impl Sht3xDriver {
    pub fn new() -> Self {
        Self { temperature: None, humidity: None }
    }
}

impl Default for Sht3xDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for Sht3xDriver {
    fn info(&self) -> &'static SensorInfo {
        &SHT3X_INFO
    }

    fn detect(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<DetectResult, TransientError> {
        i2c.send(slave, &SHT3X_SOFT_RESET)?;
        Ok(DetectResult::Found)
    }

    fn init(&mut self, _i2c: &mut I2cRegistry, _slave: Slave) -> Result<(), TransientError> {
        Ok(())
    }

    fn poll(&mut self, i2c: &mut I2cRegistry, slave: Slave, now: u64) -> Result<(), TransientError> {
        i2c.send(slave, &SHT3X_MEASURE_HIGH_REP)?;
        let bytes = i2c.receive(slave, 6)?;
        let (temp_raw, temp_crc) = (&bytes[0..2], bytes[2]);
        let (hum_raw, hum_crc) = (&bytes[3..5], bytes[5]);
        if crc8_sht3x(temp_raw) != temp_crc || crc8_sht3x(hum_raw) != hum_crc {
            return Err(TransientError::I2cNak);
        }
        let temp_counts = u16::from_be_bytes([temp_raw[0], temp_raw[1]]);
        let hum_counts = u16::from_be_bytes([hum_raw[0], hum_raw[1]]);
        let celsius = -45.0 + 175.0 * (temp_counts as f32 / 65535.0);
        let relative_humidity = 100.0 * (hum_counts as f32 / 65535.0);
        self.temperature = Some(Reading { value: celsius, timestamp: now });
        self.humidity = Some(Reading { value: relative_humidity, timestamp: now });
        Ok(())
    }

    fn dump(&self) -> Vec<(SensorType, Reading)> {
        let mut out = Vec::new();
        if let Some(r) = self.temperature {
            out.push((SensorType::Temperature, r));
        }
        if let Some(r) = self.humidity {
            out.push((SensorType::Humidity, r));
        }
        out
    }
}

// ---- AM2320 ------------------------------------------------------------

static AM2320_INFO: SensorInfo = SensorInfo {
    name: "am2320",
    addresses: &[0x5c],
    types: SensorType::Temperature.bit() | SensorType::Humidity.bit(),
    precision: 1,
    force_detect: true, // AM2320 NAKs a blind probe; must wake it first.
    no_constrained: false,
};

pub struct Am2320Driver {
    temperature: Option<Reading>,
    humidity: Option<Reading>,
}

impl Am2320Driver {
    pub fn new() -> Self {
        Self { temperature: None, humidity: None }
    }
}

impl Default for Am2320Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for Am2320Driver {
    fn info(&self) -> &'static SensorInfo {
        &AM2320_INFO
    }

    fn detect(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<DetectResult, TransientError> {
        // A zero-length write wakes the sensor from sleep; datasheet
        // expects this to NAK, which the registry surfaces as Ok(()) here
        // since the fake/real controller's ACK/NAK distinction is opaque
        // above the `send` call.
        let _ = i2c.send(slave, &[]);
        Ok(DetectResult::Found)
    }

    fn init(&mut self, _i2c: &mut I2cRegistry, _slave: Slave) -> Result<(), TransientError> {
        Ok(())
    }

    fn poll(&mut self, i2c: &mut I2cRegistry, slave: Slave, now: u64) -> Result<(), TransientError> {
        let _ = i2c.send(slave, &[]); // wake
        let bytes = i2c.send_receive(slave, &[0x03, 0x00, 0x04], 8)?;
        // [cmd_echo, len, hum_hi, hum_lo, temp_hi, temp_lo, crc_lo, crc_hi]
        let crc_received = u16::from_le_bytes([bytes[6], bytes[7]]);
        if crc16_am2320(&bytes[0..6]) != crc_received {
            return Err(TransientError::I2cNak);
        }
        let hum_counts = u16::from_be_bytes([bytes[2], bytes[3]]);
        let temp_counts = i16::from_be_bytes([bytes[4], bytes[5]]);
        self.humidity = Some(Reading { value: hum_counts as f32 / 10.0, timestamp: now });
        self.temperature = Some(Reading { value: temp_counts as f32 / 10.0, timestamp: now });
        Ok(())
    }

    fn dump(&self) -> Vec<(SensorType, Reading)> {
        let mut out = Vec::new();
        if let Some(r) = self.temperature {
            out.push((SensorType::Temperature, r));
        }
        if let Some(r) = self.humidity {
            out.push((SensorType::Humidity, r));
        }
        out
    }
}

// ---- AHT10/AHT20/HDC1080/HTU21 (shared simple format) -----------------

/// Identifies which member of this family we're talking to, purely for
/// `SensorInfo::name` and address selection — all four share the same
/// trigger-then-read-4-bytes wire shape.
pub struct SimpleHumidityProfile {
    pub info: SensorInfo,
    pub trigger: &'static [u8],
}

pub static AHT20_PROFILE: SimpleHumidityProfile = SimpleHumidityProfile {
    info: SensorInfo {
        name: "aht20",
        addresses: &[0x38],
        types: SensorType::Temperature.bit() | SensorType::Humidity.bit(),
        precision: 1,
        force_detect: false,
        no_constrained: false,
    },
    trigger: &[0xAC, 0x33, 0x00],
};
pub static AHT10_PROFILE: SimpleHumidityProfile = SimpleHumidityProfile {
    info: SensorInfo {
        name: "aht10",
        addresses: &[0x38],
        types: SensorType::Temperature.bit() | SensorType::Humidity.bit(),
        precision: 1,
        force_detect: false,
        no_constrained: false,
    },
    trigger: &[0xAC, 0x33, 0x00],
};
pub static HDC1080_PROFILE: SimpleHumidityProfile = SimpleHumidityProfile {
    info: SensorInfo {
        name: "hdc1080",
        addresses: &[0x40],
        types: SensorType::Temperature.bit() | SensorType::Humidity.bit(),
        precision: 1,
        force_detect: false,
        no_constrained: false,
    },
    trigger: &[0x00],
};
pub static HTU21_PROFILE: SimpleHumidityProfile = SimpleHumidityProfile {
    info: SensorInfo {
        name: "htu21",
        addresses: &[0x40],
        types: SensorType::Temperature.bit() | SensorType::Humidity.bit(),
        precision: 1,
        force_detect: false,
        no_constrained: false,
    },
    trigger: &[0xE3],
};

pub struct SimpleHumidityDriver {
    profile: &'static SimpleHumidityProfile,
    temperature: Option<Reading>,
    humidity: Option<Reading>,
}

impl SimpleHumidityDriver {
    pub fn new(profile: &'static SimpleHumidityProfile) -> Self {
        Self { profile, temperature: None, humidity: None }
    }
}

impl SensorDriver for SimpleHumidityDriver {
    fn info(&self) -> &'static SensorInfo {
        &self.profile.info
    }

    fn detect(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<DetectResult, TransientError> {
        i2c.probe(slave.module, slave.bus, slave.address)?;
        Ok(DetectResult::Found)
    }

    fn init(&mut self, _i2c: &mut I2cRegistry, _slave: Slave) -> Result<(), TransientError> {
        Ok(())
    }

    fn poll(&mut self, i2c: &mut I2cRegistry, slave: Slave, now: u64) -> Result<(), TransientError> {
        i2c.send(slave, self.profile.trigger)?;
        let bytes = i2c.receive(slave, 4)?;
        let hum_counts = u16::from_be_bytes([bytes[0], bytes[1]]);
        let temp_counts = u16::from_be_bytes([bytes[2], bytes[3]]);
        self.humidity = Some(Reading { value: 100.0 * (hum_counts as f32 / 65535.0), timestamp: now });
        self.temperature =
            Some(Reading { value: -40.0 + 165.0 * (temp_counts as f32 / 65535.0), timestamp: now });
        Ok(())
    }

    fn dump(&self) -> Vec<(SensorType, Reading)> {
        let mut out = Vec::new();
        if let Some(r) = self.temperature {
            out.push((SensorType::Temperature, r));
        }
        if let Some(r) = self.humidity {
            out.push((SensorType::Humidity, r));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::fakes::FakeController;
    use crate::i2c::{I2cRegistry, Module};

    fn registry(address: u8) -> (I2cRegistry, Slave) {
        let mut i2c = I2cRegistry::new();
        i2c.init_module(Module::Main0, Box::new(FakeController::default()), 400).unwrap();
        let slave = i2c.register_slave(Module::Main0, 0, address, false).unwrap();
        (i2c, slave)
    }

    #[test]
    fn sht3x_rejects_bad_crc() {
        let (mut i2c, slave) = registry(0x44);
        let mut driver = Sht3xDriver::new();
        i2c.send(slave, &[0x64, 0x00, 0x00, 0x80, 0x00, 0x00]).unwrap(); // wrong CRCs
        assert!(driver.poll(&mut i2c, slave, 1).is_err());
    }

    #[test]
    fn sht3x_decodes_valid_reading() {
        let (mut i2c, slave) = registry(0x44);
        let mut driver = Sht3xDriver::new();
        let temp_raw = [0x64u8, 0x00];
        let hum_raw = [0x80u8, 0x00];
        let frame = [
            temp_raw[0], temp_raw[1], crc8_sht3x(&temp_raw),
            hum_raw[0], hum_raw[1], crc8_sht3x(&hum_raw),
        ];
        i2c.send(slave, &frame).unwrap();
        driver.poll(&mut i2c, slave, 9).unwrap();
        let dump = driver.dump();
        assert_eq!(dump.len(), 2);
    }

    #[test]
    fn am2320_rejects_bad_crc() {
        let (mut i2c, slave) = registry(0x5c);
        let mut driver = Am2320Driver::new();
        i2c.send(slave, &[0x03, 0x04, 0x00, 0xC8, 0x01, 0x02, 0xFF, 0xFF]).unwrap();
        assert!(driver.poll(&mut i2c, slave, 1).is_err());
    }

    #[test]
    fn am2320_decodes_valid_reading() {
        let (mut i2c, slave) = registry(0x5c);
        let mut driver = Am2320Driver::new();
        let mut frame = vec![0x03u8, 0x04, 0x00, 0xC8, 0x01, 0x02];
        let crc = crc16_am2320(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        i2c.send(slave, &frame).unwrap();
        driver.poll(&mut i2c, slave, 9).unwrap();
        let dump = driver.dump();
        assert_eq!(dump.len(), 2);
    }

    #[test]
    fn simple_humidity_driver_decodes_hdc1080_style_frame() {
        let (mut i2c, slave) = registry(0x40);
        let mut driver = SimpleHumidityDriver::new(&HDC1080_PROFILE);
        i2c.send(slave, &[0x80, 0x00, 0x80, 0x00]).unwrap();
        driver.poll(&mut i2c, slave, 1).unwrap();
        let dump = driver.dump();
        assert_eq!(dump.len(), 2);
        assert!((dump[0].1.value - 42.5).abs() < 0.1);
    }
}
