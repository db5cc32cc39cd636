//! TMP75/LM75-class temperature-only sensors: one 16-bit signed register,
//! 9-12 bit resolution depending on variant, 0.0625 °C/count at 12-bit.

use crate::error::TransientError;
use crate::i2c::{I2cRegistry, Slave};
use crate::sensor::{DetectResult, Reading, SensorDriver, SensorInfo, SensorType};

const TEMP_REGISTER: u8 = 0x00;
const CONFIG_REGISTER: u8 = 0x01;

static TMP75_INFO: SensorInfo = SensorInfo {
    name: "tmp75",
    addresses: &[0x48, 0x49, 0x4a, 0x4b, 0x4c, 0x4d, 0x4e, 0x4f],
    types: SensorType::Temperature.bit(),
    precision: 2,
    force_detect: false,
    no_constrained: false,
};

pub struct Tmp75Driver {
    last: Option<Reading>,
}

impl Tmp75Driver {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Default for Tmp75Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for Tmp75Driver {
    fn info(&self) -> &'static SensorInfo {
        &TMP75_INFO
    }

    fn detect(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<DetectResult, TransientError> {
        let bytes = i2c.send_receive(slave, &[TEMP_REGISTER], 2)?;
        // A floating/absent device tends to read back as all-ones.
        if bytes == [0xff, 0xff] {
            Ok(DetectResult::NotFound)
        } else {
            Ok(DetectResult::Found)
        }
    }

    fn init(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<(), TransientError> {
        // Continuous conversion, 12-bit resolution.
        i2c.send(slave, &[CONFIG_REGISTER, 0x60])
    }

    fn poll(&mut self, i2c: &mut I2cRegistry, slave: Slave, now: u64) -> Result<(), TransientError> {
        let bytes = i2c.send_receive(slave, &[TEMP_REGISTER], 2)?;
        let raw = i16::from_be_bytes([bytes[0], bytes[1]]) >> 4; // 12-bit, left-justified
        let celsius = raw as f32 * 0.0625;
        self.last = Some(Reading { value: celsius, timestamp: now });
        Ok(())
    }

    fn dump(&self) -> Vec<(SensorType, Reading)> {
        self.last.map(|r| vec![(SensorType::Temperature, r)]).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::fakes::FakeController;
    use crate::i2c::{I2cRegistry, Module};

    fn registry() -> (I2cRegistry, Slave) {
        let mut i2c = I2cRegistry::new();
        i2c.init_module(Module::Main0, Box::new(FakeController::default()), 400).unwrap();
        let slave = i2c.register_slave(Module::Main0, 0, 0x48, false).unwrap();
        (i2c, slave)
    }

    #[test]
    fn detect_rejects_all_ones_readback() {
        let (mut i2c, slave) = registry();
        i2c.send(slave, &[0xff, 0xff]).unwrap();
        let mut driver = Tmp75Driver::new();
        assert_eq!(driver.detect(&mut i2c, slave).unwrap(), DetectResult::NotFound);
    }

    #[test]
    fn poll_converts_raw_12_bit_counts_to_celsius() {
        let (mut i2c, slave) = registry();
        let mut driver = Tmp75Driver::new();
        driver.init(&mut i2c, slave).unwrap();
        // 0x1900 >> 4 = 0x0190 = 400 counts; 400 * 0.0625 = 25.0 C.
        i2c.send(slave, &[0x19, 0x00]).unwrap();
        driver.poll(&mut i2c, slave, 1).unwrap();
        let dump = driver.dump();
        assert!((dump[0].1.value - 25.0).abs() < 0.001);
    }

    #[test]
    fn negative_temperature_decodes_correctly() {
        let (mut i2c, slave) = registry();
        let mut driver = Tmp75Driver::new();
        driver.init(&mut i2c, slave).unwrap();
        // -10.0 C => raw counts -160 => 0xFF60 before shift.
        i2c.send(slave, &[0xFF, 0x60]).unwrap();
        driver.poll(&mut i2c, slave, 1).unwrap();
        let dump = driver.dump();
        assert!((dump[0].1.value - (-10.0)).abs() < 0.001);
    }
}
