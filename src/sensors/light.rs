//! Ambient-light drivers: a shared auto-ranging engine (spec.md §4.5: "all
//! auto-ranged") used by every chip in this class, BH1750 included.

use crate::error::TransientError;
use crate::i2c::{I2cRegistry, Slave};
use crate::sensor::{DetectResult, Reading, SensorDriver, SensorInfo, SensorType};

// ---- BH1750 --------------------------------------------------------
//
// BH1750 has no register pointer: each one-shot measurement opcode both
// selects a resolution/measurement-time combination and triggers a single
// conversion. `apply_range` writes the two change-measurement-time opcodes
// followed by the one-shot opcode as three separate single-byte
// transactions (unlike the register+data writes the other chips in this
// file use in one transaction), and `read_raw` collects the two result
// bytes the next poll after that.

const BH1750_OPCODE_CHANGE_MEAS_HI: u8 = 0x40;
const BH1750_OPCODE_CHANGE_MEAS_LO: u8 = 0x60;
const BH1750_OPCODE_ONE_HMODE2: u8 = 0x21;
const BH1750_OPCODE_ONE_LMODE: u8 = 0x23;

static BH1750_INFO: SensorInfo = SensorInfo {
    name: "bh1750",
    addresses: &[0x23, 0x5c],
    types: SensorType::VisibleLight.bit(),
    precision: 1,
    force_detect: false,
    no_constrained: false,
};

const fn bh1750_select(mt: u8, opcode: u8) -> [u8; 3] {
    [
        BH1750_OPCODE_CHANGE_MEAS_HI | ((mt >> 5) & 0x07),
        BH1750_OPCODE_CHANGE_MEAS_LO | (mt & 0x1F),
        opcode,
    ]
}

static BH1750_SELECT_0: [u8; 3] = bh1750_select(254, BH1750_OPCODE_ONE_HMODE2);
static BH1750_SELECT_1: [u8; 3] = bh1750_select(69, BH1750_OPCODE_ONE_HMODE2);
static BH1750_SELECT_2: [u8; 3] = bh1750_select(31, BH1750_OPCODE_ONE_HMODE2);
static BH1750_SELECT_3: [u8; 3] = bh1750_select(31, BH1750_OPCODE_ONE_LMODE);

// Measurement-time scalings and conversion factors lifted from the
// `bh1750_autoranging_data` table (examples/original_source/main/sensor.cpp).
static BH1750_RANGES: &[LightRange] = &[
    LightRange { select: &BH1750_SELECT_0, overflow_raw: 50000, step_down_below_raw: 0, factor: 0.13 },
    LightRange { select: &BH1750_SELECT_1, overflow_raw: 50000, step_down_below_raw: 1000, factor: 0.50 },
    LightRange { select: &BH1750_SELECT_2, overflow_raw: 50000, step_down_below_raw: 1000, factor: 1.10 },
    LightRange { select: &BH1750_SELECT_3, overflow_raw: 65535, step_down_below_raw: 1000, factor: 2.40 },
];

pub struct Bh1750;

impl LightChip for Bh1750 {
    fn info(&self) -> &'static SensorInfo {
        &BH1750_INFO
    }

    fn ranges(&self) -> &'static [LightRange] {
        BH1750_RANGES
    }

    fn read_raw(&self, i2c: &mut I2cRegistry, slave: Slave) -> Result<u32, TransientError> {
        let bytes = i2c.receive(slave, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as u32)
    }

    fn apply_range(&self, i2c: &mut I2cRegistry, slave: Slave, range: &LightRange) -> Result<(), TransientError> {
        for &opcode in range.select {
            i2c.send(slave, &[opcode])?;
        }
        Ok(())
    }
}

pub type Bh1750Driver = AutoRangingLightDriver<Bh1750>;

// ---- Generic auto-ranging engine ------------------------------------

/// One entry in a chip's range table: the register write(s) that select
/// this range, the raw-count thresholds that trigger stepping up (too
/// bright, about to saturate) or down (too dim, poor resolution), and the
/// linear factor that converts a raw count at this range into lux.
pub struct LightRange {
    pub select: &'static [u8],
    pub overflow_raw: u32,
    pub step_down_below_raw: u32,
    pub factor: f32,
}

/// The chip-specific half of an auto-ranging light driver: how to read a
/// raw count and how to apply a range selection. Everything else (the
/// detect/init/poll state machine, the "adjust OR measure, never both"
/// rule) is shared in [`AutoRangingLightDriver`].
pub trait LightChip: Send {
    fn info(&self) -> &'static SensorInfo;
    fn ranges(&self) -> &'static [LightRange];
    fn read_raw(&self, i2c: &mut I2cRegistry, slave: Slave) -> Result<u32, TransientError>;
    fn apply_range(&self, i2c: &mut I2cRegistry, slave: Slave, range: &LightRange) -> Result<(), TransientError>;
}

pub struct AutoRangingLightDriver<C: LightChip> {
    chip: C,
    range_index: usize,
    pending_adjust: Option<usize>,
    last: Option<Reading>,
}

impl<C: LightChip> AutoRangingLightDriver<C> {
    pub fn new(chip: C) -> Self {
        Self { chip, range_index: 0, pending_adjust: None, last: None }
    }
}

impl<C: LightChip + 'static> SensorDriver for AutoRangingLightDriver<C> {
    fn info(&self) -> &'static SensorInfo {
        self.chip.info()
    }

    fn detect(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<DetectResult, TransientError> {
        self.chip.read_raw(i2c, slave)?;
        Ok(DetectResult::Found)
    }

    fn init(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<(), TransientError> {
        self.range_index = 0;
        let ranges = self.chip.ranges();
        self.chip.apply_range(i2c, slave, &ranges[0])
    }

    fn poll(&mut self, i2c: &mut I2cRegistry, slave: Slave, now: u64) -> Result<(), TransientError> {
        let ranges = self.chip.ranges();

        if let Some(next_index) = self.pending_adjust.take() {
            self.chip.apply_range(i2c, slave, &ranges[next_index])?;
            self.range_index = next_index;
            return Ok(());
        }

        let raw = self.chip.read_raw(i2c, slave)?;
        let range = &ranges[self.range_index];
        self.last = Some(Reading { value: raw as f32 * range.factor, timestamp: now });

        if raw >= range.overflow_raw && self.range_index + 1 < ranges.len() {
            self.pending_adjust = Some(self.range_index + 1);
        } else if raw < range.step_down_below_raw && self.range_index > 0 {
            self.pending_adjust = Some(self.range_index - 1);
        }
        Ok(())
    }

    fn dump(&self) -> Vec<(SensorType, Reading)> {
        self.last.map(|r| vec![(SensorType::VisibleLight, r)]).unwrap_or_default()
    }
}

macro_rules! light_chip {
    ($chip:ident, $info_name:ident, $name:expr, $addresses:expr, $reg_raw:expr, $ranges_name:ident, $ranges:expr) => {
        static $info_name: SensorInfo = SensorInfo {
            name: $name,
            addresses: $addresses,
            types: SensorType::VisibleLight.bit(),
            precision: 2,
            force_detect: false,
            no_constrained: false,
        };

        static $ranges_name: &[LightRange] = &$ranges;

        pub struct $chip;

        impl LightChip for $chip {
            fn info(&self) -> &'static SensorInfo {
                &$info_name
            }

            fn ranges(&self) -> &'static [LightRange] {
                $ranges_name
            }

            fn read_raw(&self, i2c: &mut I2cRegistry, slave: Slave) -> Result<u32, TransientError> {
                let bytes = i2c.send_receive(slave, &[$reg_raw], 2)?;
                Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as u32)
            }

            fn apply_range(&self, i2c: &mut I2cRegistry, slave: Slave, range: &LightRange) -> Result<(), TransientError> {
                i2c.send(slave, range.select)
            }
        }
    };
}

light_chip!(
    Opt3001, OPT3001_INFO, "opt3001", &[0x44, 0x45], 0x00, OPT3001_RANGES,
    [
        LightRange { select: &[0x01, 0xC4, 0x10], overflow_raw: 0xF000, step_down_below_raw: 0, factor: 0.01 },
        LightRange { select: &[0x01, 0xCC, 0x10], overflow_raw: 0xF000, step_down_below_raw: 0x2000, factor: 0.08 },
        LightRange { select: &[0x01, 0xD4, 0x10], overflow_raw: 0xFFFF, step_down_below_raw: 0x2000, factor: 1.28 },
    ]
);

light_chip!(
    Max44009, MAX44009_INFO, "max44009", &[0x4a, 0x4b], 0x03, MAX44009_RANGES,
    [
        LightRange { select: &[0x02, 0x00], overflow_raw: 0xFF, step_down_below_raw: 0, factor: 0.045 },
        LightRange { select: &[0x02, 0x40], overflow_raw: 0xFF, step_down_below_raw: 0x20, factor: 0.72 },
    ]
);

light_chip!(
    Tsl2561, TSL2561_INFO, "tsl2561", &[0x29, 0x39, 0x49], 0xAC, TSL2561_RANGES,
    [
        LightRange { select: &[0x80, 0x03], overflow_raw: 0xFFFF, step_down_below_raw: 0, factor: 0.0072 },
        LightRange { select: &[0x80, 0x02], overflow_raw: 0xFFFF, step_down_below_raw: 0x1000, factor: 0.115 },
    ]
);

light_chip!(
    Veml7700, VEML7700_INFO, "veml7700", &[0x10], 0x04, VEML7700_RANGES,
    [
        LightRange { select: &[0x00, 0x00, 0x10], overflow_raw: 0xFFFF, step_down_below_raw: 0, factor: 0.0036 },
        LightRange { select: &[0x00, 0x00, 0x00], overflow_raw: 0xFFFF, step_down_below_raw: 0x1000, factor: 0.0288 },
    ]
);

light_chip!(
    Apds9930, APDS9930_INFO, "apds9930", &[0x39], 0x94, APDS9930_RANGES,
    [
        LightRange { select: &[0x8D, 0x01], overflow_raw: 0xFFFF, step_down_below_raw: 0, factor: 0.01 },
        LightRange { select: &[0x8D, 0x20], overflow_raw: 0xFFFF, step_down_below_raw: 0x1000, factor: 0.16 },
    ]
);

light_chip!(
    Apds9960, APDS9960_INFO, "apds9960", &[0x39], 0x94, APDS9960_RANGES,
    [
        LightRange { select: &[0x8F, 0x00], overflow_raw: 0xFFFF, step_down_below_raw: 0, factor: 0.01 },
        LightRange { select: &[0x8F, 0x03], overflow_raw: 0xFFFF, step_down_below_raw: 0x1000, factor: 0.08 },
    ]
);

light_chip!(
    Tsl2591, TSL2591_INFO, "tsl2591", &[0x29], 0xB4, TSL2591_RANGES,
    [
        LightRange { select: &[0xA1, 0x10], overflow_raw: 0xFFFF, step_down_below_raw: 0, factor: 0.0015 },
        LightRange { select: &[0xA1, 0x40], overflow_raw: 0xFFFF, step_down_below_raw: 0x1000, factor: 0.024 },
        LightRange { select: &[0xA1, 0x60], overflow_raw: 0xFFFF, step_down_below_raw: 0x800, factor: 0.384 },
    ]
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::fakes::FakeController;
    use crate::i2c::{I2cRegistry, Module};

    fn registry() -> I2cRegistry {
        let mut registry = I2cRegistry::new();
        registry.init_module(Module::Main0, Box::new(FakeController::default()), 400).unwrap();
        registry
    }

    #[test]
    fn bh1750_poll_applies_lowest_range_factor() {
        let mut i2c = registry();
        let slave = i2c.register_slave(Module::Main0, 0, 0x23, false).unwrap();
        let mut driver = Bh1750Driver::new(Bh1750);
        driver.init(&mut i2c, slave).unwrap();
        // Seed the fake register the BH1750 one-shot read returns (raw 1200).
        i2c.send(slave, &[0x04, 0xb0]).unwrap();
        driver.poll(&mut i2c, slave, 5).unwrap();
        let dump = driver.dump();
        assert_eq!(dump.len(), 1);
        assert!((dump[0].1.value - (0x04b0_u16 as f32 * 0.13)).abs() < 0.01);
    }

    #[test]
    fn bh1750_steps_down_scaling_on_low_reading_without_measuring_on_the_adjust_tick() {
        let mut i2c = registry();
        let slave = i2c.register_slave(Module::Main0, 0, 0x23, false).unwrap();
        let mut driver = Bh1750Driver::new(Bh1750);
        driver.init(&mut i2c, slave).unwrap();
        driver.range_index = 2;
        // 999 < range 2's step-down threshold of 1000.
        i2c.send(slave, &[0x03, 0xE7]).unwrap();
        driver.poll(&mut i2c, slave, 1).unwrap(); // measure: detects the low reading, queues step-down
        assert_eq!(driver.range_index, 2);
        let before = driver.dump();
        driver.poll(&mut i2c, slave, 2).unwrap(); // adjust-only tick: scaling steps to 1, no new value
        assert_eq!(driver.range_index, 1);
        assert_eq!(driver.dump(), before);
    }

    #[test]
    fn opt3001_steps_up_range_on_overflow() {
        let mut i2c = registry();
        let slave = i2c.register_slave(Module::Main0, 0, 0x44, false).unwrap();
        let mut driver = AutoRangingLightDriver::new(Opt3001);
        driver.init(&mut i2c, slave).unwrap();
        i2c.send(slave, &[0xFF, 0x00]).unwrap(); // overflow-range raw reading
        driver.poll(&mut i2c, slave, 1).unwrap(); // measure: detects overflow, queues adjust
        assert_eq!(driver.range_index, 0);
        driver.poll(&mut i2c, slave, 2).unwrap(); // applies the queued adjust
        assert_eq!(driver.range_index, 1);
    }

    #[test]
    fn auto_range_adjust_and_measure_never_happen_on_the_same_tick() {
        let mut i2c = registry();
        let slave = i2c.register_slave(Module::Main0, 0, 0x4a, false).unwrap();
        let mut driver = AutoRangingLightDriver::new(Max44009);
        driver.init(&mut i2c, slave).unwrap();
        i2c.send(slave, &[0xFF, 0x00]).unwrap();
        driver.poll(&mut i2c, slave, 1).unwrap();
        let before = driver.dump();
        driver.poll(&mut i2c, slave, 2).unwrap();
        let after = driver.dump();
        // The adjust tick doesn't take a new measurement.
        assert_eq!(before, after);
    }
}
