//! Per-device state-machine sensor poller (spec.md §4.5): startup
//! detection across compiled-in drivers, then a steady-state 1 Hz poll
//! loop writing into a shared value table.

use crate::error::TransientError;
use crate::i2c::{I2cRegistry, Module, Slave};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    VisibleLight,
    Temperature,
    Humidity,
    AirPressure,
}

impl SensorType {
    pub const ALL: [SensorType; 4] = [
        SensorType::VisibleLight,
        SensorType::Temperature,
        SensorType::Humidity,
        SensorType::AirPressure,
    ];

    fn index(self) -> usize {
        match self {
            SensorType::VisibleLight => 0,
            SensorType::Temperature => 1,
            SensorType::Humidity => 2,
            SensorType::AirPressure => 3,
        }
    }

    pub const fn bit(self) -> u8 {
        match self {
            SensorType::VisibleLight => 0b0001,
            SensorType::Temperature => 0b0010,
            SensorType::Humidity => 0b0100,
            SensorType::AirPressure => 0b1000,
        }
    }
}

/// Static descriptor for a compiled-in driver (spec.md §3 `SensorRecord.info`).
pub struct SensorInfo {
    pub name: &'static str,
    /// Candidate 7-bit addresses this driver answers to, tried in order.
    pub addresses: &'static [u8],
    pub types: u8,
    pub precision: u8,
    pub force_detect: bool,
    pub no_constrained: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectResult {
    Found,
    Disabled,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Found,
    NotFound,
    Disabled,
}

/// One measurement slot: value plus the wall-clock second it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f32,
    pub timestamp: u64,
}

/// A device driver's state machine: detect → init → repeated poll/dump.
/// The per-driver scaling/auto-range state lives behind the trait object,
/// not in `SensorRecord`, since it's wholly private to each driver
/// (spec.md §3: "private: opaque per-driver scratch").
pub trait SensorDriver: Send {
    fn info(&self) -> &'static SensorInfo;
    fn detect(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<DetectResult, TransientError>;
    fn init(&mut self, i2c: &mut I2cRegistry, slave: Slave) -> Result<(), TransientError>;
    /// One poll tick: either takes/starts a measurement or performs an
    /// auto-range adjustment, never both (spec.md §4.5).
    fn poll(&mut self, i2c: &mut I2cRegistry, slave: Slave, now: u64) -> Result<(), TransientError>;
    fn dump(&self) -> Vec<(SensorType, Reading)>;
}

pub struct SensorRecord {
    pub slave: Slave,
    pub state: SensorState,
    pub driver: Box<dyn SensorDriver>,
    values: [Option<Reading>; 4],
}

impl SensorRecord {
    pub fn value(&self, kind: SensorType) -> Option<Reading> {
        self.values[kind.index()]
    }

    fn refresh_values(&mut self) {
        for (kind, reading) in self.driver.dump() {
            self.values[kind.index()] = Some(reading);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleCounters {
    pub sensors_probed: u32,
    pub sensors_found: u32,
    pub sensors_confirmed: u32,
    pub sensors_disabled: u32,
    pub poll_run: u32,
    pub poll_ok: u32,
    pub poll_error: u32,
    pub poll_skipped: u32,
}

pub fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

pub struct SensorPoller {
    records: Vec<SensorRecord>,
    counters: std::collections::HashMap<Module, ModuleCounters>,
}

impl SensorPoller {
    pub fn new() -> Self {
        Self { records: Vec::new(), counters: std::collections::HashMap::new() }
    }

    pub fn counters(&self, module: Module) -> ModuleCounters {
        self.counters.get(&module).copied().unwrap_or_default()
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    /// Runs the startup detection sweep for `(module, bus)` over
    /// `candidates`, in the fixed order given (spec.md §4.5 steps 1-5).
    pub fn detect_bus(
        &mut self,
        i2c: &mut I2cRegistry,
        module: Module,
        bus: u8,
        mut candidates: Vec<Box<dyn SensorDriver>>,
    ) -> Result<(), TransientError> {
        let counters = self.counters.entry(module).or_default();
        'candidate: for mut driver in candidates.drain(..) {
            let info = driver.info();

            if info.no_constrained && module.is_constrained() {
                continue; // not_considered
            }

            for &address in info.addresses {
                if i2c.is_registered(module, bus, address) {
                    continue; // skipped: another sensor already claimed it
                }

                if !info.force_detect {
                    counters.sensors_probed += 1;
                    match i2c.probe(module, bus, address) {
                        Ok(true) => {}
                        _ => continue,
                    }
                }

                let slave = i2c.register_slave(module, bus, address, info.no_constrained)?;
                match driver.detect(i2c, slave) {
                    Ok(DetectResult::Found) => {
                        counters.sensors_found += 1;
                        if driver.init(i2c, slave).is_err() {
                            i2c.unregister_slave(slave);
                            continue 'candidate;
                        }
                        counters.sensors_confirmed += 1;
                        self.records.push(SensorRecord {
                            slave,
                            state: SensorState::Found,
                            driver,
                            values: [None; 4],
                        });
                        continue 'candidate;
                    }
                    Ok(DetectResult::Disabled) => {
                        counters.sensors_disabled += 1;
                        self.records.push(SensorRecord {
                            slave,
                            state: SensorState::Disabled,
                            driver,
                            values: [None; 4],
                        });
                        continue 'candidate;
                    }
                    Ok(DetectResult::NotFound) | Err(_) => {
                        i2c.unregister_slave(slave);
                    }
                }
            }
        }
        Ok(())
    }

    /// One 1 Hz steady-state tick: calls `poll` on every `Found` record.
    pub fn poll_once(&mut self, i2c: &mut I2cRegistry, now: u64) {
        for record in &mut self.records {
            if record.state != SensorState::Found {
                let counters = self.counters.entry(record.slave.module).or_default();
                counters.poll_skipped += 1;
                continue;
            }
            let counters = self.counters.entry(record.slave.module).or_default();
            counters.poll_run += 1;
            match record.driver.poll(i2c, record.slave, now) {
                Ok(()) => {
                    self.counters.entry(record.slave.module).or_default().poll_ok += 1;
                    record.refresh_values();
                }
                Err(_) => {
                    self.counters.entry(record.slave.module).or_default().poll_error += 1;
                }
            }
        }
    }
}

impl Default for SensorPoller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::fakes::FakeController;

    struct AlwaysFoundDriver {
        info: &'static SensorInfo,
        polled: u32,
    }

    static TEST_INFO: SensorInfo = SensorInfo {
        name: "test-sensor",
        addresses: &[0x23],
        types: SensorType::Temperature.bit(),
        precision: 1,
        force_detect: true,
        no_constrained: false,
    };

    impl SensorDriver for AlwaysFoundDriver {
        fn info(&self) -> &'static SensorInfo {
            self.info
        }

        fn detect(&mut self, _i2c: &mut I2cRegistry, _slave: Slave) -> Result<DetectResult, TransientError> {
            Ok(DetectResult::Found)
        }

        fn init(&mut self, _i2c: &mut I2cRegistry, _slave: Slave) -> Result<(), TransientError> {
            Ok(())
        }

        fn poll(&mut self, _i2c: &mut I2cRegistry, _slave: Slave, _now: u64) -> Result<(), TransientError> {
            self.polled += 1;
            Ok(())
        }

        fn dump(&self) -> Vec<(SensorType, Reading)> {
            vec![(SensorType::Temperature, Reading { value: 21.5, timestamp: 0 })]
        }
    }

    fn registry() -> I2cRegistry {
        let mut registry = I2cRegistry::new();
        registry.init_module(Module::Main0, Box::new(FakeController::default()), 400).unwrap();
        registry
    }

    #[test]
    fn force_detect_driver_is_found_and_confirmed() {
        let mut i2c = registry();
        let mut poller = SensorPoller::new();
        let candidates: Vec<Box<dyn SensorDriver>> =
            vec![Box::new(AlwaysFoundDriver { info: &TEST_INFO, polled: 0 })];
        poller.detect_bus(&mut i2c, Module::Main0, 0, candidates).unwrap();
        assert_eq!(poller.records().len(), 1);
        assert_eq!(poller.counters(Module::Main0).sensors_confirmed, 1);
    }

    #[test]
    fn poll_once_updates_values_and_counters() {
        let mut i2c = registry();
        let mut poller = SensorPoller::new();
        let candidates: Vec<Box<dyn SensorDriver>> =
            vec![Box::new(AlwaysFoundDriver { info: &TEST_INFO, polled: 0 })];
        poller.detect_bus(&mut i2c, Module::Main0, 0, candidates).unwrap();
        poller.poll_once(&mut i2c, 1000);
        assert_eq!(poller.counters(Module::Main0).poll_ok, 1);
        let reading = poller.records()[0].value(SensorType::Temperature).unwrap();
        assert_eq!(reading.value, 21.5);
    }

    #[test]
    fn constrained_module_skips_no_constrained_driver() {
        let mut i2c = I2cRegistry::new();
        i2c.init_module(Module::UlpRtc, Box::new(FakeController::default()), 100).unwrap();
        let mut poller = SensorPoller::new();
        let candidates: Vec<Box<dyn SensorDriver>> =
            vec![Box::new(AlwaysFoundDriver { info: &TEST_INFO, polled: 0 })];
        poller.detect_bus(&mut i2c, Module::UlpRtc, 0, candidates).unwrap();
        assert!(poller.records().is_empty());
    }

    #[test]
    fn second_driver_on_same_address_is_skipped() {
        let mut i2c = registry();
        let mut poller = SensorPoller::new();
        let candidates: Vec<Box<dyn SensorDriver>> = vec![
            Box::new(AlwaysFoundDriver { info: &TEST_INFO, polled: 0 }),
            Box::new(AlwaysFoundDriver { info: &TEST_INFO, polled: 0 }),
        ];
        poller.detect_bus(&mut i2c, Module::Main0, 0, candidates).unwrap();
        assert_eq!(poller.records().len(), 1);
    }
}
