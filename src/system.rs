//! Program-wide context (spec.md §9 design note: "a single `System` context
//! at program entry owns the components; no hidden globals"). Command
//! handlers receive `&System`, never `&mut System` — every mutable
//! subsystem below is its own mutex, matching the per-subsystem locking
//! spec.md §5 describes (`data_mutex`, per-module I²C mutex, log-ring
//! mutex) rather than one coarse lock for the whole context.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::command::{AliasTable, CommandTable};
use crate::config::ConfigStore;
use crate::fs::BlobStore;
use crate::gpio::GpioAccess;
use crate::i2c::I2cRegistry;
use crate::logring::LogRing;
use crate::meminfo::HeapInfo;
use crate::network::{BleStatus, NetworkStatus};
use crate::notify::{LedDriver, Notifier};
use crate::ota::{FlashWriter, OtaSession, PartitionTable};
use crate::display::DisplayController;
use crate::sensor::SensorPoller;
use crate::transport::{Origin, TransportStats};

/// Everything a command handler, transport loop, or background task needs,
/// wired together once at program entry and then shared by reference.
pub struct System {
    pub command_table: &'static CommandTable,
    pub aliases: Mutex<AliasTable>,
    pub i2c: Mutex<I2cRegistry>,
    pub sensors: Mutex<SensorPoller>,
    pub config: Mutex<ConfigStore>,
    pub log: Mutex<LogRing>,
    pub notifier: Mutex<Notifier>,
    pub led: Mutex<Box<dyn LedDriver>>,
    pub ota: Mutex<OtaSession>,
    pub flash_writer: Mutex<Box<dyn FlashWriter>>,
    pub partition_table: Mutex<Box<dyn PartitionTable>>,
    pub display: Mutex<Box<dyn DisplayController>>,
    pub blobs: Mutex<Box<dyn BlobStore>>,
    pub gpio: Mutex<Box<dyn GpioAccess>>,
    pub network: Mutex<NetworkStatus>,
    pub ble: Mutex<BleStatus>,
    pub transport_stats: Mutex<HashMap<Origin, TransportStats>>,
    pub heap: Mutex<Box<dyn HeapInfo>>,
    pub boot_instant: Instant,
}

/// The collaborators a `System` consumes to come up, one field per
/// out-of-scope trait object spec.md §1 names — the firmware binary fills
/// these with real peripherals, host tests with the in-memory fakes.
pub struct SystemDeps {
    pub command_table: &'static CommandTable,
    pub i2c: I2cRegistry,
    pub config: ConfigStore,
    pub log: LogRing,
    pub led: Box<dyn LedDriver>,
    pub flash_writer: Box<dyn FlashWriter>,
    pub partition_table: Box<dyn PartitionTable>,
    pub display: Box<dyn DisplayController>,
    pub blobs: Box<dyn BlobStore>,
    pub gpio: Box<dyn GpioAccess>,
    pub heap: Box<dyn HeapInfo>,
}

impl System {
    pub fn new(deps: SystemDeps) -> Self {
        Self {
            command_table: deps.command_table,
            aliases: Mutex::new(AliasTable::new()),
            i2c: Mutex::new(deps.i2c),
            sensors: Mutex::new(SensorPoller::new()),
            config: Mutex::new(deps.config),
            log: Mutex::new(deps.log),
            notifier: Mutex::new(Notifier::new()),
            led: Mutex::new(deps.led),
            ota: Mutex::new(OtaSession::new()),
            flash_writer: Mutex::new(deps.flash_writer),
            partition_table: Mutex::new(deps.partition_table),
            display: Mutex::new(deps.display),
            blobs: Mutex::new(deps.blobs),
            gpio: Mutex::new(deps.gpio),
            network: Mutex::new(NetworkStatus::default()),
            ble: Mutex::new(BleStatus::default()),
            transport_stats: Mutex::new(HashMap::new()),
            heap: Mutex::new(deps.heap),
            boot_instant: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.boot_instant.elapsed().as_secs()
    }

    pub fn stats_for(&self, origin: Origin) -> TransportStats {
        self.transport_stats.lock().unwrap().get(&origin).copied().unwrap_or_default()
    }

    pub fn bump_stats(&self, origin: Origin, f: impl FnOnce(&mut TransportStats)) {
        let mut stats = self.transport_stats.lock().unwrap();
        f(stats.entry(origin).or_default());
    }

    pub fn hostname(&self) -> String {
        self.config.lock().unwrap().get_string("hostname").unwrap_or_else(|_| "stationhub".to_string())
    }
}
