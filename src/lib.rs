//! stationhub — dual-core sensor/display appliance firmware, core logic
//! (spec.md §1). This crate holds every piece of the command dispatch,
//! transport framing, I²C arbitration, sensor polling, OTA, config, log
//! ring, and notification-LED logic behind trait seams so the whole thing
//! is testable with `cargo test` on a host, with no ESP-IDF dependency.
//! The `stationhub-std` binary crate (`firmware-std/`) wires real
//! peripheral back-ends into the traits defined here and runs on-device.

pub mod ble;
pub mod board;
pub mod command;
pub mod commands;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod display;
pub mod error;
pub mod fs;
pub mod gpio;
pub mod i2c;
pub mod logring;
pub mod meminfo;
pub mod network;
pub mod notify;
pub mod ota;
pub mod packet;
pub mod process;
pub mod queue;
pub mod sensor;
pub mod sensors;
pub mod system;
pub mod tcp;
pub mod transport;
pub mod udp;
pub mod util;
