//! `sensor-*` commands over the sensor poller (spec.md §4.5).

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::i2c::Module;
use crate::sensor::SensorType;
use crate::system::System;

fn module_name(module: Module) -> &'static str {
    match module {
        Module::Main0 => "main0",
        Module::Main1 => "main1",
        Module::UlpRtc => "ulp-rtc",
    }
}

fn parse_module(name: &str) -> Option<Module> {
    match name {
        "main0" => Some(Module::Main0),
        "main1" => Some(Module::Main1),
        "ulp" | "ulp-rtc" => Some(Module::UlpRtc),
        _ => None,
    }
}

fn sensor_type_name(kind: SensorType) -> &'static str {
    match kind {
        SensorType::VisibleLight => "light",
        SensorType::Temperature => "temperature",
        SensorType::Humidity => "humidity",
        SensorType::AirPressure => "pressure",
    }
}

pub static SENSOR_DUMP_PARAMS: &[ParameterSpec] = &[];

/// Every cached reading, one line per `(device, type)` pair.
pub fn sensor_dump(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let sensors = system.sensors.lock().unwrap();
    let mut out = String::new();
    for record in sensors.records() {
        for kind in SensorType::ALL {
            if let Some(reading) = record.value(kind) {
                out.push_str(&format!(
                    "{} bus{} 0x{:02x} {}={:.3} t={}\n",
                    module_name(record.slave.module),
                    record.slave.bus,
                    record.slave.address,
                    sensor_type_name(kind),
                    reading.value,
                    reading.timestamp,
                ));
            }
        }
    }
    call.result = out;
    Ok(())
}

pub static SENSOR_INFO_PARAMS: &[ParameterSpec] = &[];

/// The device table itself: address and detect/poll state, no readings.
pub fn sensor_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let sensors = system.sensors.lock().unwrap();
    let mut out = String::new();
    for record in sensors.records() {
        out.push_str(&format!(
            "{} bus{} 0x{:02x} state={:?}\n",
            module_name(record.slave.module),
            record.slave.bus,
            record.slave.address,
            record.state,
        ));
    }
    call.result = out;
    Ok(())
}

pub static SENSOR_JSON_PARAMS: &[ParameterSpec] = &[];

pub fn sensor_json(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let sensors = system.sensors.lock().unwrap();
    let mut readings = Vec::new();
    for record in sensors.records() {
        for kind in SensorType::ALL {
            if let Some(reading) = record.value(kind) {
                readings.push(serde_json::json!({
                    "module": module_name(record.slave.module),
                    "bus": record.slave.bus,
                    "address": record.slave.address,
                    "type": sensor_type_name(kind),
                    "value": reading.value,
                    "timestamp": reading.timestamp,
                }));
            }
        }
    }
    call.result = serde_json::Value::Array(readings).to_string();
    Ok(())
}

pub static SENSOR_STATS_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("module").optional()];

/// Per-cycle counters (spec.md §4.5): `sensors_probed`/`found`/`confirmed`/
/// `disabled`, `poll_run`/`ok`/`error`/`skipped`. All modules if none named.
pub fn sensor_stats(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let sensors = system.sensors.lock().unwrap();
    let modules = match call.word_opt(0) {
        Some(name) => vec![parse_module(name).ok_or(crate::error::TransientError::Unsupported)?],
        None => vec![Module::Main0, Module::Main1, Module::UlpRtc],
    };
    let mut out = String::new();
    for module in modules {
        let c = sensors.counters(module);
        out.push_str(&format!(
            "{} probed={} found={} confirmed={} disabled={} poll_run={} poll_ok={} poll_error={} poll_skipped={}\n",
            module_name(module),
            c.sensors_probed,
            c.sensors_found,
            c.sensors_confirmed,
            c.sensors_disabled,
            c.poll_run,
            c.poll_ok,
            c.poll_error,
            c.poll_skipped,
        ));
    }
    call.result = out;
    Ok(())
}
