//! `io-*` commands: raw pin access plus the per-origin transport counters
//! (SPEC_FULL.md §C; counters themselves defined in [`crate::transport::TransportStats`]).

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::system::System;
use crate::transport::Origin;

const ORIGINS: [Origin; 5] =
    [Origin::Ble, Origin::Console, Origin::Tcp, Origin::Udp, Origin::Script];

fn origin_name(origin: Origin) -> &'static str {
    match origin {
        Origin::Ble => "ble",
        Origin::Console => "console",
        Origin::Tcp => "tcp",
        Origin::Udp => "udp",
        Origin::Script => "script",
    }
}

pub static IO_DUMP_PARAMS: &[ParameterSpec] = &[];

pub fn io_dump(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let mut out = String::new();
    for origin in ORIGINS {
        let stats = system.stats_for(origin);
        out.push_str(&format!(
            "{}: unauthorized={} defrag_timeouts={} indicate_timeout={} indicate_error={} send_errors={} incomplete={}\n",
            origin_name(origin),
            stats.unauthorized_access,
            stats.defragmentation_timeouts,
            stats.indication_timeout,
            stats.indication_error,
            stats.send_errors,
            stats.receive_incomplete_packets,
        ));
    }
    call.result = out;
    Ok(())
}

pub static IO_READ_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::required_uint("pin").with_bounds(Some(0), Some(39))];

pub fn io_read(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let pin = call.uint(0) as u8;
    let level = system.gpio.lock().unwrap().read(pin)?;
    call.result = if level { "1".to_string() } else { "0".to_string() };
    Ok(())
}

pub static IO_STATS_PARAMS: &[ParameterSpec] = &[];

pub fn io_stats(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let total: u32 = ORIGINS
        .iter()
        .map(|&origin| {
            let s = system.stats_for(origin);
            s.unauthorized_access
                + s.defragmentation_timeouts
                + s.indication_timeout
                + s.indication_error
                + s.send_errors
                + s.receive_incomplete_packets
        })
        .sum();
    call.result = format!("total_events={total}");
    Ok(())
}

pub static IO_WRITE_PARAMS: &[ParameterSpec] = &[
    ParameterSpec::required_uint("pin").with_bounds(Some(0), Some(39)),
    ParameterSpec::required_uint("level").with_bounds(Some(0), Some(1)),
];

pub fn io_write(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let pin = call.uint(0) as u8;
    let level = call.uint(1) != 0;
    system.gpio.lock().unwrap().write(pin, level)?;
    call.result = "OK".to_string();
    Ok(())
}
