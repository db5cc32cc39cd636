//! `info*` static/near-static introspection commands (SPEC_FULL.md §C):
//! firmware identity, command table size, heap snapshot, partition dump.

use crate::board::BOARD_NAME;
use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::system::System;

pub static INFO_PARAMS: &[ParameterSpec] = &[];

pub fn info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    call.result = format!(
        "{} uptime={}s commands={}",
        BOARD_NAME,
        system.uptime_seconds(),
        system.command_table.commands.len(),
    );
    Ok(())
}

pub static INFO_BOARD_PARAMS: &[ParameterSpec] = &[];

pub fn info_board(_system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    call.result = format!("board={BOARD_NAME}");
    Ok(())
}

pub static INFO_CLI_PARAMS: &[ParameterSpec] = &[];

pub fn info_cli(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    call.result = format!("commands={}", system.command_table.commands.len());
    Ok(())
}

pub static INFO_MEMORY_PARAMS: &[ParameterSpec] = &[];

pub fn info_memory(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let heap = system.heap.lock().unwrap();
    call.result =
        format!("free={} largest_free_block={}", heap.free_bytes(), heap.largest_free_block());
    Ok(())
}

pub static INFO_PARTITIONS_PARAMS: &[ParameterSpec] = &[];

pub fn info_partitions(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let table = system.partition_table.lock().unwrap();
    let mut out = String::new();
    for partition in table.all_partitions() {
        out.push_str(&format!(
            "{:<12} addr=0x{:06x} size={} bootable={}\n",
            partition.label, partition.address, partition.size, partition.bootable,
        ));
    }
    call.result = out;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandTable;
    use crate::system::fakes::test_system;
    use crate::transport::Origin;

    static EMPTY_TABLE: CommandTable = CommandTable { commands: &[] };

    fn call() -> CommandCall {
        CommandCall {
            origin: Origin::Console,
            mtu: 512,
            oob: Vec::new(),
            parameters: vec![],
            result: String::new(),
            result_oob: Vec::new(),
        }
    }

    #[test]
    fn info_board_reports_board_name() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call();
        info_board(&system, &mut c).unwrap();
        assert_eq!(c.result, format!("board={BOARD_NAME}"));
    }

    #[test]
    fn info_cli_reports_command_count() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call();
        info_cli(&system, &mut c).unwrap();
        assert_eq!(c.result, "commands=0");
    }

    #[test]
    fn info_memory_reports_heap_snapshot() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call();
        info_memory(&system, &mut c).unwrap();
        assert!(c.result.starts_with("free="));
    }

    #[test]
    fn info_partitions_lists_the_next_update_partition() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call();
        info_partitions(&system, &mut c).unwrap();
        assert!(c.result.contains("ota_1"));
    }
}
