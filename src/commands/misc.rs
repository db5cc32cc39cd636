//! Leftover top-level commands that don't belong to one subsystem
//! (SPEC_FULL.md §C): `console-info`, `reset`, `run`, `write`.

use crate::board::{CONSOLE_HISTORY_LINES, CONSOLE_LINE_MAX_CHARS};
use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::i2c::Module;
use crate::system::System;
use crate::transport::Origin;

pub static CONSOLE_INFO_PARAMS: &[ParameterSpec] = &[];

pub fn console_info(_system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    call.result =
        format!("history_lines={CONSOLE_HISTORY_LINES} line_max_chars={CONSOLE_LINE_MAX_CHARS}");
    Ok(())
}

pub static RESET_PARAMS: &[ParameterSpec] = &[];

/// The actual reboot is carried out by the firmware binary after this
/// response is flushed to the transport — this handler only acknowledges
/// the request, mirroring a reset handler that replies before calling
/// `esp_restart()`.
pub fn reset(_system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    call.result = "OK: resetting".to_string();
    Ok(())
}

fn parse_module(name: &str) -> Option<Module> {
    match name {
        "main0" => Some(Module::Main0),
        "main1" => Some(Module::Main1),
        "ulp" | "ulp-rtc" => Some(Module::UlpRtc),
        _ => None,
    }
}

pub static WRITE_PARAMS: &[ParameterSpec] = &[
    ParameterSpec::word("module"),
    ParameterSpec::required_uint("address").with_bounds(Some(0), Some(0x7f)),
];

/// `write <module> <address>`: a raw diagnostic I²C write of `call.oob` to
/// the named slave, with no paired read — grounded in [`crate::i2c::BusController::send`].
pub fn write(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let module = parse_module(call.word(0)).ok_or(crate::error::TransientError::Unsupported)?;
    let address = call.uint(1) as u8;
    let bytes = call.oob.clone();
    let slave = crate::i2c::Slave { module, bus: crate::i2c::ROOT_BUS, address };
    system.i2c.lock().unwrap().send(slave, &bytes)?;
    call.result = format!("OK: {} bytes", bytes.len());
    Ok(())
}

pub static RUN_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("script")];

/// `run <name>`: replays a stored blob's lines as commands, one per
/// non-empty line, each under [`Origin::Script`]. Collects every line's
/// response, in order.
pub fn run(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let name = call.word(0).to_string();
    let blobs = system.blobs.lock().unwrap();
    let size = blobs
        .list()
        .into_iter()
        .find(|b| b.name == name)
        .ok_or(crate::error::TransientError::BlobNotFound)?
        .size;
    let bytes = blobs.read(&name, 0, size)?;
    drop(blobs);
    let script = String::from_utf8_lossy(&bytes);

    let mut out = String::new();
    for line in script.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match crate::dispatcher::run_command(system, line, call.mtu, Origin::Script, Vec::new()) {
            Ok(inner) => out.push_str(&inner.result),
            Err(err) => out.push_str(&format!("ERROR: {err}")),
        }
        out.push('\n');
    }
    call.result = out;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandDescriptor, CommandTable, ParsedValue};
    use crate::system::fakes::test_system;

    fn call(params: Vec<Option<ParsedValue>>) -> CommandCall {
        CommandCall {
            origin: Origin::Console,
            mtu: 512,
            oob: Vec::new(),
            parameters: params,
            result: String::new(),
            result_oob: Vec::new(),
        }
    }

    static EMPTY_TABLE: CommandTable = CommandTable { commands: &[] };

    #[test]
    fn console_info_reports_board_constants() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![]);
        console_info(&system, &mut c).unwrap();
        assert_eq!(c.result, "history_lines=8 line_max_chars=64");
    }

    #[test]
    fn reset_acknowledges_without_side_effects() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![]);
        reset(&system, &mut c).unwrap();
        assert_eq!(c.result, "OK: resetting");
    }

    fn echo(_system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
        call.result = format!("echo:{}\n", call.word(0));
        Ok(())
    }

    static ECHO_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("text")];
    static SCRIPT_COMMANDS: &[CommandDescriptor] = &[CommandDescriptor {
        name: "echo",
        alias: None,
        help: "echo back a word",
        parameters: ECHO_PARAMS,
        function: echo,
    }];
    static SCRIPT_TABLE: CommandTable = CommandTable { commands: SCRIPT_COMMANDS };

    #[test]
    fn run_replays_every_line_in_the_stored_script() {
        let system = test_system(&SCRIPT_TABLE);
        system.blobs.lock().unwrap().write("boot.txt", 0, b"echo one\necho two\n").unwrap();
        let mut c = call(vec![Some(ParsedValue::Word("boot.txt".to_string()))]);
        run(&system, &mut c).unwrap();
        assert_eq!(c.result, "echo:one\n\necho:two\n\n");
    }

    #[test]
    fn run_reports_unknown_commands_inline_instead_of_aborting() {
        let system = test_system(&SCRIPT_TABLE);
        system.blobs.lock().unwrap().write("boot.txt", 0, b"echo one\nbogus\necho two\n").unwrap();
        let mut c = call(vec![Some(ParsedValue::Word("boot.txt".to_string()))]);
        run(&system, &mut c).unwrap();
        assert!(c.result.contains("echo:one"));
        assert!(c.result.contains("ERROR: unknown command"));
        assert!(c.result.contains("echo:two"));
    }

    #[test]
    fn run_missing_script_is_blob_not_found() {
        let system = test_system(&SCRIPT_TABLE);
        let mut c = call(vec![Some(ParsedValue::Word("nope.txt".to_string()))]);
        assert!(run(&system, &mut c).is_err());
    }
}
