//! `log*` commands over the RTC-persistent ring (spec.md §4.8, §6.4).

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::system::System;

pub static LOG_PARAMS: &[ParameterSpec] = &[];

pub fn log(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let mut out = String::new();
    for entry in system.log.lock().unwrap().entries() {
        out.push_str(&format!("{} {}\n", entry.timestamp, entry.text));
    }
    call.result = out;
    Ok(())
}

pub static LOG_CLEAR_PARAMS: &[ParameterSpec] = &[];

pub fn log_clear(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    system.log.lock().unwrap().clear();
    call.result = "OK".to_string();
    Ok(())
}

pub static LOG_INFO_PARAMS: &[ParameterSpec] = &[];

pub fn log_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let log = system.log.lock().unwrap();
    call.result = format!("entries={} monitor={}", log.len(), log.monitor_enabled());
    Ok(())
}

pub static LOG_MONITOR_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("state")];

pub fn log_monitor(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let enabled = match call.word(0) {
        "on" | "1" | "true" => true,
        "off" | "0" | "false" => false,
        other => return Err(CommandError::other(&format!("expected on/off, got \"{other}\""))),
    };
    system.log.lock().unwrap().set_monitor(enabled);
    call.result = format!("OK: monitor {}", if enabled { "on" } else { "off" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandTable, ParsedValue};
    use crate::system::fakes::test_system;
    use crate::transport::Origin;

    static EMPTY_TABLE: CommandTable = CommandTable { commands: &[] };

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

    #[test]
    fn log_dumps_pushed_entries() {
        let system = test_system(&EMPTY_TABLE);
        system.log.lock().unwrap().push(1000, "booting");
        let mut c = call(vec![]);
        log(&system, &mut c).unwrap();
        assert_eq!(c.result, "1000 booting\n");
    }

    #[test]
    fn log_clear_empties_the_ring() {
        let system = test_system(&EMPTY_TABLE);
        system.log.lock().unwrap().push(1000, "booting");
        let mut c = call(vec![]);
        log_clear(&system, &mut c).unwrap();
        assert_eq!(system.log.lock().unwrap().len(), 0);
    }

    #[test]
    fn log_monitor_toggles_and_rejects_garbage() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![Some(ParsedValue::Word("on".to_string()))]);
        log_monitor(&system, &mut c).unwrap();
        assert!(system.log.lock().unwrap().monitor_enabled());

        let mut c = call(vec![Some(ParsedValue::Word("nonsense".to_string()))]);
        assert!(log_monitor(&system, &mut c).is_err());
    }

    #[test]
    fn log_info_reports_count_and_monitor_state() {
        let system = test_system(&EMPTY_TABLE);
        system.log.lock().unwrap().push(1, "a");
        let mut c = call(vec![]);
        log_info(&system, &mut c).unwrap();
        assert_eq!(c.result, "entries=1 monitor=false");
    }
}
