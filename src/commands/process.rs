//! `process-list`/`ps` and `process-stop`/`kill` (SPEC_FULL.md §C).

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::process::PROCESS_TABLE;
use crate::system::System;

pub static PROCESS_LIST_PARAMS: &[ParameterSpec] = &[];

pub fn process_list(_system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let mut out = String::new();
    for process in PROCESS_TABLE {
        out.push_str(&format!(
            "{:<16} core={} priority={} stack={}\n",
            process.name, process.core, process.priority, process.stack_bytes
        ));
    }
    call.result = out;
    Ok(())
}

pub static PROCESS_STOP_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("name")];

/// Every pinned task refuses to stop (spec.md §5, `process::find`'s doc
/// comment: "nothing in this table is user-killable").
pub fn process_stop(_system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let name = call.word(0);
    if crate::process::find(name).is_none() {
        return Err(CommandError::other(&format!("no such task \"{name}\"")));
    }
    call.result = "ERROR: cannot stop system task".to_string();
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
    fn process_list_includes_every_table_row() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![]);
        process_list(&system, &mut c).unwrap();
        for process in PROCESS_TABLE {
            assert!(c.result.contains(process.name));
        }
    }

    #[test]
    fn process_stop_on_known_task_refuses() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![Some(ParsedValue::Word("dispatcher".to_string()))]);
        process_stop(&system, &mut c).unwrap();
        assert_eq!(c.result, "ERROR: cannot stop system task");
    }

    #[test]
    fn process_stop_on_unknown_task_errors() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![Some(ParsedValue::Word("nope".to_string()))]);
        assert!(process_stop(&system, &mut c).is_err());
    }
}
