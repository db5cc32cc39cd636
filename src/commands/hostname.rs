//! `hostname <name> <description>` (spec.md end-to-end scenario 2): persists
//! both the device name and a human-readable description, the latter with
//! underscores standing in for spaces on the wire.

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::system::System;

pub static HOSTNAME_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::word("name"), ParameterSpec::word("description")];

pub fn hostname(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let name = call.word(0).to_string();
    let description = call.word(1).replace('_', " ");
    let mut config = system.config.lock().unwrap();
    config.set_string("hostname", &name);
    config.set_string("hostname_desc", &description);
    call.result = format!("hostname: {name} ({description})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ParsedValue};
    use crate::system::fakes::test_system;
    use crate::command::CommandTable;
    use crate::transport::Origin;

    static EMPTY_TABLE: CommandTable = CommandTable { commands: &[] };

    fn call(name: &str, description: &str) -> CommandCall {
        CommandCall {
            origin: Origin::Console,
            mtu: 512,
            oob: Vec::new(),
            parameters: vec![
                Some(ParsedValue::Word(name.to_string())),
                Some(ParsedValue::Word(description.to_string())),
            ],
            result: String::new(),
            result_oob: Vec::new(),
        }
    }

    #[test]
    fn sets_name_and_underscore_expanded_description() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call("test-host", "A_Board");
        hostname(&system, &mut c).unwrap();
        assert_eq!(c.result, "hostname: test-host (A Board)");
        assert_eq!(system.config.lock().unwrap().get_string("hostname").unwrap(), "test-host");
        assert_eq!(system.config.lock().unwrap().get_string("hostname_desc").unwrap(), "A Board");
    }
}
