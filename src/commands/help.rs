//! `help`/`?` and `alias` (spec.md §4.2 step 2, §6.4).

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::system::System;

pub static HELP_PARAMS: &[ParameterSpec] = &[];

pub fn help(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let mut out = String::from("HELP\n");
    for command in system.command_table.commands {
        let alias = command.alias.unwrap_or("-");
        out.push_str(&format!("{:<20} {:<8} {}\n", command.name, alias, command.help));
    }
    call.result = out;
    Ok(())
}

pub static ALIAS_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::word("alias name"), ParameterSpec::raw_tail("substitution").optional()];

/// `alias <name> [<substitution...>]`. Omitting the substitution removes
/// the alias instead of setting it.
pub fn alias(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let name = call.word(0).to_string();
    let mut aliases = system.aliases.lock().unwrap();
    match call.raw_opt(1) {
        Some(substitution) if !substitution.is_empty() => {
            aliases.set(&name, substitution);
            call.result = format!("OK: alias {name} set");
        }
        _ => {
            if aliases.remove(&name) {
                call.result = format!("OK: alias {name} removed");
            } else {
                call.result = format!("ERROR: no such alias {name}");
            }
        }
    }
    Ok(())
}
