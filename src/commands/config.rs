//! `config-*` commands over the typed key/value store (spec.md §4.6).

use crate::command::{CommandCall, ParameterSpec};
use crate::config::ConfigValue;
use crate::error::CommandError;
use crate::system::System;

pub static CONFIG_DUMP_PARAMS: &[ParameterSpec] = &[];

pub fn config_dump(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let mut out = String::new();
    for (key, value) in system.config.lock().unwrap().dump() {
        match value {
            ConfigValue::Int(v) => out.push_str(&format!("{key}={v}\n")),
            ConfigValue::Str(v) => out.push_str(&format!("{key}={v}\n")),
        }
    }
    call.result = out;
    Ok(())
}

pub static CONFIG_ERASE_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("key")];

pub fn config_erase(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let erased = system.config.lock().unwrap().erase(call.word(0));
    call.result = if erased { "OK".to_string() } else { "ERROR: no such key".to_string() };
    Ok(())
}

pub static CONFIG_INFO_PARAMS: &[ParameterSpec] = &[];

pub fn config_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let count = system.config.lock().unwrap().dump().len();
    call.result = format!("entries: {count}");
    Ok(())
}

pub static CONFIG_SET_INT_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::word("key"), ParameterSpec::signed("value")];

pub fn config_set_int(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    system.config.lock().unwrap().set_int(call.word(0), call.int(1));
    call.result = "OK".to_string();
    Ok(())
}

pub static CONFIG_SET_UINT_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::word("key"), ParameterSpec::required_uint("value")];

pub fn config_set_uint(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    system.config.lock().unwrap().set_int(call.word(0), call.uint(1) as i64);
    call.result = "OK".to_string();
    Ok(())
}

pub static CONFIG_SET_STRING_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::word("key"), ParameterSpec::raw_tail("value")];

pub fn config_set_string(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    system.config.lock().unwrap().set_string(call.word(0), call.raw(1));
    call.result = "OK".to_string();
    Ok(())
}

pub static CONFIG_SHOW_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("key")];

pub fn config_show(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let config = system.config.lock().unwrap();
    let key = call.word(0);
    if let Ok(v) = config.get_int(key) {
        call.result = format!("{key}={v}");
    } else if let Ok(v) = config.get_string(key) {
        call.result = format!("{key}={v}");
    } else {
        return Err(crate::error::TransientError::ConfigKeyNotFound.into());
    }
    Ok(())
}
