//! `i2c-*` commands over the module registry (spec.md §4.4).

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::i2c::Module;
use crate::system::System;

fn parse_module(name: &str) -> Option<Module> {
    match name {
        "main0" => Some(Module::Main0),
        "main1" => Some(Module::Main1),
        "ulp" | "ulp-rtc" => Some(Module::UlpRtc),
        _ => None,
    }
}

fn module_name(module: Module) -> &'static str {
    match module {
        Module::Main0 => "main0",
        Module::Main1 => "main1",
        Module::UlpRtc => "ulp-rtc",
    }
}

pub static I2C_INFO_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("module").optional()];

pub fn i2c_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let registry = system.i2c.lock().unwrap();
    let mut out = String::new();
    let modules: Vec<Module> = match call.word_opt(0) {
        Some(name) => vec![parse_module(name).ok_or(crate::error::TransientError::Unsupported)?],
        None => registry.modules().collect(),
    };
    for module in modules {
        out.push_str(&format!(
            "{} buses={} speed_khz={}\n",
            module_name(module),
            registry.buses(module),
            registry.speed_khz(module).unwrap_or(0),
        ));
    }
    call.result = out;
    Ok(())
}

pub static I2C_SPEED_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::word("module"), ParameterSpec::required_uint("khz").with_bounds(Some(1), Some(1000))];

pub fn i2c_speed(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let module = parse_module(call.word(0)).ok_or(crate::error::TransientError::Unsupported)?;
    let khz = call.uint(1) as u32;
    system.i2c.lock().unwrap().set_speed_khz(module, khz)?;
    call.result = "OK".to_string();
    Ok(())
}
