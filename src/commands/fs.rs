//! `fs-*` commands over the named-blob store (spec.md §1 non-goals; contract
//! fixed by [`crate::fs::BlobStore`]).

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::system::System;

pub static FS_READ_PARAMS: &[ParameterSpec] = &[
    ParameterSpec::word("name"),
    ParameterSpec::required_uint("offset"),
    ParameterSpec::required_uint("length").with_bounds(Some(0), Some(4096)),
];

pub fn fs_read(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let name = call.word(0).to_string();
    let offset = call.uint(1) as usize;
    let length = call.uint(2) as usize;
    let bytes = system.blobs.lock().unwrap().read(&name, offset, length)?;
    call.result = format!("OK: {} bytes", bytes.len());
    call.result_oob = bytes;
    Ok(())
}

pub static FS_CHECKSUM_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("name")];

pub fn fs_checksum(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let checksum = system.blobs.lock().unwrap().checksum(call.word(0))?;
    call.result = format!("{checksum:08x}");
    Ok(())
}

pub static FS_ERASE_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("name")];

pub fn fs_erase(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    system.blobs.lock().unwrap().erase(call.word(0))?;
    call.result = "OK".to_string();
    Ok(())
}

pub static FS_FORMAT_PARAMS: &[ParameterSpec] = &[];

pub fn fs_format(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    system.blobs.lock().unwrap().format();
    call.result = "OK".to_string();
    Ok(())
}

pub static FS_INFO_PARAMS: &[ParameterSpec] = &[];

pub fn fs_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let usage = system.blobs.lock().unwrap().usage();
    call.result = format!("total={} used={}", usage.total_bytes, usage.used_bytes);
    Ok(())
}

pub static FS_LIST_PARAMS: &[ParameterSpec] = &[];

pub fn fs_list(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let mut out = String::new();
    for blob in system.blobs.lock().unwrap().list() {
        out.push_str(&format!("{} {}\n", blob.name, blob.size));
    }
    call.result = out;
    Ok(())
}

pub static FS_WRITE_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::word("name"), ParameterSpec::required_uint("offset")];

/// Writes `call.oob` (the chunk carried out-of-band by the transport) at the
/// given offset.
pub fn fs_write(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let name = call.word(0).to_string();
    let offset = call.uint(1) as usize;
    let bytes = call.oob.clone();
    system.blobs.lock().unwrap().write(&name, offset, &bytes)?;
    call.result = format!("OK: {} bytes", bytes.len());
    Ok(())
}
