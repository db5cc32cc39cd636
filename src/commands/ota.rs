//! `ota-*` commands driving the OTA session state machine (spec.md §4.9).

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::ota::OtaError;
use crate::system::System;

impl From<OtaError> for CommandError {
    fn from(err: OtaError) -> Self {
        CommandError::other(&err.to_string())
    }
}

pub static OTA_START_PARAMS: &[ParameterSpec] = &[ParameterSpec::required_uint("length")];

pub fn ota_start(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let length = call.uint(0);
    let table = system.partition_table.lock().unwrap();
    system.ota.lock().unwrap().start(length, &**table)?;
    call.result = "OK".to_string();
    Ok(())
}

pub static OTA_WRITE_PARAMS: &[ParameterSpec] = &[
    ParameterSpec::required_uint("length"),
    ParameterSpec::required_uint("checksum-flag").with_bounds(Some(0), Some(1)),
];

/// `ota-write <length> <checksum-flag>`; the chunk itself rides in `call.oob`.
pub fn ota_write(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let length = call.uint(0);
    let checksum_flag = call.uint(1) != 0;
    let oob = call.oob.clone();
    let mut writer = system.flash_writer.lock().unwrap();
    system.ota.lock().unwrap().write_chunk(length, checksum_flag, &oob, &mut **writer)?;
    call.result = "OK".to_string();
    Ok(())
}

pub static OTA_FINISH_PARAMS: &[ParameterSpec] = &[];

pub fn ota_finish(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let mut writer = system.flash_writer.lock().unwrap();
    let digest = system.ota.lock().unwrap().finish(&mut **writer)?;
    call.result = hex::encode(digest);
    Ok(())
}

pub static OTA_COMMIT_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("expected-hash")];

pub fn ota_commit(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let hex_hash = call.word(0);
    let bytes =
        hex::decode(hex_hash).map_err(|_| CommandError::other("expected-hash is not valid hex"))?;
    let digest: [u8; 32] =
        bytes.try_into().map_err(|_| CommandError::other("expected-hash must be 32 bytes"))?;
    let mut table = system.partition_table.lock().unwrap();
    system.ota.lock().unwrap().commit(&digest, &mut **table)?;
    call.result = "OK".to_string();
    Ok(())
}

pub static OTA_CONFIRM_PARAMS: &[ParameterSpec] = &[];

pub fn ota_confirm(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let mut table = system.partition_table.lock().unwrap();
    system.ota.lock().unwrap().confirm(&mut **table)?;
    call.result = "OK".to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandTable, ParsedValue};
    use crate::ota::fakes::{FakeFlashWriter, FakePartitionTable};
    use crate::system::fakes::test_system;
    use crate::transport::Origin;

    static EMPTY_TABLE: CommandTable = CommandTable { commands: &[] };

    fn call(params: Vec<Option<ParsedValue>>, oob: Vec<u8>) -> CommandCall {
        CommandCall {
            origin: Origin::Console,
            mtu: 512,
            oob,
            parameters: params,
            result: String::new(),
            result_oob: Vec::new(),
        }
    }

    #[test]
    fn full_session_through_commands_reaches_confirmed() {
        use sha2::{Digest, Sha256};

        let system = test_system(&EMPTY_TABLE);
        let digest: [u8; 32] = Sha256::digest(b"hello world").into();
        let mut table = FakePartitionTable::default();
        table.stored_hash = digest;
        *system.partition_table.lock().unwrap() = Box::new(table);
        *system.flash_writer.lock().unwrap() = Box::new(FakeFlashWriter::default());

        let mut c = call(vec![Some(ParsedValue::UInt(11))], vec![]);
        ota_start(&system, &mut c).unwrap();
        assert_eq!(c.result, "OK");

        let mut c = call(
            vec![Some(ParsedValue::UInt(11)), Some(ParsedValue::UInt(0))],
            b"hello world".to_vec(),
        );
        ota_write(&system, &mut c).unwrap();
        assert_eq!(c.result, "OK");

        let mut c = call(vec![], vec![]);
        ota_finish(&system, &mut c).unwrap();
        let hash_hex = c.result.clone();
        assert_eq!(hash_hex, hex::encode(digest));

        let mut c = call(vec![Some(ParsedValue::Word(hash_hex))], vec![]);
        ota_commit(&system, &mut c).unwrap();
        assert_eq!(c.result, "OK");

        let mut c = call(vec![], vec![]);
        ota_confirm(&system, &mut c).unwrap();
        assert_eq!(c.result, "OK");
    }

    #[test]
    fn write_before_start_reports_wrong_state() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(
            vec![Some(ParsedValue::UInt(1)), Some(ParsedValue::UInt(0))],
            b"x".to_vec(),
        );
        let err = ota_write(&system, &mut c).unwrap_err();
        assert!(err.to_string().contains("invalid in current state"));
    }

    #[test]
    fn commit_rejects_malformed_hash() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![Some(ParsedValue::Word("not-hex".to_string()))], vec![]);
        let err = ota_commit(&system, &mut c).unwrap_err();
        assert!(err.to_string().contains("not valid hex"));
    }
}
