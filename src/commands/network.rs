//! `wlan-*`/`ipv6-*`/`bt-info` commands over the network status snapshots
//! (SPEC_FULL.md §C). The radio stacks are out of scope (spec.md §1); these
//! commands only read/write the snapshot and the persisted wlan config keys.

use crate::command::{CommandCall, ParameterSpec};
use crate::error::CommandError;
use crate::system::System;

pub static WLAN_CLIENT_CONFIG_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::word("ssid"), ParameterSpec::raw_tail("password")];

pub fn wlan_client_config(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let ssid = call.word(0).to_string();
    let password = call.raw(1).to_string();
    let mut config = system.config.lock().unwrap();
    config.set_string("wlan-ssid", &ssid);
    config.set_string("wlan-passwd", &password);
    call.result = format!("OK: wlan-client-config {ssid}");
    Ok(())
}

pub static WLAN_INFO_PARAMS: &[ParameterSpec] = &[];

pub fn wlan_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let status = system.network.lock().unwrap();
    call.result = format!(
        "mode={:?} ssid={} connected={} rssi_dbm={}",
        status.mode, status.ssid, status.connected, status.rssi_dbm,
    );
    Ok(())
}

pub static WLAN_IP_INFO_PARAMS: &[ParameterSpec] = &[];

pub fn wlan_ip_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let status = system.network.lock().unwrap();
    let fmt = |a: Option<std::net::Ipv6Addr>| a.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
    call.result = format!(
        "ipv4={} ipv6_link_local={} ipv6_slaac={} ipv6_static={}",
        status.ipv4_address.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
        fmt(status.ipv6_link_local),
        fmt(status.ipv6_slaac),
        fmt(status.ipv6_static),
    );
    Ok(())
}

pub static IPV6_SLAAC_PARAMS: &[ParameterSpec] = &[];

pub fn ipv6_slaac(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let status = system.network.lock().unwrap();
    call.result = status.ipv6_slaac.map(|a| a.to_string()).unwrap_or_else(|| "none".to_string());
    Ok(())
}

pub static IPV6_STATIC_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("address").optional()];

/// With no argument, reports the current static address; with one, persists
/// it to the `ipv6-address` config key (spec.md §6.5) for the firmware
/// binary to apply on next bring-up.
pub fn ipv6_static(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    match call.word_opt(0) {
        Some(address) => {
            system.config.lock().unwrap().set_string("ipv6-address", address);
            call.result = format!("OK: ipv6-static {address}");
        }
        None => {
            let status = system.network.lock().unwrap();
            call.result = status.ipv6_static.map(|a| a.to_string()).unwrap_or_else(|| "none".to_string());
        }
    }
    Ok(())
}

pub static BT_INFO_PARAMS: &[ParameterSpec] = &[];

pub fn bt_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let ble = system.ble.lock().unwrap();
    call.result = format!(
        "advertising={} connected={} authorized={} handle={}",
        ble.advertising, ble.connected, ble.authorized, ble.connection_handle,
    );
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
    fn wlan_client_config_persists_ssid_and_password() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![
            Some(ParsedValue::Word("home-net".to_string())),
            Some(ParsedValue::Raw("s3cret".to_string())),
        ]);
        wlan_client_config(&system, &mut c).unwrap();
        assert_eq!(system.config.lock().unwrap().get_string("wlan-ssid").unwrap(), "home-net");
        assert_eq!(system.config.lock().unwrap().get_string("wlan-passwd").unwrap(), "s3cret");
    }

    #[test]
    fn wlan_info_reports_disconnected_default() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![]);
        wlan_info(&system, &mut c).unwrap();
        assert!(c.result.contains("connected=false"));
    }

    #[test]
    fn ipv6_static_without_argument_reports_none_by_default() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![None]);
        ipv6_static(&system, &mut c).unwrap();
        assert_eq!(c.result, "none");
    }

    #[test]
    fn ipv6_static_with_argument_persists_config_key() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![Some(ParsedValue::Word("2001:db8::1".to_string()))]);
        ipv6_static(&system, &mut c).unwrap();
        assert_eq!(system.config.lock().unwrap().get_string("ipv6-address").unwrap(), "2001:db8::1");
    }

    #[test]
    fn bt_info_reports_unauthorized_by_default() {
        let system = test_system(&EMPTY_TABLE);
        let mut c = call(vec![]);
        bt_info(&system, &mut c).unwrap();
        assert!(c.result.contains("authorized=false"));
    }
}
