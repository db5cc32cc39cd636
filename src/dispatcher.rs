//! Single-consumer dispatch step (spec.md §4.2): decapsulate, expand
//! aliases, tokenize, resolve, validate, invoke, encapsulate. Every code
//! path here produces exactly one `OutboundMessage` per `InboundMessage`
//! (spec.md §7: "the dispatcher never lets a handler error escape as an
//! unresponded message").

use crate::command::{parse_parameters, split_command_name, CommandCall};
use crate::error::CommandError;
use crate::packet::{decapsulate, encapsulate};
use crate::system::System;
use crate::transport::{InboundMessage, OutboundMessage};

/// Processes one inbound message to completion and returns its response.
pub fn dispatch_one(system: &System, message: InboundMessage) -> OutboundMessage {
    let (payload, oob) = decapsulate(message.packetised, &message.payload);
    let line = String::from_utf8_lossy(&payload);
    let line = line.trim_end_matches(['\r', '\n']);

    let expanded = system.aliases.lock().unwrap().expand(line);
    let result = run_command(system, &expanded, message.mtu, message.origin, oob);

    let (response_text, response_oob) = match result {
        Ok(call) => (call.result, call.result_oob),
        Err(err) => (format!("ERROR: {err}"), Vec::new()),
    };

    // `encapsulate` already folds the oob region into the returned wire
    // bytes (framed: appended after payload; unframed: NUL-separated), so
    // the outbound message's own `oob` field stays empty here.
    let wire = encapsulate(message.packetised, response_text.as_bytes(), &response_oob);

    OutboundMessage {
        origin: message.origin,
        mtu: message.mtu,
        packetised: message.packetised,
        payload: wire,
        oob: Vec::new(),
        origin_address: message.origin_address,
    }
}

/// Resolves and invokes a single command line. Exposed beyond this module so
/// the `run` command (spec.md §6.4) can replay lines from a stored script
/// under [`crate::transport::Origin::Script`].
pub fn run_command(
    system: &System,
    line: &str,
    mtu: usize,
    origin: crate::transport::Origin,
    oob: Vec<u8>,
) -> Result<CommandCall, CommandError> {
    let (name, rest) = split_command_name(line);
    let descriptor = system
        .command_table
        .resolve(name)
        .ok_or_else(|| {
            let mut n = heapless::String::new();
            let _ = n.push_str(name);
            CommandError::Validation(crate::error::ValidationError::UnknownCommand(n))
        })?;

    let parameters = parse_parameters(rest, descriptor.parameters)?;
    let mut call = CommandCall { origin, mtu, oob, parameters, result: String::new(), result_oob: Vec::new() };
    (descriptor.function)(system, &mut call)?;
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandDescriptor, CommandTable, ParameterSpec};
    use crate::system::fakes::test_system;
    use crate::transport::{Origin, OriginAddress};

    fn echo(_system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
        call.result = format!("echo: {}", call.word(0));
        Ok(())
    }

    static ECHO_PARAMS: &[ParameterSpec] = &[ParameterSpec::word("text")];
    static COMMANDS: &[CommandDescriptor] = &[CommandDescriptor {
        name: "echo",
        alias: None,
        help: "echo back a word",
        parameters: ECHO_PARAMS,
        function: echo,
    }];
    static TABLE: CommandTable = CommandTable { commands: COMMANDS };

    fn inbound(payload: &str) -> InboundMessage {
        InboundMessage {
            origin: Origin::Console,
            mtu: 512,
            packetised: false,
            payload: payload.as_bytes().to_vec(),
            oob: Vec::new(),
            origin_address: OriginAddress::Console { slot: 0 },
        }
    }

    #[test]
    fn known_command_produces_its_result() {
        let system = test_system(&TABLE);
        let response = dispatch_one(&system, inbound("echo hi\n"));
        assert_eq!(String::from_utf8(response.payload).unwrap(), "echo: hi\n");
    }

    #[test]
    fn unknown_command_produces_error_reply_not_silence() {
        let system = test_system(&TABLE);
        let response = dispatch_one(&system, inbound("nope\n"));
        let text = String::from_utf8(response.payload).unwrap();
        assert!(text.starts_with("ERROR: unknown command"));
    }

    #[test]
    fn alias_expansion_runs_before_resolution() {
        let system = test_system(&TABLE);
        system.aliases.lock().unwrap().set("e", "echo");
        let response = dispatch_one(&system, inbound("e hi\n"));
        assert_eq!(String::from_utf8(response.payload).unwrap(), "echo: hi\n");
    }

    #[test]
    fn response_origin_matches_request_origin() {
        let system = test_system(&TABLE);
        let response = dispatch_one(&system, inbound("echo hi\n"));
        assert_eq!(response.origin, Origin::Console);
    }
}
