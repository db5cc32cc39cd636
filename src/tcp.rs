//! TCP transport (spec.md §4.3.3): one IPv6 listener on port 24, one
//! connection at a time, poll-based partial-packet reads.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use crate::board::{COMMAND_PORT, TCP_MTU, TCP_PARTIAL_PACKET_POLL_MS};
use crate::packet::{packet_complete, packet_valid};
use crate::transport::{InboundMessage, Origin, OriginAddress, OutboundMessage};

/// Binds the one TCP listener this board ever runs, per spec.md §4.3.3.
pub fn listener() -> std::io::Result<TcpListener> {
    TcpListener::bind(("::", COMMAND_PORT))
}

/// Reads one message to completion from `stream`. Keeps reading with a 1s
/// poll timeout for as long as a framed packet looks valid but incomplete;
/// anything else (an unframed line, or a complete framed packet) is
/// returned as soon as it is recognised. `Ok(None)` means the peer closed
/// the connection before sending anything.
pub fn read_message(
    stream: &mut TcpStream,
    peer: SocketAddr,
) -> std::io::Result<Option<InboundMessage>> {
    stream.set_read_timeout(Some(Duration::from_millis(TCP_PARTIAL_PACKET_POLL_MS as u64)))?;

    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => {
                return Ok(if buffer.is_empty() { None } else { Some(finish(buffer, peer)) });
            }
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if packet_valid(&buffer) {
                    if packet_complete(&buffer) {
                        return Ok(Some(finish(buffer, peer)));
                    }
                    // Keep polling: the 1s read timeout above bounds each wait.
                } else {
                    return Ok(Some(finish(buffer, peer)));
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}

fn finish(buffer: Vec<u8>, peer: SocketAddr) -> InboundMessage {
    let packetised = packet_valid(&buffer) && packet_complete(&buffer);
    InboundMessage {
        origin: Origin::Tcp,
        mtu: TCP_MTU,
        packetised,
        payload: buffer,
        oob: Vec::new(),
        origin_address: OriginAddress::Tcp { peer },
    }
}

/// Writes an outbound message in ≤ `TCP_MTU` chunks. Any write error should
/// be treated by the caller as connection-terminating and counted against
/// `send_errors`.
pub fn send_message(stream: &mut TcpStream, message: &OutboundMessage) -> std::io::Result<()> {
    for chunk in message.payload.chunks(TCP_MTU) {
        stream.write_all(chunk)?;
    }
    Ok(())
}
