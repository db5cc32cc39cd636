//! UDP transport (spec.md §4.3.4): one unbound IPv6 datagram socket, port
//! 24. Each `recvfrom` is exactly one inbound message — no cross-datagram
//! reassembly; a framed-but-incomplete datagram is simply dropped.

use std::net::{SocketAddr, UdpSocket};

use crate::board::COMMAND_PORT;
use crate::packet::{packet_complete, packet_valid};
use crate::transport::{InboundMessage, Origin, OriginAddress, OutboundMessage};

/// Safely below the common IPv6 path MTU, so a single `sendto` never
/// fragments at the IP layer.
const UDP_MTU: usize = 1200;

/// Binds the one UDP socket this board ever runs, per spec.md §4.3.4.
pub fn socket() -> std::io::Result<UdpSocket> {
    UdpSocket::bind(("::", COMMAND_PORT))
}

/// What one `recvfrom` produced.
#[derive(Debug)]
pub enum RecvOutcome {
    Message(InboundMessage),
    /// A framed packet whose declared length exceeds what arrived in this
    /// datagram; caller bumps `receive_incomplete_packets`.
    IncompletePacketDropped,
}

/// Interprets one already-received datagram (split out from `recv_one` so
/// the framing logic is testable without a real socket).
pub fn parse_datagram(bytes: &[u8], peer: SocketAddr) -> RecvOutcome {
    let packetised = packet_valid(bytes);
    if packetised && !packet_complete(bytes) {
        return RecvOutcome::IncompletePacketDropped;
    }
    RecvOutcome::Message(InboundMessage {
        origin: Origin::Udp,
        mtu: UDP_MTU,
        packetised,
        payload: bytes.to_vec(),
        oob: Vec::new(),
        origin_address: OriginAddress::Udp { peer },
    })
}

pub fn recv_one(socket: &UdpSocket) -> std::io::Result<RecvOutcome> {
    let mut buf = [0u8; 65_535];
    let (n, peer) = socket.recv_from(&mut buf)?;
    Ok(parse_datagram(&buf[..n], peer))
}

/// `sendto` using the sockaddr captured when the request arrived.
pub fn send_message(
    socket: &UdpSocket,
    message: &OutboundMessage,
    peer: SocketAddr,
) -> std::io::Result<()> {
    socket.send_to(&message.payload, peer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::encapsulate;

    fn peer() -> SocketAddr {
        "127.0.0.1:9999".parse().unwrap()
    }

    #[test]
    fn complete_framed_datagram_is_submitted_packetised() {
        let wire = encapsulate(true, b"sensor-json", b"");
        match parse_datagram(&wire, peer()) {
            RecvOutcome::Message(message) => {
                assert!(message.packetised);
                assert_eq!(message.payload, wire);
                assert_eq!(message.origin, Origin::Udp);
            }
            RecvOutcome::IncompletePacketDropped => panic!("expected a message"),
        }
    }

    #[test]
    fn truncated_framed_datagram_is_dropped_not_reassembled() {
        let wire = encapsulate(true, b"a longer payload than the truncation", b"");
        let truncated = &wire[..wire.len() - 5];
        assert!(matches!(parse_datagram(truncated, peer()), RecvOutcome::IncompletePacketDropped));
    }

    #[test]
    fn unframed_datagram_is_submitted_raw() {
        let outcome = parse_datagram(b"help\n", peer());
        match outcome {
            RecvOutcome::Message(message) => {
                assert!(!message.packetised);
                assert_eq!(message.payload, b"help\n");
            }
            RecvOutcome::IncompletePacketDropped => panic!("expected a message"),
        }
    }

    #[test]
    fn loopback_round_trip_delivers_bytes() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        let client_addr = client.local_addr().unwrap();
        client.send_to(b"help\n", server_addr).unwrap();

        let outcome = recv_one(&server).unwrap();
        let message = match outcome {
            RecvOutcome::Message(m) => m,
            RecvOutcome::IncompletePacketDropped => panic!("expected a message"),
        };
        assert_eq!(message.payload, b"help\n");

        let response = OutboundMessage {
            origin: Origin::Udp,
            mtu: UDP_MTU,
            packetised: false,
            payload: b"ok\n".to_vec(),
            oob: Vec::new(),
            origin_address: message.origin_address.clone(),
        };
        send_message(&server, &response, client_addr).unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = client.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ok\n");
        assert_eq!(from, server_addr);
    }
}
