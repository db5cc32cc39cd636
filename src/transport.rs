//! Origin tagging and the `InboundMessage`/`OutboundMessage` shapes shared
//! by all four transports (spec.md §3).

/// Which transport a message arrived on or must be sent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    Ble,
    Console,
    Tcp,
    Udp,
    Script,
}

/// Opaque, transport-specific return address — a tagged variant rather than
/// a `void*`/union, one arm per `Origin` (spec.md §3, §9 redesign flag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginAddress {
    Ble { connection_handle: u16 },
    Console { slot: u8 },
    Tcp { peer: std::net::SocketAddr },
    Udp { peer: std::net::SocketAddr },
    Script { task_handle: u32 },
}

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub origin: Origin,
    pub mtu: usize,
    pub packetised: bool,
    pub payload: Vec<u8>,
    pub oob: Vec<u8>,
    pub origin_address: OriginAddress,
}

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub origin: Origin,
    pub mtu: usize,
    pub packetised: bool,
    pub payload: Vec<u8>,
    pub oob: Vec<u8>,
    pub origin_address: OriginAddress,
}

/// Per-origin counters referenced in passing throughout spec.md §4.3 and
/// formalized by the `io-stats`/`io-dump` commands (SPEC_FULL.md §C).
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportStats {
    pub unauthorized_access: u32,
    pub defragmentation_timeouts: u32,
    pub indication_timeout: u32,
    pub indication_error: u32,
    pub send_errors: u32,
    pub receive_incomplete_packets: u32,
}
