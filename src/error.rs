//! The five error kinds from spec.md §7, and how each one is surfaced.
//!
//! `ProtocolError` and `ValidationError` become single-line `ERROR: ...`
//! replies; `TransientError` is usually caught by the handler and turned
//! into a default value or a specific message; `HardError` aborts the
//! process; `AuthError` is counted silently and never replied to (BLE has
//! no reply path for an unauthorized write).

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid header checksum")]
    HeaderChecksum,
    #[error("invalid packet checksum")]
    PacketChecksum,
    #[error("packet header length mismatch: expected {expected}, got {got}")]
    HeaderLength { expected: u16, got: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown command \"{0}\"")]
    UnknownCommand(heapless::String<32>),
    #[error("missing required parameter {0}")]
    MissingParameter(usize),
    #[error("too many parameters")]
    TooManyParameters,
    #[error("invalid {kind} value: {value}, smaller than lower bound: {bound}")]
    BelowLowerBound {
        kind: &'static str,
        value: heapless::String<24>,
        bound: heapless::String<24>,
    },
    #[error("invalid {kind} value: {value}, larger than upper bound: {bound}")]
    AboveUpperBound {
        kind: &'static str,
        value: heapless::String<24>,
        bound: heapless::String<24>,
    },
    #[error("invalid {kind} value: {value}")]
    Malformed {
        kind: &'static str,
        value: heapless::String<24>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransientError {
    #[error("config key not found")]
    ConfigKeyNotFound,
    #[error("peripheral timeout")]
    PeripheralTimeout,
    #[error("i2c NAK from device")]
    I2cNak,
    #[error("operation not supported on this controller")]
    Unsupported,
    #[error("blob not found")]
    BlobNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardError {
    #[error("queue canary mismatch: {0}")]
    QueueCanary(&'static str),
    #[error("mutex creation failed")]
    MutexCreation,
    #[error("impossible state transition: {0}")]
    ImpossibleTransition(&'static str),
}

/// Raised on every BLE write to the data characteristic while unauthorized.
/// Never produces a reply — just a counter bump (spec.md §4.3.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthError;

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unauthorized access")
    }
}

/// Unifies the reply-producing error kinds so a command handler can
/// return any of them with `?` and have the dispatcher format a single
/// `ERROR: ...` line (spec.md §7: "every code path produces exactly one
/// outbound message per inbound message").
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transient(#[from] TransientError),
    #[error("{0}")]
    Other(heapless::String<96>),
}

impl CommandError {
    pub fn other(msg: &str) -> Self {
        let mut s = heapless::String::new();
        let _ = s.push_str(msg);
        CommandError::Other(s)
    }
}
