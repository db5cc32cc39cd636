//! Compile-time board/protocol constants (SPEC_FULL.md §B): BLE GATT UUIDs,
//! transport ports and MTUs, console history sizing. Values are fixed by
//! spec.md §6 where it specifies them; the rest are the one set of
//! reasonable defaults this board has always shipped with.

/// 16-bit GATT primary service UUID (spec.md §6.3).
pub const BLE_SERVICE_UUID: u16 = 0xabf0;
/// Data characteristic: write + indicate, all command traffic.
pub const BLE_DATA_CHARACTERISTIC_UUID: u16 = 0xabf1;
/// Key characteristic: write-only, authentication challenge.
pub const BLE_KEY_CHARACTERISTIC_UUID: u16 = 0xabf2;

/// Defragmentation timer for a BLE reassembly buffer with no complete
/// packet yet (spec.md §4.3.1).
pub const BLE_DEFRAGMENTATION_TIMEOUT_MS: u32 = 10_000;
/// Max GATT indicate retries on an out-of-memory condition, with 100ms
/// backoff between attempts (spec.md §4.3.1).
pub const BLE_INDICATE_MAX_RETRIES: u8 = 16;
pub const BLE_INDICATE_RETRY_BACKOFF_MS: u32 = 100;
/// Fixed per-fragment overhead budgeted on top of the declared MTU.
pub const BLE_FRAGMENT_HEADER_OVERHEAD: usize = 8;

/// TCP and UDP both listen on port 24 (spec.md §4.3.3/§4.3.4).
pub const COMMAND_PORT: u16 = 24;
/// TCP's per-write chunk ceiling (spec.md §4.3.3).
pub const TCP_MTU: usize = 16 * 1024;
/// Poll timeout while a partial framed packet is still arriving over TCP.
pub const TCP_PARTIAL_PACKET_POLL_MS: u32 = 1_000;

/// Console line-editing history (spec.md §4.3.2).
pub const CONSOLE_HISTORY_LINES: usize = 8;
pub const CONSOLE_LINE_MAX_CHARS: usize = 64;

/// Steady-state sensor poll cadence (spec.md §4.5).
pub const SENSOR_POLL_INTERVAL_MS: u64 = 1_000;

/// Board identity string surfaced by `info-board`.
pub const BOARD_NAME: &str = "stationhub-esp32s3";
