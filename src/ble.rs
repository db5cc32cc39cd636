//! BLE GATT transport state machine (spec.md §4.3.1, §6.3): key-characteristic
//! authentication, the `data`-characteristic reassembly buffer with its
//! defragmentation timeout, and outbound fragmentation with bounded indicate
//! retries. Real GATT I/O (esp32-nimble) lives in the firmware binary; this
//! module is the pure, host-testable logic it drives.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;

use crate::board::{
    BLE_DEFRAGMENTATION_TIMEOUT_MS, BLE_FRAGMENT_HEADER_OVERHEAD, BLE_INDICATE_MAX_RETRIES,
    BLE_INDICATE_RETRY_BACKOFF_MS,
};
use crate::packet::{packet_complete, packet_valid};

/// Fixed device key the key characteristic's ciphertext is decrypted
/// against. A real device would provision this from eFuse/NVS at
/// manufacturing time; it is compiled in here as the one key this board
/// family has ever shipped with.
const DEVICE_KEY: [u8; 32] = [
    0x42, 0x19, 0xA7, 0x5C, 0x8E, 0x03, 0xD1, 0xB6, 0x2F, 0x91, 0x7A, 0x44, 0xEE, 0x10, 0x3B, 0xC5,
    0x6D, 0x88, 0x02, 0x9F, 0x33, 0xAB, 0x5E, 0x77, 0x14, 0xF0, 0x6C, 0x21, 0x9D, 0x4A, 0x8B, 0x55,
];

fn cipher() -> Aes256 {
    Aes256::new(GenericArray::from_slice(&DEVICE_KEY))
}

fn decrypt_block(ciphertext: &[u8; 16]) -> [u8; 16] {
    let mut block = *GenericArray::from_slice(ciphertext);
    cipher().decrypt_block(&mut block);
    block.into()
}

/// Encrypts a plaintext block under the built-in device key — used by the
/// peer (and by tests standing in for one) to produce a valid `key` write.
pub fn encrypt_block(plaintext: &[u8; 16]) -> [u8; 16] {
    let mut block = *GenericArray::from_slice(plaintext);
    cipher().encrypt_block(&mut block);
    block.into()
}

/// `expected_key[0..6] = mac XOR 0x55`, `expected_key[6..12] = reverse(mac) XOR 0xAA`.
pub fn expected_token(mac: &[u8; 6]) -> [u8; 12] {
    let mut token = [0u8; 12];
    for i in 0..6 {
        token[i] = mac[i] ^ 0x55;
    }
    let mut reversed = *mac;
    reversed.reverse();
    for i in 0..6 {
        token[6 + i] = reversed[i] ^ 0xAA;
    }
    token
}

/// Per-connection BLE authentication state.
pub struct BleAuth {
    mac: [u8; 6],
    authorized: bool,
}

impl BleAuth {
    pub fn new(mac: [u8; 6]) -> Self {
        Self { mac, authorized: false }
    }

    pub fn authorized(&self) -> bool {
        self.authorized
    }

    /// A connection drop (spec.md §5: "BLE authentication is per-connection:
    /// disconnect clears it").
    pub fn on_disconnect(&mut self) {
        self.authorized = false;
    }

    /// Validates one ciphertext write to `0xabf2`. Always resets
    /// `authorized = false` first, then re-validates (spec.md §4.3.1: "any
    /// subsequent write to `key` resets `authorized = false` before
    /// re-validation").
    pub fn on_key_write(&mut self, ciphertext: &[u8; 16]) -> bool {
        self.authorized = false;
        let plaintext = decrypt_block(ciphertext);
        let valid = plaintext[12..16] == [0x04, 0x04, 0x04, 0x04]
            && plaintext[0..12] == expected_token(&self.mac);
        self.authorized = valid;
        valid
    }
}

/// What a `data`-characteristic write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Not authorized; the write was dropped (caller bumps `unauthorized_access`).
    Unauthorized,
    /// A complete or unframed message is ready to submit.
    Submit { packetised: bool, bytes: Vec<u8> },
    /// A framed packet is still arriving; the defragmentation timer is running.
    Pending,
}

/// The `data` characteristic's reassembly buffer (spec.md §4.3.1).
#[derive(Default)]
pub struct GattReassembler {
    buffer: Vec<u8>,
    elapsed_ms: u32,
    pending: bool,
}

impl GattReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one write to `data`. Caller is responsible for the
    /// `authorized` gate (spec.md: unauthorized writes bump a counter and
    /// never reach the reassembler).
    pub fn on_write(&mut self, chunk: &[u8]) -> ReceiveOutcome {
        self.buffer.extend_from_slice(chunk);

        if packet_valid(&self.buffer) {
            if packet_complete(&self.buffer) {
                let bytes = std::mem::take(&mut self.buffer);
                self.pending = false;
                self.elapsed_ms = 0;
                ReceiveOutcome::Submit { packetised: true, bytes }
            } else {
                self.pending = true;
                self.elapsed_ms = 0;
                ReceiveOutcome::Pending
            }
        } else {
            let bytes = std::mem::take(&mut self.buffer);
            self.pending = false;
            self.elapsed_ms = 0;
            ReceiveOutcome::Submit { packetised: false, bytes }
        }
    }

    /// Advances the defragmentation clock by `delta_ms`. Returns `true` if
    /// the 10s timeout just fired, in which case the buffer has been
    /// cleared and the caller should bump `defragmentation_timeouts`.
    pub fn advance(&mut self, delta_ms: u32) -> bool {
        if !self.pending {
            return false;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        if self.elapsed_ms >= BLE_DEFRAGMENTATION_TIMEOUT_MS {
            self.buffer.clear();
            self.pending = false;
            self.elapsed_ms = 0;
            true
        } else {
            false
        }
    }
}

/// Splits outbound bytes into indicate-sized chunks (spec.md §4.3.1: "chunks
/// of at most `mtu + header + 8`").
pub fn fragment(bytes: &[u8], mtu: usize) -> Vec<Vec<u8>> {
    let chunk_size = (mtu + BLE_FRAGMENT_HEADER_OVERHEAD).max(1);
    if bytes.is_empty() {
        return vec![Vec::new()];
    }
    bytes.chunks(chunk_size).map(|c| c.to_vec()).collect()
}

/// Result of one GATT indicate attempt, as reported by the BLE stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicateResult {
    Ok,
    OutOfMemory,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Retries exhausted on repeated out-of-memory; bump `indication_timeout`.
    RetriesExhausted,
    /// A non-OOM error terminated the message; bump `indication_error`.
    Errored,
}

/// Sends one fragment with up to [`BLE_INDICATE_MAX_RETRIES`] retries and
/// [`BLE_INDICATE_RETRY_BACKOFF_MS`] backoff on out-of-memory.
pub fn send_with_retry(
    chunk: &[u8],
    mut indicate: impl FnMut(&[u8]) -> IndicateResult,
    mut sleep_ms: impl FnMut(u32),
) -> SendOutcome {
    for attempt in 0..BLE_INDICATE_MAX_RETRIES {
        match indicate(chunk) {
            IndicateResult::Ok => return SendOutcome::Sent,
            IndicateResult::Error => return SendOutcome::Errored,
            IndicateResult::OutOfMemory => {
                if attempt + 1 < BLE_INDICATE_MAX_RETRIES {
                    sleep_ms(BLE_INDICATE_RETRY_BACKOFF_MS);
                }
            }
        }
    }
    SendOutcome::RetriesExhausted
}
