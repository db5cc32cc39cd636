//! Small stand-alone helpers: CRC32 for packet framing, the two sensor CRCs,
//! hex/MAC formatting. Kept together the way the original firmware's
//! `util.cpp` bundled these — none of them belong to a single subsystem.

/// CRC-32 (IEEE 802.3 / polynomial 0xEDB88320) over `data`, continuing from
/// `running` so callers can checksum a header and a body in separate calls
/// exactly like the original's `util_crc32(running, data, length)`.
pub fn crc32(running: u32, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(running);
    hasher.update(data);
    hasher.finalize()
}

/// CRC-8, polynomial 0x31, init 0xFF — Sensirion SHT3x protocol.
pub fn crc8_sht3x(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// CRC-16, polynomial 0xA001 (reflected 0x8005), init 0xFFFF — AM2320 protocol.
pub fn crc16_am2320(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Formats a 6-byte MAC/BD address as `aa:bb:cc:dd:ee:ff`.
pub fn format_mac(mac: &[u8; 6]) -> heapless::String<17> {
    let mut s = heapless::String::new();
    for (i, b) in mac.iter().enumerate() {
        if i > 0 {
            let _ = s.push(':');
        }
        let _ = core::fmt::write(&mut s, format_args!("{:02x}", b));
    }
    s
}

/// Lowercase-hex-encodes `data` into a heapless string of capacity `N`.
/// Truncates (rather than panicking) if `data` would overflow `N` — used
/// for the OTA hash response where `N` is sized for exactly 32 bytes.
pub fn hex_encode<const N: usize>(data: &[u8]) -> heapless::String<N> {
    let mut s = heapless::String::new();
    for b in data {
        if core::fmt::write(&mut s, format_args!("{:02x}", b)).is_err() {
            break;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_of_empty_is_zero() {
        assert_eq!(crc32(0, &[]), 0);
    }

    #[test]
    fn crc32_matches_known_vector() {
        // "123456789" is the standard CRC-32/ISO-HDLC check vector.
        assert_eq!(crc32(0, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc32_is_continuable() {
        let whole = crc32(0, b"hello world");
        let split = crc32(crc32(0, b"hello "), b"world");
        assert_eq!(whole, split);
    }

    #[test]
    fn crc8_sht3x_known_vector() {
        // From the Sensirion SHT3x datasheet worked example: 0xBE 0xEF -> 0x92.
        assert_eq!(crc8_sht3x(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn crc16_am2320_of_empty_is_init_value() {
        assert_eq!(crc16_am2320(&[]), 0xFFFF);
    }

    #[test]
    fn format_mac_is_colon_separated_lowercase_hex() {
        let mac = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
        assert_eq!(format_mac(&mac).as_str(), "00:11:22:33:44:55");
    }

    #[test]
    fn hex_encode_roundtrips_known_bytes() {
        let s: heapless::String<8> = hex_encode(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(s.as_str(), "deadbeef");
    }
}
