//! Checksums used by the wire format.
//!
//! The frame checksum is a bit-serial CRC32 over the reflected polynomial `0xEDB88320`
//! without the usual initial inversion and final XOR. The running value is the result,
//! which makes it chainable:
//!
//! ```rust
//! use tinylink::crc::crc32;
//!
//! let whole = crc32(0, b"header+payload");
//! let chained = crc32(crc32(0, b"header"), b"+payload");
//!
//! assert_eq!(whole, chained);
//! ```

use crate::frame::LEN_HEADER;

/// Reflected CRC32 polynomial.
pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

/// Feeds a single `byte` into the running CRC `seed`.
#[inline]
pub const fn crc32_byte(seed: u32, byte: u8) -> u32 {
    let mut crc = (seed ^ byte as u32) & 0xFF;
    let mut bit = 0;

    while bit < 8 {
        crc = if crc & 1 == 1 {
            (crc >> 1) ^ CRC32_POLYNOMIAL
        } else {
            crc >> 1
        };

        bit += 1;
    }

    (seed >> 8) ^ crc
}

/// Feeds `data` into the running CRC `seed`.
///
/// `crc32(crc32(seed, a), b) == crc32(seed, a ‖ b)` holds for any `a` and `b`.
pub fn crc32(seed: u32, data: &[u8]) -> u32 {
    data.iter().fold(seed, |crc, &byte| crc32_byte(crc, byte))
}

/// XOR of the little-endian bytes of `flags` and `length`.
#[inline]
pub const fn header_checksum(flags: u16, length: u16) -> u8 {
    let [flags_lo, flags_hi] = flags.to_le_bytes();
    let [length_lo, length_hi] = length.to_le_bytes();

    flags_lo ^ flags_hi ^ length_lo ^ length_hi
}

/// CRC of a whole frame: the encoded header followed by the payload.
#[inline]
pub fn frame_checksum(header: &[u8; LEN_HEADER], payload: &[u8]) -> u32 {
    crc32(crc32(0, header), payload)
}
