//! Wire format constants and frame types.
//!
//! A frame on the wire looks like this, every field after the preamble being byte-stuffed:
//!
//! | Field           | Bytes    | Encoding                                   |
//! |-----------------|----------|--------------------------------------------|
//! | Preamble        | 4        | [`PREAMBLE`], little-endian, never escaped |
//! | Flags           | 2        | little-endian                              |
//! | Length          | 2        | little-endian payload length               |
//! | Header checksum | 1        | [`header_checksum`] of flags and length    |
//! | Payload         | `length` | raw bytes                                  |
//! | Frame CRC       | 4        | little-endian [`frame_checksum`]           |
//!
//! Stuffing: [`FLAG`] is sent as `ESCAPE FLAG` and [`ESCAPE`] as `ESCAPE ESCAPE`.
//!
//! [`frame_checksum`]: crate::crc::frame_checksum

use heapless::Vec;

use crate::crc::header_checksum;

/// Marker that (re)synchronizes frame boundaries.
pub const PREAMBLE: u32 = 0xAA55_AA55;

/// Byte that must be escaped inside header and body. Part of the preamble.
pub const FLAG: u8 = 0xAA;

/// Escape byte used for byte-stuffing.
pub const ESCAPE: u8 = 0x1B;

/// Length of the preamble.
pub const LEN_PREAMBLE: usize = 4;

/// Length of the flags field.
pub const LEN_FLAGS: usize = 2;

/// Length of the length field.
pub const LEN_LENGTH: usize = 2;

/// Length of the header checksum.
pub const LEN_XOR: usize = 1;

/// Length of the unescaped header.
pub const LEN_HEADER: usize = LEN_FLAGS + LEN_LENGTH + LEN_XOR;

/// Length of the frame CRC.
pub const LEN_CRC: usize = 4;

/// Largest payload a decoder with a scratch buffer of `capacity` bytes accepts.
///
/// One byte more than the header and CRC is kept free, so this is `capacity - 10`.
/// Returns [`None`] if the buffer cannot hold any frame.
#[inline]
pub const fn max_payload_len(capacity: usize) -> Option<usize> {
    capacity.checked_sub(LEN_HEADER + LEN_CRC + 1)
}

/// The unescaped frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    flags: u16,
    length: u16,
    checksum: u8,
}

impl Header {
    /// Creates a new [`Header`] with a matching checksum.
    #[inline]
    pub const fn new(flags: u16, length: u16) -> Self {
        Self {
            flags,
            length,
            checksum: header_checksum(flags, length),
        }
    }

    /// Reads a header as it was received. The checksum is not verified.
    #[inline]
    pub const fn from_bytes(bytes: &[u8; LEN_HEADER]) -> Self {
        Self {
            flags: u16::from_le_bytes([bytes[0], bytes[1]]),
            length: u16::from_le_bytes([bytes[2], bytes[3]]),
            checksum: bytes[4],
        }
    }

    /// Returns the encoded header.
    #[inline]
    pub const fn to_bytes(&self) -> [u8; LEN_HEADER] {
        let [flags_lo, flags_hi] = self.flags.to_le_bytes();
        let [length_lo, length_hi] = self.length.to_le_bytes();

        [flags_lo, flags_hi, length_lo, length_hi, self.checksum]
    }

    #[inline]
    pub const fn flags(&self) -> u16 {
        self.flags
    }

    #[inline]
    pub const fn length(&self) -> u16 {
        self.length
    }

    #[inline]
    pub const fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Returns `true` if the checksum matches flags and length.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.checksum == header_checksum(self.flags, self.length)
    }
}

/// A frame: caller defined `flags` and a borrowed `payload`.
///
/// # Lifetime of decoded frames
///
/// A frame returned by a decoder borrows the decoder's scratch buffer. The borrow checker
/// ties it to the `&mut` borrow of the decoder (or link) that produced it, so it has to be
/// dropped or copied out, e.g. into an [`OwnedFrame`], before the next byte is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame<'a> {
    flags: u16,
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Creates a new [`Frame`].
    #[inline]
    pub const fn new(flags: u16, payload: &'a [u8]) -> Self {
        Self { flags, payload }
    }

    /// Returns the flags.
    #[inline]
    pub const fn flags(&self) -> u16 {
        self.flags
    }

    /// Returns the payload length.
    #[inline]
    pub const fn length(&self) -> usize {
        self.payload.len()
    }

    /// Returns the payload.
    #[inline]
    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// A [`Frame`] that owns up to `N` bytes of payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedFrame<const N: usize> {
    flags: u16,
    payload: Vec<u8, N>,
}

impl<const N: usize> OwnedFrame<N> {
    /// Returns the flags.
    #[inline]
    pub const fn flags(&self) -> u16 {
        self.flags
    }

    /// Returns the payload.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Borrows this frame, e.g. to write it back to a link.
    #[inline]
    pub fn as_frame(&self) -> Frame<'_> {
        Frame::new(self.flags, &self.payload)
    }
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for OwnedFrame<N> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "OwnedFrame {{ flags: {=u16}, payload: {=[u8]} }}",
            self.flags,
            &self.payload[..]
        )
    }
}

/// Error returned when a payload does not fit into an [`OwnedFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError {
    /// Length of the rejected payload.
    pub length: usize,
    /// Capacity of the [`OwnedFrame`].
    pub capacity: usize,
}

impl core::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "payload of {} bytes exceeds capacity of {} bytes",
            self.length, self.capacity
        )
    }
}

impl core::error::Error for CapacityError {}

impl<const N: usize> TryFrom<Frame<'_>> for OwnedFrame<N> {
    type Error = CapacityError;

    fn try_from(frame: Frame<'_>) -> Result<Self, Self::Error> {
        let payload = Vec::from_slice(frame.payload()).map_err(|_| CapacityError {
            length: frame.length(),
            capacity: N,
        })?;

        Ok(Self {
            flags: frame.flags(),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let header = Header::new(0x1234, 3);

        assert_eq!(header.to_bytes(), [0x34, 0x12, 0x03, 0x00, 0x25]);
        assert_eq!(Header::from_bytes(&header.to_bytes()), header);
        assert!(header.is_valid());
    }

    #[test]
    fn altered_header_checksum_is_invalid() {
        let header = Header::from_bytes(&[0x34, 0x12, 0x03, 0x00, 0xFF]);

        assert_eq!(header.flags(), 0x1234);
        assert_eq!(header.length(), 3);
        assert!(!header.is_valid());
    }

    #[test]
    fn preamble_bytes() {
        assert_eq!(PREAMBLE.to_le_bytes(), [0x55, 0xAA, 0x55, 0xAA]);
    }

    #[test]
    fn payload_bound() {
        assert_eq!(max_payload_len(64), Some(54));
        assert_eq!(max_payload_len(10), Some(0));
        assert_eq!(max_payload_len(9), None);
    }

    #[test]
    fn owned_frame_copies_payload() {
        let payload = [0x10, 0xAA, 0x1B];
        let frame = Frame::new(0x1234, &payload);

        let owned = OwnedFrame::<8>::try_from(frame).expect("Must fit");

        assert_eq!(owned.flags(), 0x1234);
        assert_eq!(owned.payload(), &payload);
        assert_eq!(owned.as_frame(), frame);
    }

    #[test]
    fn owned_frame_rejects_large_payload() {
        let frame = Frame::new(0, &[0; 3]);

        let err = OwnedFrame::<2>::try_from(frame).expect_err("Must not fit");

        assert_eq!(
            err,
            CapacityError {
                length: 3,
                capacity: 2
            }
        );
    }
}
