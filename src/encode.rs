//! Frame encoding.
//!
//! Encoding is stateless: a [`FrameEncoder`] only knows the capacity it enforces and
//! produces the escaped wire bytes lazily through [`Encoded`], so no intermediate buffer is
//! needed to push a frame into a byte-at-a-time transport.

use core::iter::FusedIterator;

use crate::{
    crc::frame_checksum,
    frame::{ESCAPE, FLAG, Frame, Header, LEN_CRC, LEN_HEADER, LEN_PREAMBLE, PREAMBLE},
    logging::{trace, warn},
};

#[cfg(any(feature = "log", feature = "defmt", feature = "tracing"))]
use crate::logging::ENCODE;

/// Worst case number of wire bytes for a payload of `payload_len` bytes.
///
/// Assumes every byte after the preamble has to be escaped.
#[inline]
pub const fn max_encoded_len(payload_len: usize) -> usize {
    LEN_PREAMBLE + 2 * (LEN_HEADER + payload_len + LEN_CRC)
}

/// Error returned by [`FrameEncoder::encode`] and [`FrameEncoder::encode_to_slice`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The payload is larger than the capacity of the encoder or the 16-bit length field.
    PayloadTooLarge,
    /// The destination buffer is too small to fit the encoded frame.
    BufferTooSmall,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PayloadTooLarge => write!(f, "payload too large"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

impl core::error::Error for EncodeError {}

/// Encodes frames into their escaped wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameEncoder {
    /// Largest payload this encoder accepts.
    capacity: usize,
}

impl FrameEncoder {
    /// Creates a new [`FrameEncoder`] accepting payloads of up to `capacity` bytes.
    ///
    /// Links use the length of their scratch buffer, so both directions of a link share
    /// the same bound.
    #[inline]
    pub const fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Returns the largest payload this encoder accepts.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the wire bytes of `frame`.
    ///
    /// Fails with [`EncodeError::PayloadTooLarge`] if the payload is longer than
    /// [`capacity`](Self::capacity) or does not fit the 16-bit length field.
    pub fn encode<'a>(&self, frame: &Frame<'a>) -> Result<Encoded<'a>, EncodeError> {
        if frame.length() > self.capacity {
            warn!(
                target: ENCODE,
                "Payload too large. length: {}, capacity: {}",
                frame.length(),
                self.capacity
            );

            return Err(EncodeError::PayloadTooLarge);
        }

        let length = u16::try_from(frame.length()).map_err(|_| EncodeError::PayloadTooLarge)?;

        trace!(
            target: ENCODE,
            "Encoding. flags: {}, length: {}",
            frame.flags(),
            length
        );

        Ok(Encoded::new(Header::new(frame.flags(), length), frame.payload()))
    }

    /// Writes the wire bytes of `frame` into `dst` and returns their number.
    ///
    /// `dst` is left untouched on error. [`max_encoded_len`] gives a size that always fits.
    pub fn encode_to_slice(&self, frame: &Frame<'_>, dst: &mut [u8]) -> Result<usize, EncodeError> {
        let encoded = self.encode(frame)?;
        let size = encoded.wire_len();

        if dst.len() < size {
            return Err(EncodeError::BufferTooSmall);
        }

        for (slot, byte) in dst.iter_mut().zip(encoded) {
            *slot = byte;
        }

        Ok(size)
    }
}

/// Iterator over the wire bytes of one frame.
///
/// Yields the raw preamble followed by the escaped header, payload and CRC.
#[derive(Debug, Clone)]
pub struct Encoded<'a> {
    header: [u8; LEN_HEADER],
    payload: &'a [u8],
    crc: [u8; LEN_CRC],
    /// Position in the unescaped sequence `preamble ‖ header ‖ payload ‖ crc`.
    position: usize,
    /// Literal byte still owed after an emitted [`ESCAPE`].
    escaped: Option<u8>,
}

impl<'a> Encoded<'a> {
    fn new(header: Header, payload: &'a [u8]) -> Self {
        let header = header.to_bytes();
        let crc = frame_checksum(&header, payload).to_le_bytes();

        Self {
            header,
            payload,
            crc,
            position: 0,
            escaped: None,
        }
    }

    /// Returns the CRC that closes this frame.
    #[inline]
    pub const fn crc(&self) -> u32 {
        u32::from_le_bytes(self.crc)
    }

    /// Returns the number of wire bytes left to yield.
    pub fn wire_len(&self) -> usize {
        let owed = usize::from(self.escaped.is_some());

        owed + (self.position..)
            .map_while(|position| {
                self.logical(position)
                    .map(|byte| stuffed_len(position, byte))
            })
            .sum::<usize>()
    }

    fn logical(&self, position: usize) -> Option<u8> {
        let header_end = LEN_PREAMBLE + LEN_HEADER;
        let payload_end = header_end + self.payload.len();

        if position < LEN_PREAMBLE {
            PREAMBLE.to_le_bytes().get(position).copied()
        } else if position < header_end {
            self.header.get(position - LEN_PREAMBLE).copied()
        } else if position < payload_end {
            self.payload.get(position - header_end).copied()
        } else {
            self.crc.get(position - payload_end).copied()
        }
    }
}

/// Preamble bytes go out raw, everything after it is stuffed.
#[inline]
const fn must_escape(position: usize, byte: u8) -> bool {
    position >= LEN_PREAMBLE && matches!(byte, FLAG | ESCAPE)
}

#[inline]
const fn stuffed_len(position: usize, byte: u8) -> usize {
    if must_escape(position, byte) { 2 } else { 1 }
}

impl Iterator for Encoded<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(byte) = self.escaped.take() {
            return Some(byte);
        }

        let byte = self.logical(self.position)?;
        let escape = must_escape(self.position, byte);

        self.position += 1;

        if escape {
            self.escaped = Some(byte);

            return Some(ESCAPE);
        }

        Some(byte)
    }
}

impl FusedIterator for Encoded<'_> {}
