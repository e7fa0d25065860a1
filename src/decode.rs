//! Frame decoding.
//!
//! [`FrameDecoder`] is a byte driven state machine: every call to
//! [`decode`](FrameDecoder::decode) consumes exactly one byte and most calls produce nothing.
//!
//! ```text
//!            preamble                 header ok                 crc checked
//! Seeking ─────────────▶ Header ─────────────────▶ Body ─────────────────────┐
//!    ▲                      │ bad checksum / length                           │
//!    └──────────────────────┴─────────────────────────────────────────────────┘
//! ```
//!
//! Corrupted frames are dropped silently and the machine goes back to searching for the
//! preamble. Only frames with a matching header checksum and CRC are ever returned.

use crate::{
    crc::frame_checksum,
    frame::{ESCAPE, Frame, Header, LEN_CRC, LEN_HEADER, LEN_PREAMBLE, PREAMBLE, max_payload_len},
    logging::{debug, trace, warn},
    state::{Phase, ReadState},
};

#[cfg(any(feature = "log", feature = "defmt", feature = "tracing"))]
use crate::logging::{DECODE, Formatter};

/// Decodes frames from a byte stream into a caller provided scratch buffer.
///
/// The buffer length is the capacity of the decoder. Payloads of up to
/// [`max_payload_len(capacity)`](max_payload_len) bytes are accepted.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameDecoder<'buf> {
    state: ReadState<'buf>,
}

impl<'buf> FrameDecoder<'buf> {
    /// Creates a new [`FrameDecoder`] searching for a preamble.
    ///
    /// Buffers shorter than 10 bytes never yield a frame.
    #[inline]
    pub const fn new(buffer: &'buf mut [u8]) -> Self {
        Self {
            state: ReadState::new(buffer),
        }
    }

    /// Returns the length of the scratch buffer.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.state.capacity()
    }

    /// Returns the current phase.
    #[inline]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Returns the number of bytes in the scratch buffer.
    #[inline]
    pub const fn buffered(&self) -> usize {
        self.state.index
    }

    /// Drops any partial frame and starts searching for the preamble again.
    #[inline]
    pub const fn reset(&mut self) {
        self.state.reset();
    }

    /// Consumes one `byte`.
    ///
    /// Returns a frame if `byte` completed a valid one. The frame's payload lives in the
    /// scratch buffer and is overwritten by the next call.
    pub fn decode(&mut self, byte: u8) -> Option<Frame<'_>> {
        let header = self.advance(byte)?;

        Some(self.frame(header))
    }

    /// Consumes bytes from `src` until a frame is complete or `src` is exhausted.
    ///
    /// Returns the number of consumed bytes together with the frame, if any. Bytes after
    /// the frame are not consumed.
    pub fn decode_slice(&mut self, src: &[u8]) -> (usize, Option<Frame<'_>>) {
        for (i, &byte) in src.iter().enumerate() {
            if let Some(header) = self.advance(byte) {
                return (i + 1, Some(self.frame(header)));
            }
        }

        (src.len(), None)
    }

    /// Advances the state machine by one byte.
    ///
    /// Returns the header of a completed, verified frame. Its payload stays in the buffer
    /// until the next call.
    pub(crate) fn advance(&mut self, byte: u8) -> Option<Header> {
        let state = &mut self.state;

        if state.phase != Phase::SeekingPreamble {
            if state.unescaping {
                // The byte after an escape replaces the stored marker.
                state.index -= 1;
                state.unescaping = false;
            } else if byte == ESCAPE {
                state.unescaping = true;
            }
        }

        if !state.push(byte) {
            warn!(
                target: DECODE,
                "Buffer overrun. phase: {:?}, capacity: {}",
                state.phase,
                state.capacity()
            );

            state.reset();

            return None;
        }

        if state.unescaping {
            return None;
        }

        let phase = state.phase;

        match phase {
            Phase::SeekingPreamble => {
                self.seek_preamble();

                None
            }
            Phase::ReadingHeader => {
                self.read_header();

                None
            }
            Phase::ReadingBody => self.read_body(),
        }
    }

    /// Returns the frame described by `header` from the scratch buffer.
    pub(crate) fn frame(&self, header: Header) -> Frame<'_> {
        let payload = self
            .state
            .buffer
            .get(LEN_HEADER..LEN_HEADER + usize::from(header.length()))
            .unwrap_or_default();

        Frame::new(header.flags(), payload)
    }

    fn seek_preamble(&mut self) {
        let state = &mut self.state;

        let Some(start) = state.index.checked_sub(LEN_PREAMBLE) else {
            return;
        };

        if le_u32(&state.buffer[start..state.index]) == Some(PREAMBLE) {
            trace!(target: DECODE, "Preamble found. skipped: {}", start);

            state.enter(Phase::ReadingHeader);
        } else if state.index == state.capacity() {
            // Keep the tail, the next byte may complete a preamble with it.
            state.buffer.copy_within(start..state.index, 0);
            state.index = LEN_PREAMBLE;

            trace!(
                target: DECODE,
                "Buffer full without preamble. kept: {:?}",
                Formatter(state.filled())
            );
        }
    }

    fn read_header(&mut self) {
        let state = &mut self.state;

        if state.index < LEN_HEADER {
            return;
        }

        let Some(header) = received_header(state.filled()) else {
            state.reset();

            return;
        };

        if !header.is_valid() {
            warn!(
                target: DECODE,
                "Header checksum mismatch. flags: {}, length: {}, checksum: {}",
                header.flags(),
                header.length(),
                header.checksum()
            );

            state.reset();

            return;
        }

        match max_payload_len(state.capacity()) {
            Some(max) if usize::from(header.length()) <= max => {
                trace!(
                    target: DECODE,
                    "Header accepted. flags: {}, length: {}",
                    header.flags(),
                    header.length()
                );

                state.phase = Phase::ReadingBody;
            }
            _ => {
                warn!(
                    target: DECODE,
                    "Payload length out of bounds. length: {}, capacity: {}",
                    header.length(),
                    state.capacity()
                );

                state.reset();
            }
        }
    }

    fn read_body(&mut self) -> Option<Header> {
        let state = &mut self.state;

        let Some(header) = received_header(state.filled()) else {
            state.reset();

            return None;
        };

        let length = usize::from(header.length());

        if state.index < LEN_HEADER + length + LEN_CRC {
            return None;
        }

        let received = le_u32(&state.buffer[LEN_HEADER + length..state.index]);
        let expected = frame_checksum(
            &header.to_bytes(),
            &state.buffer[LEN_HEADER..LEN_HEADER + length],
        );

        // The frame is consumed whether it is valid or not.
        state.reset();

        if received != Some(expected) {
            warn!(
                target: DECODE,
                "CRC mismatch. flags: {}, length: {}, expected: {}",
                header.flags(),
                length,
                expected
            );

            return None;
        }

        debug!(
            target: DECODE,
            "Frame decoded. flags: {}, payload: {:?}",
            header.flags(),
            Formatter(&state.buffer[LEN_HEADER..LEN_HEADER + length])
        );

        Some(header)
    }
}

/// Reads the header from the first bytes of `buffer`.
fn received_header(buffer: &[u8]) -> Option<Header> {
    buffer
        .get(..LEN_HEADER)?
        .try_into()
        .ok()
        .map(Header::from_bytes)
}

/// Reads a little-endian `u32` from a 4 byte slice.
fn le_u32(bytes: &[u8]) -> Option<u32> {
    bytes.try_into().ok().map(u32::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use crate::{
        encode::FrameEncoder,
        frame::FLAG,
        tests::{REFERENCE_FLAGS, REFERENCE_PAYLOAD, REFERENCE_WIRE, init_tracing},
    };

    use super::*;

    fn wire(flags: u16, payload: &[u8]) -> Vec<u8> {
        FrameEncoder::new(usize::from(u16::MAX))
            .encode(&Frame::new(flags, payload))
            .expect("Must encode")
            .collect()
    }

    /// Feeds `bytes` one at a time and collects every decoded frame as `(flags, payload)`.
    fn decode_all(decoder: &mut FrameDecoder<'_>, bytes: &[u8]) -> Vec<(u16, Vec<u8>)> {
        bytes
            .iter()
            .filter_map(|&byte| {
                decoder
                    .decode(byte)
                    .map(|frame| (frame.flags(), frame.payload().to_vec()))
            })
            .collect()
    }

    #[test]
    fn decodes_reference_frame() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut decoder = FrameDecoder::new(buffer);

        let (last, head) = REFERENCE_WIRE.split_last().expect("Must not be empty");

        for &byte in head {
            assert!(decoder.decode(byte).is_none());
        }

        let frame = decoder.decode(*last).expect("Must decode");

        assert_eq!(frame.flags(), REFERENCE_FLAGS);
        assert_eq!(frame.length(), 3);
        assert_eq!(frame.payload(), REFERENCE_PAYLOAD);

        assert_eq!(decoder.phase(), Phase::SeekingPreamble);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn wraps_buffer_when_full_without_preamble() {
        init_tracing();

        let buffer = &mut [0; 24];
        let mut decoder = FrameDecoder::new(buffer);

        // 22 bytes of junk followed by the first half of the preamble.
        let mut junk = (0x00..0x16).collect::<Vec<u8>>();
        junk.extend_from_slice(&[0x55, 0xAA]);

        assert!(decode_all(&mut decoder, &junk).is_empty());
        assert_eq!(decoder.phase(), Phase::SeekingPreamble);
        assert_eq!(decoder.buffered(), LEN_PREAMBLE);

        // The rest of the frame starts with the second half of the preamble.
        let frames = decode_all(&mut decoder, &REFERENCE_WIRE[2..]);

        assert_eq!(frames, [(REFERENCE_FLAGS, REFERENCE_PAYLOAD.to_vec())]);
    }

    #[test]
    fn rejects_invalid_header_checksum() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut decoder = FrameDecoder::new(buffer);

        let mut corrupted = REFERENCE_WIRE.to_vec();
        corrupted[8] = 0xFF;

        for &byte in &corrupted[..9] {
            assert!(decoder.decode(byte).is_none());
        }

        assert_eq!(decoder.phase(), Phase::SeekingPreamble);
        assert!(decode_all(&mut decoder, &corrupted[9..]).is_empty());
    }

    #[test]
    fn drops_frame_with_bad_crc_and_recovers() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut decoder = FrameDecoder::new(buffer);

        let mut corrupted = REFERENCE_WIRE.to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0x01;

        assert!(decode_all(&mut decoder, &corrupted).is_empty());
        assert_eq!(decoder.phase(), Phase::SeekingPreamble);

        let frames = decode_all(&mut decoder, REFERENCE_WIRE);

        assert_eq!(frames, [(REFERENCE_FLAGS, REFERENCE_PAYLOAD.to_vec())]);
    }

    #[test]
    fn enforces_payload_bound() {
        init_tracing();

        let buffer = &mut [0; 20];
        let mut decoder = FrameDecoder::new(buffer);

        let fits = [0x42; 10];
        let too_large = [0x42; 11];

        let frames = decode_all(&mut decoder, &wire(1, &fits));

        assert_eq!(frames, [(1, fits.to_vec())]);

        let rejected = wire(2, &too_large);

        // preamble and header
        assert!(decode_all(&mut decoder, &rejected[..9]).is_empty());
        assert_eq!(decoder.phase(), Phase::SeekingPreamble);
    }

    #[test]
    fn decodes_stuffed_bytes_everywhere() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut decoder = FrameDecoder::new(buffer);

        let payload = [FLAG, ESCAPE, ESCAPE, FLAG, 0x55, FLAG, 0x55, FLAG, ESCAPE];
        let frames = decode_all(&mut decoder, &wire(0x1BAA, &payload));

        assert_eq!(frames, [(0x1BAA, payload.to_vec())]);
    }

    #[test]
    fn preamble_inside_payload_does_not_resync() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut decoder = FrameDecoder::new(buffer);

        let payload = PREAMBLE.to_le_bytes();
        let frames = decode_all(&mut decoder, &wire(7, &payload));

        assert_eq!(frames, [(7, payload.to_vec())]);
    }

    #[test]
    fn resyncs_through_noise_between_frames() {
        init_tracing();

        let buffer = &mut [0; 32];
        let mut decoder = FrameDecoder::new(buffer);

        let mut stream = Vec::new();
        stream.extend_from_slice(&[0x55, 0xAA, 0x55, 0x00, 0x1B, 0xAA]);
        stream.extend(wire(1, b"first"));
        stream.extend((0..100).map(|i| (i * 37) as u8));
        stream.extend(wire(2, b""));
        // Truncated frame: the next preamble is swallowed as body bytes.
        stream.extend(&wire(3, b"lost")[..10]);
        stream.extend(wire(4, b"also lost"));
        stream.extend(wire(5, b"last"));

        let frames = decode_all(&mut decoder, &stream);

        assert_eq!(
            frames,
            [
                (1, b"first".to_vec()),
                (2, Vec::<u8>::new()),
                (5, b"last".to_vec())
            ]
        );
    }

    #[test]
    fn small_buffers_never_panic() {
        init_tracing();

        let mut stream = Vec::new();
        for _ in 0..4 {
            stream.extend_from_slice(REFERENCE_WIRE);
            stream.extend(wire(0, b""));
        }

        for capacity in 0..10 {
            let mut storage = [0; 10];
            let mut decoder = FrameDecoder::new(&mut storage[..capacity]);

            assert!(decode_all(&mut decoder, &stream).is_empty());
        }
    }

    #[test]
    fn empty_payload_needs_ten_bytes() {
        init_tracing();

        let buffer = &mut [0; 10];
        let mut decoder = FrameDecoder::new(buffer);

        assert_eq!(decode_all(&mut decoder, &wire(9, b"")), [(9, Vec::<u8>::new())]);
    }

    #[test]
    fn decode_slice_stops_after_frame() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut decoder = FrameDecoder::new(buffer);

        let mut stream = REFERENCE_WIRE.to_vec();
        stream.extend_from_slice(REFERENCE_WIRE);

        let (consumed, frame) = decoder.decode_slice(&stream);

        assert_eq!(consumed, REFERENCE_WIRE.len());
        assert_eq!(frame.map(|frame| frame.flags()), Some(REFERENCE_FLAGS));

        let (consumed, frame) = decoder.decode_slice(&stream[REFERENCE_WIRE.len()..]);

        assert_eq!(consumed, REFERENCE_WIRE.len());
        assert_eq!(frame.map(|frame| frame.payload()), Some(REFERENCE_PAYLOAD));

        let (consumed, frame) = decoder.decode_slice(&REFERENCE_WIRE[..5]);

        assert_eq!(consumed, 5);
        assert!(frame.is_none());
        assert_eq!(decoder.phase(), Phase::ReadingHeader);
    }

    #[test]
    fn reset_drops_partial_frame() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut decoder = FrameDecoder::new(buffer);

        assert!(decode_all(&mut decoder, &REFERENCE_WIRE[..12]).is_empty());
        assert_eq!(decoder.phase(), Phase::ReadingBody);

        decoder.reset();

        assert_eq!(decoder.phase(), Phase::SeekingPreamble);
        assert!(decode_all(&mut decoder, &REFERENCE_WIRE[12..]).is_empty());
        assert_eq!(
            decode_all(&mut decoder, REFERENCE_WIRE),
            [(REFERENCE_FLAGS, REFERENCE_PAYLOAD.to_vec())]
        );
    }
}
