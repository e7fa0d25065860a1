use embedded_io::ReadReady;

use crate::{
    ReadError, WriteError,
    decode::FrameDecoder,
    encode::FrameEncoder,
    frame::Frame,
    logging::{debug, error, trace, warn},
    transport::Transport,
};

#[cfg(any(feature = "log", feature = "defmt", feature = "tracing"))]
use crate::logging::LINK;

/// Number of wire bytes handed to the transport at once.
pub(crate) const CHUNK: usize = 16;

/// A blocking link that writes frames to and reads frames from a [`Transport`].
///
/// The scratch buffer passed to [`TinyLink::new`] bounds both directions: written payloads
/// may be as long as the buffer, received payloads may be as long as
/// [`max_payload_len`](crate::frame::max_payload_len) of it.
///
/// # Example
///
/// ```rust
/// use tinylink::{TinyLink, mock::MockTransport};
///
/// let buffer = &mut [0u8; 64];
/// let mut link = TinyLink::new(MockTransport::<128>::new(), buffer);
///
/// link.write(0x0001, b"ping").unwrap();
/// link.transport_mut().loop_back().unwrap();
///
/// let frame = link.next_frame().unwrap();
///
/// assert_eq!(frame.flags(), 0x0001);
/// assert_eq!(frame.payload(), b"ping");
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TinyLink<'buf, T> {
    decoder: FrameDecoder<'buf>,
    encoder: FrameEncoder,
    transport: T,
}

impl<'buf, T> TinyLink<'buf, T> {
    /// Creates a new [`TinyLink`] over `transport` using `buffer` as scratch buffer.
    #[inline]
    pub const fn new(transport: T, buffer: &'buf mut [u8]) -> Self {
        let capacity = buffer.len();

        Self {
            decoder: FrameDecoder::new(buffer),
            encoder: FrameEncoder::new(capacity),
            transport,
        }
    }

    /// Returns the length of the scratch buffer.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.decoder.capacity()
    }

    /// Returns reference to the decoder.
    #[inline]
    pub const fn decoder(&self) -> &FrameDecoder<'buf> {
        &self.decoder
    }

    /// Returns mutable reference to the decoder.
    #[inline]
    pub const fn decoder_mut(&mut self) -> &mut FrameDecoder<'buf> {
        &mut self.decoder
    }

    /// Returns reference to the encoder.
    #[inline]
    pub const fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    /// Returns reference to the transport.
    #[inline]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns mutable reference to the transport.
    #[inline]
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the [`TinyLink`] and returns the decoder, the encoder and the transport.
    #[inline]
    pub fn into_parts(self) -> (FrameDecoder<'buf>, FrameEncoder, T) {
        (self.decoder, self.encoder, self.transport)
    }
}

impl<T> TinyLink<'_, T>
where
    T: Transport,
{
    /// Reads exactly one byte from the transport and feeds it to the decoder.
    ///
    /// # Return value
    ///
    /// - `Ok(Some(frame))` if the byte completed a valid frame.
    /// - `Ok(None)` if it did not. Call `read_frame` again.
    /// - `Err(ReadError::Eof)` if the transport reached end of stream.
    /// - `Err(ReadError::IO(_))` if the transport failed.
    ///
    /// The transport read blocks until a byte is available. Guard non-blocking transports
    /// with [`try_read_frame`](Self::try_read_frame).
    pub fn read_frame(&mut self) -> Result<Option<Frame<'_>>, ReadError<T::Error>> {
        let byte = self.receive_byte()?;

        Ok(self.decoder.decode(byte))
    }

    /// Like [`read_frame`](Self::read_frame) but returns `Ok(None)` without touching the
    /// decoder if no byte is ready.
    pub fn try_read_frame(&mut self) -> Result<Option<Frame<'_>>, ReadError<T::Error>>
    where
        T: ReadReady,
    {
        if !self.transport.read_ready().map_err(ReadError::IO)? {
            return Ok(None);
        }

        self.read_frame()
    }

    /// Reads until a valid frame arrives.
    pub fn next_frame(&mut self) -> Result<Frame<'_>, ReadError<T::Error>> {
        loop {
            let byte = self.receive_byte()?;

            if let Some(header) = self.decoder.advance(byte) {
                return Ok(self.decoder.frame(header));
            }
        }
    }

    /// Reads one byte and copies a completed frame's payload into `dst`.
    ///
    /// Returns the payload length if a frame was completed. If the payload does not fit
    /// into `dst` the frame is dropped and [`ReadError::BufferTooSmall`] is returned.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<Option<usize>, ReadError<T::Error>> {
        let Some(frame) = self.read_frame()? else {
            return Ok(None);
        };

        copy_payload(&frame, dst).map(Some)
    }

    /// Encodes `frame`, writes it to the transport and flushes.
    ///
    /// Nothing is written if the payload is larger than [`capacity`](Self::capacity).
    pub fn write_frame(&mut self, frame: &Frame<'_>) -> Result<(), WriteError<T::Error>> {
        let encoded = self.encoder.encode(frame)?;

        let mut chunk = [0; CHUNK];
        let mut filled = 0;

        for byte in encoded {
            chunk[filled] = byte;
            filled += 1;

            if filled == CHUNK {
                self.send(&chunk)?;

                filled = 0;
            }
        }

        self.send(&chunk[..filled])?;

        self.transport.flush().map_err(|err| {
            error!(target: LINK, "Failed to flush");

            WriteError::IO(err)
        })?;

        debug!(
            target: LINK,
            "Frame written. flags: {}, length: {}",
            frame.flags(),
            frame.length()
        );

        Ok(())
    }

    /// Writes a frame made of `flags` and `payload`. See [`write_frame`](Self::write_frame).
    pub fn write(&mut self, flags: u16, payload: &[u8]) -> Result<(), WriteError<T::Error>> {
        self.write_frame(&Frame::new(flags, payload))
    }

    fn receive_byte(&mut self) -> Result<u8, ReadError<T::Error>> {
        match self.transport.read_byte() {
            Ok(Some(byte)) => Ok(byte),
            Ok(None) => {
                debug!(target: LINK, "EOF");

                Err(ReadError::Eof)
            }
            Err(err) => {
                error!(target: LINK, "Failed to read");

                Err(ReadError::IO(err))
            }
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), WriteError<T::Error>> {
        if bytes.is_empty() {
            return Ok(());
        }

        trace!(target: LINK, "Writing. bytes: {}", bytes.len());

        self.transport.write_bytes(bytes).map_err(|err| {
            error!(target: LINK, "Failed to write");

            WriteError::IO(err)
        })
    }
}

/// Copies the payload of `frame` into the front of `dst`.
pub(crate) fn copy_payload<I>(frame: &Frame<'_>, dst: &mut [u8]) -> Result<usize, ReadError<I>> {
    let payload = frame.payload();

    match dst.get_mut(..payload.len()) {
        Some(dst) => {
            dst.copy_from_slice(payload);

            Ok(payload.len())
        }
        None => {
            warn!(
                target: LINK,
                "Destination too small, frame dropped. length: {}, capacity: {}",
                payload.len(),
                dst.len()
            );

            Err(ReadError::BufferTooSmall)
        }
    }
}
