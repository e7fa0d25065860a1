use futures::{Sink, Stream};

use crate::{
    ReadError, WriteError,
    decode::FrameDecoder,
    encode::FrameEncoder,
    frame::Frame,
    link::{CHUNK, copy_payload},
    logging::{debug, error, trace},
    transport::AsyncTransport,
};

#[cfg(any(feature = "log", feature = "defmt", feature = "tracing"))]
use crate::logging::LINK;

/// An async link that writes frames to and reads frames from an [`AsyncTransport`].
///
/// Same wire behaviour as [`TinyLink`](crate::TinyLink), plus [`Stream`] and [`Sink`]
/// adapters.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FramedLink<'buf, T> {
    decoder: FrameDecoder<'buf>,
    encoder: FrameEncoder,
    transport: T,
}

impl<'buf, T> FramedLink<'buf, T> {
    /// Creates a new [`FramedLink`] over `transport` using `buffer` as scratch buffer.
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

    /// Consumes the [`FramedLink`] and returns the decoder, the encoder and the transport.
    #[inline]
    pub fn into_parts(self) -> (FrameDecoder<'buf>, FrameEncoder, T) {
        (self.decoder, self.encoder, self.transport)
    }
}

impl<T> FramedLink<'_, T>
where
    T: AsyncTransport,
{
    /// Reads exactly one byte and feeds it to the decoder.
    ///
    /// See [`TinyLink::read_frame`](crate::TinyLink::read_frame) for the return value.
    pub async fn read_frame(&mut self) -> Result<Option<Frame<'_>>, ReadError<T::Error>> {
        let byte = self.receive_byte().await?;

        Ok(self.decoder.decode(byte))
    }

    /// Reads until a valid frame arrives.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core::error::Error;
    ///
    /// use tinylink::{FramedLink, mock::MockTransport};
    ///
    /// async fn read() -> Result<(), Box<dyn Error>> {
    ///     let buffer = &mut [0u8; 64];
    ///
    ///     let mut link = FramedLink::new(MockTransport::<64>::new(), buffer);
    ///
    ///     let frame = link.next_frame().await?;
    ///
    ///     println!("flags: {}, payload: {:?}", frame.flags(), frame.payload());
    ///
    ///     Ok(())
    /// }
    /// ```
    pub async fn next_frame(&mut self) -> Result<Frame<'_>, ReadError<T::Error>> {
        loop {
            let byte = self.receive_byte().await?;

            if let Some(header) = self.decoder.advance(byte) {
                return Ok(self.decoder.frame(header));
            }
        }
    }

    /// See [`TinyLink::read`](crate::TinyLink::read).
    pub async fn read(&mut self, dst: &mut [u8]) -> Result<Option<usize>, ReadError<T::Error>> {
        let Some(frame) = self.read_frame().await? else {
            return Ok(None);
        };

        copy_payload(&frame, dst).map(Some)
    }

    /// Converts the [`FramedLink`] into a stream of frames using the given `map` function.
    ///
    /// The stream ends at end of stream and after the first error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core::{error::Error, pin::pin};
    ///
    /// use futures::StreamExt;
    /// use tinylink::{FramedLink, frame::Frame, mock::MockTransport};
    ///
    /// fn flags(frame: Frame<'_>) -> u16 {
    ///     frame.flags()
    /// }
    ///
    /// async fn read() -> Result<(), Box<dyn Error>> {
    ///     let buffer = &mut [0u8; 64];
    ///
    ///     let mut link = FramedLink::new(MockTransport::<64>::new(), buffer);
    ///
    ///     let stream = link.stream(flags);
    ///     let mut stream = pin!(stream);
    ///
    ///     while let Some(flags) = stream.next().await.transpose()? {
    ///         println!("flags: {}", flags);
    ///     }
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn stream<U>(
        &mut self,
        map: fn(Frame<'_>) -> U,
    ) -> impl Stream<Item = Result<U, ReadError<T::Error>>> + '_
    where
        U: 'static,
    {
        futures::stream::unfold((self, false), move |(this, errored)| async move {
            if errored {
                return None;
            }

            match this.next_frame().await.map(map) {
                Ok(item) => Some((Ok(item), (this, false))),
                Err(ReadError::Eof) => None,
                Err(err) => Some((Err(err), (this, true))),
            }
        })
    }

    /// Encodes `frame`, writes it to the transport and flushes.
    ///
    /// Nothing is written if the payload is larger than [`capacity`](Self::capacity).
    pub async fn write_frame(&mut self, frame: &Frame<'_>) -> Result<(), WriteError<T::Error>> {
        let encoded = self.encoder.encode(frame)?;

        let mut chunk = [0; CHUNK];
        let mut filled = 0;

        for byte in encoded {
            chunk[filled] = byte;
            filled += 1;

            if filled == CHUNK {
                self.send(&chunk).await?;

                filled = 0;
            }
        }

        self.send(&chunk[..filled]).await?;

        self.transport.flush().await.map_err(|err| {
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
    pub async fn write(&mut self, flags: u16, payload: &[u8]) -> Result<(), WriteError<T::Error>> {
        self.write_frame(&Frame::new(flags, payload)).await
    }

    /// Converts the [`FramedLink`] into a sink of frames.
    pub fn sink<'this, 'a>(
        &'this mut self,
    ) -> impl Sink<Frame<'a>, Error = WriteError<T::Error>> + 'this
    where
        'a: 'this,
    {
        futures::sink::unfold(self, |this, frame: Frame<'a>| async move {
            this.write_frame(&frame).await?;

            Ok::<_, WriteError<T::Error>>(this)
        })
    }

    async fn receive_byte(&mut self) -> Result<u8, ReadError<T::Error>> {
        match self.transport.read_byte().await {
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

    async fn send(&mut self, bytes: &[u8]) -> Result<(), WriteError<T::Error>> {
        if bytes.is_empty() {
            return Ok(());
        }

        trace!(target: LINK, "Writing. bytes: {}", bytes.len());

        self.transport.write_bytes(bytes).await.map_err(|err| {
            error!(target: LINK, "Failed to write");

            WriteError::IO(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use core::pin::pin;
    use std::vec::Vec;

    use embedded_io_adapters::tokio_1::FromTokio;
    use futures::{SinkExt, StreamExt};

    use crate::{
        encode::EncodeError,
        frame::OwnedFrame,
        mock::MockTransport,
        tests::{REFERENCE_FLAGS, REFERENCE_PAYLOAD, REFERENCE_WIRE, init_tracing},
    };

    use super::*;

    const FRAMES: &[(u16, &[u8])] = &[
        (1, b"hello"),
        (0xAAAA, &[0xAA, 0x1B, 0xAA]),
        (7, b""),
        (0x1B1B, &[0x55; 40]),
        (0x1234, &[0x55, 0xAA, 0x55, 0xAA]),
    ];

    fn owned(frame: Frame<'_>) -> OwnedFrame<64> {
        OwnedFrame::try_from(frame).expect("Must fit")
    }

    #[tokio::test]
    async fn round_trips_over_duplex() {
        init_tracing();

        let (read, write) = tokio::io::duplex(32);

        let writer = tokio::spawn(async move {
            let buffer = &mut [0_u8; 64];
            let mut link = FramedLink::new(FromTokio::new(write), buffer);

            for (flags, payload) in FRAMES {
                link.write(*flags, payload).await.expect("Must write");
            }
        });

        let buffer = &mut [0_u8; 64];
        let mut link = FramedLink::new(FromTokio::new(read), buffer);

        for (flags, payload) in FRAMES {
            let frame = link.next_frame().await.expect("Must decode");

            assert_eq!(frame.flags(), *flags);
            assert_eq!(frame.payload(), *payload);
        }

        writer.await.expect("Must join");

        assert!(matches!(link.next_frame().await, Err(ReadError::Eof)));
    }

    #[tokio::test]
    async fn sink_to_stream() {
        init_tracing();

        let (read, write) = tokio::io::duplex(32);

        let writer = tokio::spawn(async move {
            let buffer = &mut [0_u8; 64];
            let mut link = FramedLink::new(FromTokio::new(write), buffer);

            let sink = link.sink();
            let mut sink = pin!(sink);

            for (flags, payload) in FRAMES {
                sink.send(Frame::new(*flags, payload))
                    .await
                    .expect("Must send");
            }
        });

        let buffer = &mut [0_u8; 64];
        let mut link = FramedLink::new(FromTokio::new(read), buffer);

        let stream = link.stream(owned);
        let mut stream = pin!(stream);

        let mut collected = Vec::new();

        while let Some(frame) = stream.next().await {
            collected.push(frame.expect("Must decode"));
        }

        writer.await.expect("Must join");

        assert_eq!(collected.len(), FRAMES.len());

        for (frame, (flags, payload)) in collected.iter().zip(FRAMES) {
            assert_eq!(frame.flags(), *flags);
            assert_eq!(frame.payload(), *payload);
        }
    }

    #[tokio::test]
    async fn writes_reference_frame() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut link = FramedLink::new(MockTransport::<64>::new(), buffer);

        link.write(REFERENCE_FLAGS, REFERENCE_PAYLOAD)
            .await
            .expect("Must write");

        assert_eq!(link.transport().written(), REFERENCE_WIRE);
    }

    #[tokio::test]
    async fn oversized_write_leaves_transport_untouched() {
        init_tracing();

        let buffer = &mut [0; 16];
        let mut link = FramedLink::new(MockTransport::<64>::new(), buffer);

        let err = link
            .write(0, &[0; 17])
            .await
            .expect_err("Must not write");

        assert!(matches!(
            err,
            WriteError::Encode(EncodeError::PayloadTooLarge)
        ));
        assert!(link.transport().written().is_empty());
    }

    #[tokio::test]
    async fn read_copies_payload_or_drops_frame() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut link = FramedLink::new(MockTransport::<64>::new(), buffer);

        link.transport_mut()
            .feed(REFERENCE_WIRE)
            .expect("Must feed");
        link.transport_mut()
            .feed(REFERENCE_WIRE)
            .expect("Must feed");

        let dst = &mut [0; 3];

        let length = loop {
            if let Some(length) = link.read(dst).await.expect("Must read") {
                break length;
            }
        };

        assert_eq!(&dst[..length], REFERENCE_PAYLOAD);

        let dst = &mut [0; 2];

        let err = loop {
            match link.read(dst).await {
                Ok(None) => continue,
                Ok(Some(_)) => panic!("Must not fit"),
                Err(err) => break err,
            }
        };

        assert!(matches!(err, ReadError::BufferTooSmall));
        assert!(matches!(link.read_frame().await, Err(ReadError::Eof)));
    }

    #[tokio::test]
    async fn stream_ends_at_eof() {
        init_tracing();

        let buffer = &mut [0; 64];
        let mut link = FramedLink::new(MockTransport::<64>::new(), buffer);

        link.transport_mut()
            .feed(&[0x00, 0x55, 0xAA])
            .expect("Must feed");

        let stream = link.stream(owned);
        let mut stream = pin!(stream);

        assert!(stream.next().await.is_none());
    }
}
