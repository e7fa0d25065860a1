//! Byte transports.
//!
//! A link only needs four operations from the byte stream underneath it. [`Transport`]
//! provides them for blocking [`embedded_io`] readers and writers, [`AsyncTransport`] for
//! [`embedded_io_async`] ones. Both are implemented for every type implementing `Read` and
//! `Write` of the respective crate, so serial drivers, sockets (through
//! [`embedded_io_adapters`](https://docs.rs/embedded-io-adapters)) and test doubles plug in
//! directly.

use embedded_io::ErrorType;

/// Blocking byte transport.
pub trait Transport: ErrorType {
    /// Reads a single byte, blocking until one is available.
    ///
    /// Returns [`None`] at end of stream.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Writes a single byte.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Writes all of `bytes`.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Flushes buffered bytes to the wire.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

impl<T> Transport for T
where
    T: embedded_io::Read + embedded_io::Write,
{
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        let mut byte = [0; 1];

        match embedded_io::Read::read(self, &mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        embedded_io::Write::write_all(self, &[byte])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        embedded_io::Write::write_all(self, bytes)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        embedded_io::Write::flush(self)
    }
}

/// Async byte transport. See [`Transport`].
#[allow(async_fn_in_trait)]
pub trait AsyncTransport: ErrorType {
    /// Reads a single byte, waiting until one is available.
    ///
    /// Returns [`None`] at end of stream.
    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Writes a single byte.
    async fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Writes all of `bytes`.
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Flushes buffered bytes to the wire.
    async fn flush(&mut self) -> Result<(), Self::Error>;
}

impl<T> AsyncTransport for T
where
    T: embedded_io_async::Read + embedded_io_async::Write,
{
    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        let mut byte = [0; 1];

        match embedded_io_async::Read::read(self, &mut byte).await? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    async fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        embedded_io_async::Write::write_all(self, &[byte]).await
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        embedded_io_async::Write::write_all(self, bytes).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        embedded_io_async::Write::flush(self).await
    }
}
