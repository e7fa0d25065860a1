use crate::encode::EncodeError;

/// An error that can occur while reading a frame.
///
/// Corrupted frames are not errors. The decoder drops them and keeps reading.
#[non_exhaustive]
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError<I> {
    /// An IO error occurred while reading from the underlying transport.
    IO(I),
    /// The transport reached end of stream.
    Eof,
    /// The destination buffer is too small for the received payload. The frame is lost.
    BufferTooSmall,
}

impl<I> core::fmt::Display for ReadError<I>
where
    I: core::fmt::Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IO(err) => write!(f, "IO error: {err}"),
            Self::Eof => write!(f, "End of stream"),
            Self::BufferTooSmall => write!(f, "Buffer too small"),
        }
    }
}

impl<I> core::error::Error for ReadError<I> where I: core::fmt::Display + core::fmt::Debug {}

/// An error that can occur while writing a frame.
#[non_exhaustive]
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError<I> {
    /// An IO error occurred while writing to the underlying transport.
    IO(I),
    /// The frame could not be encoded. Nothing was written.
    Encode(EncodeError),
}

impl<I> core::fmt::Display for WriteError<I>
where
    I: core::fmt::Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IO(err) => write!(f, "IO error: {err}"),
            Self::Encode(err) => write!(f, "Encode error: {err}"),
        }
    }
}

impl<I> core::error::Error for WriteError<I> where I: core::fmt::Display + core::fmt::Debug {}

impl<I> From<EncodeError> for WriteError<I> {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}
