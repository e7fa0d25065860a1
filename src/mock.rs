//! In-memory transport for testing purposes.

use heapless::{Deque, Vec};

/// Error returned by [`MockTransport`] when a queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MockError;

impl core::fmt::Display for MockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Mock transport full")
    }
}

impl core::error::Error for MockError {}

impl embedded_io::Error for MockError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::OutOfMemory
    }
}

/// A transport reading from a queue of incoming bytes and recording written bytes.
///
/// Reading from an empty queue reports end of stream.
#[derive(Debug, Default)]
pub struct MockTransport<const N: usize> {
    incoming: Deque<u8, N>,
    written: Vec<u8, N>,
}

impl<const N: usize> MockTransport<N> {
    pub const fn new() -> Self {
        Self {
            incoming: Deque::new(),
            written: Vec::new(),
        }
    }

    /// Queues `bytes` for reading.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), MockError> {
        for &byte in bytes {
            self.incoming.push_back(byte).map_err(|_| MockError)?;
        }

        Ok(())
    }

    /// Number of bytes left to read.
    pub fn pending(&self) -> usize {
        self.incoming.len()
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn clear_written(&mut self) {
        self.written.clear();
    }

    /// Moves the written bytes to the incoming queue.
    pub fn loop_back(&mut self) -> Result<(), MockError> {
        for &byte in self.written.iter() {
            self.incoming.push_back(byte).map_err(|_| MockError)?;
        }

        self.written.clear();

        Ok(())
    }

    fn pop_into(&mut self, buf: &mut [u8]) -> usize {
        let mut read = 0;

        for slot in buf.iter_mut() {
            match self.incoming.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    read += 1;
                }
                None => break,
            }
        }

        read
    }

    fn push_from(&mut self, buf: &[u8]) -> Result<usize, MockError> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut written = 0;

        for &byte in buf {
            if self.written.push(byte).is_err() {
                break;
            }

            written += 1;
        }

        match written {
            0 => Err(MockError),
            _ => Ok(written),
        }
    }
}

impl<const N: usize> embedded_io::ErrorType for MockTransport<N> {
    type Error = MockError;
}

impl<const N: usize> embedded_io::Read for MockTransport<N> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.pop_into(buf))
    }
}

impl<const N: usize> embedded_io::ReadReady for MockTransport<N> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.incoming.is_empty())
    }
}

impl<const N: usize> embedded_io::Write for MockTransport<N> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.push_from(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<const N: usize> embedded_io_async::Read for MockTransport<N> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.pop_into(buf))
    }
}

impl<const N: usize> embedded_io_async::Write for MockTransport<N> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.push_from(buf)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
