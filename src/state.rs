//! Internal state of the decoding state machine.

/// What the decoder is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Scanning raw bytes for the preamble.
    SeekingPreamble,
    /// Collecting the five unescaped header bytes.
    ReadingHeader,
    /// Collecting payload and CRC after an accepted header.
    ReadingBody,
}

/// Internal state for reading frames.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct ReadState<'buf> {
    /// Index of the next free byte in the buffer.
    pub index: usize,
    /// The last stored byte is an escape marker that the next byte overwrites.
    pub unescaping: bool,
    /// The current phase.
    pub phase: Phase,
    /// The scratch buffer. Holds unescaped bytes outside of [`Phase::SeekingPreamble`].
    pub buffer: &'buf mut [u8],
}

impl<'buf> ReadState<'buf> {
    /// Creates a new [`ReadState`].
    #[inline]
    pub const fn new(buffer: &'buf mut [u8]) -> Self {
        Self {
            index: 0,
            unescaping: false,
            phase: Phase::SeekingPreamble,
            buffer,
        }
    }

    /// Starts a new sub-message in `phase` at the beginning of the buffer.
    #[inline]
    pub const fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.index = 0;
        self.unescaping = false;
    }

    /// Drops everything and goes back to searching for the preamble.
    #[inline]
    pub const fn reset(&mut self) {
        self.enter(Phase::SeekingPreamble);
    }

    /// Appends `byte`. Returns `false` and leaves the buffer untouched if it is full.
    #[inline]
    pub fn push(&mut self, byte: u8) -> bool {
        match self.buffer.get_mut(self.index) {
            Some(slot) => {
                *slot = byte;
                self.index += 1;

                true
            }
            None => false,
        }
    }

    /// Returns the buffered bytes.
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.buffer[..self.index]
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.buffer.len()
    }
}
