//! Fixed-capacity capture of raw input bytes.
//!
//! The [`RecordBuffer`] is what a state machine writes into while recording
//! is switched on. It never grows: once `RECORD_BUFFER_SIZE - 1` bytes are
//! stored, further bytes are dropped. The last slot is reserved for a NUL
//! terminator, which is kept in place after every write so the contents can
//! be handed to consumers that expect C-style strings.

/// Capacity of a [`RecordBuffer`], terminator included.
pub const RECORD_BUFFER_SIZE: usize = 256;

/// Bounded, always NUL-terminated byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct RecordBuffer {
    bytes: [u8; RECORD_BUFFER_SIZE],
    len: usize,
}

impl RecordBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; RECORD_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Discards the contents.
    pub fn clear(&mut self) {
        self.len = 0;
        self.bytes[0] = 0;
    }

    /// Appends a byte if there is room for it and the terminator.
    ///
    /// Returns `false` when the byte was dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len + 1 >= RECORD_BUFFER_SIZE {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        self.bytes[self.len] = 0;
        true
    }

    /// The recorded bytes, without the terminator.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The recorded bytes followed by the NUL terminator.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes[..=self.len]
    }

    /// Number of recorded bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the next [`push`](Self::push) would be dropped.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len + 1 >= RECORD_BUFFER_SIZE
    }
}

impl Default for RecordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RecordBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("RecordBuffer")
            .field(&bstr::BStr::new(self.as_bytes()))
            .finish()
    }
}
