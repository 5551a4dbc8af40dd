//! Circular buffer for variable-length records
//!
//! Each asynchronous subscriber owns one `RecordRing`: a fixed-capacity byte
//! arena holding length-prefixed records in FIFO order. The ring never splits
//! a record across the physical end of the arena. When the space between the
//! write cursor and the end cannot hold the next whole record, the write
//! relocates to offset 0 and leaves a skip marker behind so the reader knows
//! where to jump.
//!
//! `head == tail` always means "empty". A push that would make `head` reach
//! `tail` is rejected up front, so "exactly full" never needs a distinct
//! representation. The cost is that a record whose framed size exactly equals
//! the free region is rejected even though it would physically fit.

use std::fmt;

/// Size of the length prefix written before each record payload.
pub const HEADER: usize = std::mem::size_of::<usize>();

/// Skip marker value meaning "no wraparound boundary pending".
const SKIP_UNSET: usize = usize::MAX;

/// Error returned when a record cannot be buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// Not enough free space between the cursors right now
    Full,
    /// The framed record can never fit, even in an empty ring
    TooLarge,
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Full => write!(f, "ring buffer full"),
            PushError::TooLarge => write!(f, "record larger than ring capacity"),
        }
    }
}

impl std::error::Error for PushError {}

/// Fixed-capacity circular buffer of length-prefixed records
///
/// Records are framed as a native-endian `usize` length followed by the
/// payload. Zero-length payloads are valid (useful as signal records).
#[derive(Debug)]
pub struct RecordRing {
    /// Write cursor (offset of the next record header)
    head: usize,
    /// Read cursor (offset of the oldest record header)
    tail: usize,
    /// Offset at which the reader must jump back to 0, or `SKIP_UNSET`
    skip: usize,
    /// Number of buffered records
    records: usize,
    /// Backing byte arena
    storage: Box<[u8]>,
}

impl RecordRing {
    /// Create a ring with a backing arena of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            head: 0,
            tail: 0,
            skip: SKIP_UNSET,
            records: 0,
            storage: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Arena size in bytes
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.records
    }

    /// True if no records are buffered
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Append a record at the write cursor
    ///
    /// Fails with [`PushError::TooLarge`] if the framed record could never
    /// fit, and with [`PushError::Full`] if it does not fit right now. A
    /// rejected push leaves the cursors untouched; the record is simply
    /// dropped by the caller.
    pub fn push(&mut self, data: &[u8]) -> Result<(), PushError> {
        let framed = HEADER + data.len();
        self.check_fit(framed)?;

        // Relocate to the start if the record would run past the arena end.
        if self.head + framed > self.capacity() {
            self.skip = self.head;
            self.head = 0;
        }

        let at = self.head;
        self.storage[at..at + HEADER].copy_from_slice(&data.len().to_ne_bytes());
        self.storage[at + HEADER..at + framed].copy_from_slice(data);
        self.head = at + framed;
        self.records += 1;
        Ok(())
    }

    /// Borrow the oldest buffered payload without consuming it
    ///
    /// The returned slice stays valid until [`pop`](Self::pop); no push can
    /// overwrite the region because pushes never advance past `tail`. May
    /// move the read cursor across a pending skip boundary, never past a
    /// record.
    pub fn peek(&mut self) -> Option<&[u8]> {
        self.cross_skip_boundary();
        if self.is_empty() {
            return None;
        }
        let len = self.record_len_at(self.tail);
        Some(&self.storage[self.tail + HEADER..self.tail + HEADER + len])
    }

    /// Consume the oldest buffered record
    ///
    /// Advances the read cursor past the record [`peek`](Self::peek) last
    /// reported. No-op on an empty ring.
    pub fn pop(&mut self) {
        self.cross_skip_boundary();
        if self.is_empty() {
            return;
        }
        let len = self.record_len_at(self.tail);
        self.tail += HEADER + len;
        self.records -= 1;
    }

    /// Decide whether a framed record of `framed` bytes can be written now.
    fn check_fit(&self, framed: usize) -> Result<(), PushError> {
        if framed >= self.capacity() {
            return Err(PushError::TooLarge);
        }
        // An empty ring accepts anything that passed the capacity check; the
        // relocation in `push` handles a cursor stranded near the end.
        if self.is_empty() {
            return Ok(());
        }
        let from_start = self.head + framed > self.capacity();
        if self.head < self.tail {
            // Free region is the gap up to `tail`. Writing up to `tail`
            // exactly would make the ring look empty, so require strict room.
            if from_start || self.tail - self.head <= framed {
                return Err(PushError::Full);
            }
        } else if from_start && framed >= self.tail {
            // Relocated write would catch up with the read cursor.
            return Err(PushError::Full);
        }
        Ok(())
    }

    /// Jump the read cursor to offset 0 when it sits on the skip boundary
    /// left by a relocated write. The marker is cleared once crossed so a
    /// stale boundary can never re-trigger.
    fn cross_skip_boundary(&mut self) {
        if self.tail == self.skip {
            self.tail = 0;
            self.skip = SKIP_UNSET;
        }
    }

    fn record_len_at(&self, at: usize) -> usize {
        let mut raw = [0u8; HEADER];
        raw.copy_from_slice(&self.storage[at..at + HEADER]);
        usize::from_ne_bytes(raw)
    }
}
