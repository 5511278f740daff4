//! Bounded line buffer.
//!
//! All trace rendering goes through a [`LineBuf`] with an explicit byte
//! capacity. Output past the capacity is dropped at a character boundary so
//! an oversized filename or command line can only shorten a line, never grow
//! it without bound.

use std::fmt;

/// Capacity for ordinary trace lines.
pub const LINE_CAPACITY: usize = 512;

/// Capacity for the file-read hex data line (512 bytes at 3 chars each,
/// plus the prefix).
pub const DATA_LINE_CAPACITY: usize = 512 * 3 + 64;

/// A reusable, capacity-bounded text buffer implementing [`fmt::Write`].
#[derive(Debug, Clone)]
pub struct LineBuf {
    text: String,
    capacity: usize,
    truncated: bool,
}

impl LineBuf {
    /// Create a buffer with the given capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
            truncated: false,
        }
    }

    /// Clear the buffer and set a new capacity.
    pub fn reset(&mut self, capacity: usize) {
        self.text.clear();
        self.capacity = capacity;
        self.truncated = false;
    }

    /// The rendered text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether any output was dropped.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.text.len())
    }
}

impl Default for LineBuf {
    fn default() -> Self {
        Self::with_capacity(LINE_CAPACITY)
    }
}

impl fmt::Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }
        let room = self.remaining();
        if s.len() <= room {
            self.text.push_str(s);
            return Ok(());
        }
        let mut cut = room;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.truncated = true;
        // Later arguments are dropped, not reported as errors.
        Ok(())
    }
}

impl AsRef<str> for LineBuf {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
