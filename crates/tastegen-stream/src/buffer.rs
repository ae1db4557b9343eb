//! Append-only accumulation of stream chunks

use std::ops::Range;

/// Full accumulated text of one generation session
///
/// # Invariants
/// - `text` is the concatenation, in arrival order, of every chunk appended
/// - Only grows; released as a whole when the session ends
#[derive(Debug, Default, Clone)]
pub struct StreamBuffer {
    text: String,
    chunks: usize,
}

impl StreamBuffer {
    /// Create empty buffer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk, returning the byte range it occupies
    pub fn append(&mut self, chunk: &str) -> Range<usize> {
        let start = self.text.len();
        self.text.push_str(chunk);
        self.chunks += 1;
        start..self.text.len()
    }

    /// Accumulated text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Text from `offset` to the end (empty if out of range)
    #[inline]
    #[must_use]
    pub fn tail_from(&self, offset: usize) -> &str {
        self.text.get(offset..).unwrap_or("")
    }

    /// Accumulated length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// No text received yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of chunks appended, including empty ones
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Release the buffer
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_tracks_ranges_and_order() {
        let mut buffer = StreamBuffer::new();
        assert_eq!(buffer.append("ab"), 0..2);
        assert_eq!(buffer.append(""), 2..2);
        assert_eq!(buffer.append("cde"), 2..5);
        assert_eq!(buffer.as_str(), "abcde");
        assert_eq!(buffer.chunk_count(), 3);
    }

    #[test]
    fn tail_from_out_of_range_is_empty() {
        let mut buffer = StreamBuffer::new();
        buffer.append("xyz");
        assert_eq!(buffer.tail_from(1), "yz");
        assert_eq!(buffer.tail_from(3), "");
        assert_eq!(buffer.tail_from(10), "");
    }
}
