//! Byte Stream Buffer
//!
//! Accumulates raw bytes from the child process until the parser has
//! turned them into tokens. Consumed bytes are not removed one at a time;
//! the consumed prefix is dropped in bulk once it grows past a threshold.

/// Default size of the consumed prefix that triggers compaction
pub const DEFAULT_COMPACT_THRESHOLD: usize = 4096;

/// Growable byte buffer with a consumption cursor
#[derive(Debug, Clone)]
pub struct ByteStreamBuffer {
    /// Buffered bytes; `data[..consumed]` has already been parsed
    data: Vec<u8>,
    /// Number of leading bytes that have been fully parsed
    consumed: usize,
    /// Consumed prefix size after which the buffer compacts
    compact_threshold: usize,
    /// Bytes ever appended
    total_appended: u64,
    /// Bytes ever consumed
    total_consumed: u64,
}

impl Default for ByteStreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStreamBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::with_compact_threshold(DEFAULT_COMPACT_THRESHOLD)
    }

    /// Create an empty buffer with a custom compaction threshold
    pub fn with_compact_threshold(compact_threshold: usize) -> Self {
        Self {
            data: Vec::with_capacity(compact_threshold.min(64 * 1024)),
            consumed: 0,
            compact_threshold,
            total_appended: 0,
            total_consumed: 0,
        }
    }

    /// Append bytes read from the child
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.total_appended += bytes.len() as u64;
    }

    /// Bytes that have not been parsed yet
    pub fn unconsumed(&self) -> &[u8] {
        &self.data[self.consumed..]
    }

    /// Number of unparsed bytes
    pub fn len(&self) -> usize {
        self.data.len() - self.consumed
    }

    /// True if there is nothing left to parse
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of the first unparsed byte within the backing storage
    pub fn consumed_offset(&self) -> usize {
        self.consumed
    }

    /// Bytes ever appended
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Bytes ever consumed
    pub fn total_consumed(&self) -> u64 {
        self.total_consumed
    }

    /// Mark the next `n` unparsed bytes as processed
    pub fn consumed(&mut self, n: usize) {
        let n = n.min(self.len());
        self.consumed += n;
        self.total_consumed += n as u64;

        if self.consumed == self.data.len() {
            // Everything parsed: rewinding is free
            self.data.clear();
            self.consumed = 0;
        } else if self.consumed >= self.compact_threshold && self.consumed * 2 >= self.data.len()
        {
            self.compact();
        }
    }

    /// Drop everything, including unparsed bytes
    pub fn reset(&mut self) {
        self.data.clear();
        self.consumed = 0;
    }

    fn compact(&mut self) {
        tracing::trace!(
            dropped = self.consumed,
            kept = self.data.len() - self.consumed,
            "compacting byte stream buffer"
        );
        self.data.drain(..self.consumed);
        self.consumed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_consume() {
        let mut buf = ByteStreamBuffer::new();
        buf.append(b"hello");
        buf.append(b" world");
        assert_eq!(buf.unconsumed(), b"hello world");

        buf.consumed(6);
        assert_eq!(buf.unconsumed(), b"world");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.total_consumed(), 6);
    }

    #[test]
    fn test_consume_all_rewinds() {
        let mut buf = ByteStreamBuffer::new();
        buf.append(b"abc");
        buf.consumed(3);
        assert!(buf.is_empty());
        assert_eq!(buf.consumed_offset(), 0);
    }

    #[test]
    fn test_consume_clamps() {
        let mut buf = ByteStreamBuffer::new();
        buf.append(b"abc");
        buf.consumed(10);
        assert!(buf.is_empty());
        assert_eq!(buf.total_consumed(), 3);
    }

    #[test]
    fn test_compaction_keeps_tail() {
        let mut buf = ByteStreamBuffer::with_compact_threshold(4);
        buf.append(b"0123456789");
        buf.consumed(6);
        // 6 >= 4 and 6*2 >= 10, so the prefix is gone
        assert_eq!(buf.consumed_offset(), 0);
        assert_eq!(buf.unconsumed(), b"6789");
    }

    #[test]
    fn test_no_compaction_below_threshold() {
        let mut buf = ByteStreamBuffer::with_compact_threshold(100);
        buf.append(b"0123456789");
        buf.consumed(6);
        assert_eq!(buf.consumed_offset(), 6);
        assert_eq!(buf.unconsumed(), b"6789");
    }

    #[test]
    fn test_reset() {
        let mut buf = ByteStreamBuffer::new();
        buf.append(b"\x1b]2;unterminated");
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.total_appended(), 17);
    }
}
