//! A growable byte buffer with an explicit read/write cursor.
//!
//! Used both as the `FrameParser`'s working buffer while it accumulates
//! network chunks, and as the payload holder for a completed frame handed
//! to a [`FramePool`](super::pool::FramePool). Built on [`bytes::BytesMut`]
//! rather than a hand-rolled array — `BytesMut` already grows the way this
//! needs to, in the codec style this corpus uses everywhere else.

use bytes::{Buf, BufMut, BytesMut};

/// Bytes are appended at the current position (which always sits at the
/// end of whatever has been written so far); once filled, a buffer is read
/// back sequentially from position 0 by a consumer such as
/// [`FrameParser`](super::parser::FrameParser) or an application reading a
/// dequeued frame's header.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    data: BytesMut,
    pos: usize,
}

impl FrameBuffer {
    /// Default initial capacity (`INITIAL_FRAME_BUFFER` in the original).
    pub const DEFAULT_CAPACITY: usize = 32 * 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { data: BytesMut::with_capacity(cap), pos: 0 }
    }

    pub fn from_bytes(bytes: impl Into<BytesMut>) -> Self {
        let data = bytes.into();
        let len = data.len();
        Self { data, pos: len }
    }

    /// Logical length of whatever has been written so far.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Appends `src`, growing capacity in 1 KiB multiples if needed.
    pub fn write(&mut self, src: &[u8]) {
        let needed = self.data.len() + src.len();
        if needed > self.data.capacity() {
            let shortfall = needed - self.data.capacity();
            let rounded = shortfall.div_ceil(1024) * 1024;
            self.data.reserve(rounded);
        }
        self.data.put_slice(src);
        self.pos = self.data.len();
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Reads one byte at the cursor. `None` if the cursor is at the end.
    pub fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    /// Reads a little-endian `u16` at the cursor, advancing it by 2.
    pub fn read_u16_le(&mut self) -> Option<u16> {
        if self.remaining() < 2 {
            return None;
        }
        let v = (&self.data[self.pos..self.pos + 2]).get_u16_le();
        self.pos += 2;
        Some(v)
    }

    /// Reads a little-endian `u32` at the cursor, advancing it by 4.
    pub fn read_u32_le(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = (&self.data[self.pos..self.pos + 4]).get_u32_le();
        self.pos += 4;
        Some(v)
    }

    /// Copies `min(dst.len(), remaining)` bytes into `dst`, advancing the
    /// cursor by that amount; returns the number of bytes copied.
    pub fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.remaining());
        dst[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// Resets size and cursor to zero; retains allocated capacity.
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut buf = FrameBuffer::new();
        buf.write(&[0xAA, 0xAA, 0x04, 0x00, 0x00, 0x00]);
        assert_eq!(buf.size(), 6);

        buf.pos = 0;
        assert_eq!(buf.read_u16_le(), Some(0xAAAA));
        assert_eq!(buf.read_u32_le(), Some(4));
        assert_eq!(buf.read_u8(), None);
    }

    #[test]
    fn read_into_copies_and_advances() {
        let mut buf = FrameBuffer::new();
        buf.write(b"hello world");
        buf.pos = 0;

        let mut dst = [0u8; 5];
        let n = buf.read_into(&mut dst);
        assert_eq!(n, 5);
        assert_eq!(&dst, b"hello");

        let mut rest = [0u8; 20];
        let n2 = buf.read_into(&mut rest);
        assert_eq!(n2, 6);
        assert_eq!(&rest[..6], b" world");
    }

    #[test]
    fn clear_resets_size_and_cursor() {
        let mut buf = FrameBuffer::new();
        buf.write(b"data");
        buf.clear();
        assert_eq!(buf.size(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn growth_rounds_up_to_1kib_multiples() {
        let mut buf = FrameBuffer::with_capacity(0);
        buf.write(&[0u8; 1]);
        assert_eq!(buf.capacity(), 1024);
        buf.write(&[0u8; 2000]);
        assert!(buf.capacity() >= 2001);
        assert_eq!(buf.capacity() % 1024, 0);
    }
}
