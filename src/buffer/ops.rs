// src/buffer/ops.rs
//! Buffer write, consume and window operations

use super::core::{BUF_MAX_SIZE, Buffer};
use super::range::BufferRange;
use crate::error::{BufferError, Result};
use zeroize::Zeroize;

impl Buffer {
    /// Appends `bytes` after the window and returns a view of them.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    /// # use secnet::BufferError;
    ///
    /// let mut buf = Buffer::new(4);
    /// buf.append(b"abc")?;
    /// let tail = buf.append(b"defgh")?;
    /// assert_eq!(tail.as_slice(), b"defgh");
    /// assert_eq!(tail.offset(), 3);
    /// assert_eq!(buf.as_slice(), b"abcdefgh");
    /// # Ok::<(), BufferError>(())
    /// ```
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) -> Result<BufferRange<'_>> {
        let at = self.used;
        self.write_region(at, bytes.len(), Some(bytes))?;
        Ok(self.range(at, bytes.len()))
    }

    /// Reserves `len` zeroed bytes after the window and marks them used,
    /// e.g. ahead of an in-place read.
    #[inline]
    pub fn append_unfilled(&mut self, len: usize) -> Result<BufferRange<'_>> {
        let at = self.used;
        self.write_region(at, len, None)?;
        Ok(self.range(at, len))
    }

    /// Writes `bytes` at window offset `at`, growing as needed.
    ///
    /// The front of the window never moves; the window only lengthens if the
    /// write ends past it. Any gap between the old end and `at` is zeroed.
    pub fn write(&mut self, bytes: &[u8], at: usize) -> Result<()> {
        self.write_region(at, bytes.len(), Some(bytes))
    }

    /// Same as [`write`](Self::write) without copying any data.
    pub fn write_unfilled(&mut self, len: usize, at: usize) -> Result<()> {
        self.write_region(at, len, None)
    }

    fn write_region(&mut self, at: usize, len: usize, bytes: Option<&[u8]>) -> Result<()> {
        let need = at
            .checked_add(len)
            .filter(|&n| n <= BUF_MAX_SIZE)
            .ok_or(BufferError::SizeTooBig {
                requested: at.saturating_add(len),
                max: BUF_MAX_SIZE,
            })?;

        if need > self.window_capacity() {
            let headroom = self.capacity().saturating_mul(2);
            self.increase(need.saturating_add(headroom).min(BUF_MAX_SIZE), false)?;
        }

        if need > self.used {
            let end = self.offset + self.used;
            self.data[end..self.offset + need].zeroize();
            self.used = need;
        }
        if let Some(bytes) = bytes {
            let start = self.offset + at;
            self.data[start..start + len].copy_from_slice(bytes);
        }
        Ok(())
    }

    /// Drops up to `n` bytes from the front of the window and returns how
    /// many were dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    ///
    /// let mut buf = Buffer::from_slice(b"header:body");
    /// assert_eq!(buf.consume(7), 7);
    /// assert_eq!(buf.as_slice(), b"body");
    /// assert_eq!(buf.consume(100), 4);
    /// assert!(buf.is_empty());
    /// ```
    #[inline]
    pub fn consume(&mut self, n: usize) -> usize {
        let n = n.min(self.used);
        self.offset += n;
        self.used -= n;
        n
    }

    /// Un-consumes `diff` bytes. Does nothing and returns `false` when more
    /// bytes are asked for than were consumed.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    ///
    /// let mut buf = Buffer::from_slice(b"abcdef");
    /// buf.consume(4);
    /// assert!(buf.reset(2));
    /// assert_eq!(buf.as_slice(), b"cdef");
    /// assert!(!buf.reset(3));
    /// assert_eq!(buf.as_slice(), b"cdef");
    /// ```
    #[inline]
    pub fn reset(&mut self, diff: usize) -> bool {
        if diff > self.offset {
            return false;
        }
        self.offset -= diff;
        self.used += diff;
        true
    }

    /// Makes `[at, at + size)` part of the window. Bytes already in the window
    /// keep their value, every byte newly brought in is set to `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    /// # use secnet::BufferError;
    ///
    /// let mut buf = Buffer::from_slice(b"ab");
    /// buf.pad(1, 4, b'.')?;
    /// assert_eq!(buf.as_slice(), b"ab...");
    /// # Ok::<(), BufferError>(())
    /// ```
    pub fn pad(&mut self, at: usize, size: usize, value: u8) -> Result<()> {
        let need = at.checked_add(size).ok_or(BufferError::SizeTooBig {
            requested: usize::MAX,
            max: BUF_MAX_SIZE,
        })?;
        if need <= self.used {
            return Ok(());
        }

        self.increase(need, false)?;
        let start = self.offset + self.used;
        let end = self.offset + need;
        self.data[start..end].fill(value);
        self.used = need;
        Ok(())
    }

    /// Pads the window up to `new_size` bytes with `value`.
    pub fn pad_to(&mut self, new_size: usize, value: u8) -> Result<()> {
        let at = self.used;
        self.pad(at, new_size.saturating_sub(at), value)
    }

    /// Extends the window over `n` spare bytes without copying, e.g. after
    /// reading into [`spare_capacity_mut`](Self::spare_capacity_mut).
    ///
    /// Clamped to the available capacity; returns the bytes actually added.
    #[inline]
    pub fn mark_used(&mut self, n: usize) -> usize {
        let n = n.min(self.window_capacity() - self.used);
        self.used += n;
        n
    }

    /// Shrinks the window by up to `n` bytes from the back.
    #[inline]
    pub fn mark_unused(&mut self, n: usize) -> usize {
        let n = n.min(self.used);
        self.used -= n;
        n
    }

    /// Returns the window from byte `from` onward (empty past the end).
    #[inline]
    pub fn data(&self, from: usize) -> &[u8] {
        &self.as_slice()[from.min(self.used)..]
    }

    /// Mutable variant of [`data`](Self::data).
    #[inline]
    pub fn data_mut(&mut self, from: usize) -> &mut [u8] {
        let from = from.min(self.used);
        &mut self.as_mut_slice()[from..]
    }

    /// Returns the spare bytes after the window.
    #[inline]
    pub fn spare_capacity_mut(&mut self) -> &mut [u8] {
        let end = self.offset + self.used;
        &mut self.data[end..]
    }

    /// Returns a view of `len` bytes at window offset `at`, clamped to the
    /// window.
    #[inline]
    pub fn range(&self, at: usize, len: usize) -> BufferRange<'_> {
        BufferRange::new(self, at, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_grows() {
        let mut buf = Buffer::new(4);
        buf.append(b"12345678").unwrap();
        assert_eq!(buf.len(), 8);
        assert!(buf.capacity() >= 8);
        assert_eq!(buf.as_slice(), b"12345678");
    }

    #[test]
    fn test_append_unfilled_marks_used() {
        let mut buf = Buffer::new(16);
        buf.append(b"ab").unwrap();
        let r = buf.append_unfilled(3).unwrap();
        assert_eq!(r.offset(), 2);
        assert_eq!(r.len(), 3);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_write_inside_window_keeps_len() {
        let mut buf = Buffer::from_slice(b"abcdef");
        buf.write(b"XY", 1).unwrap();
        assert_eq!(buf.as_slice(), b"aXYdef");
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_unfilled_append_after_clear_is_zeroed() {
        let mut buf = Buffer::new(16);
        buf.append(b"SECRETKEY").unwrap();
        buf.clear();
        let reserved = buf.append_unfilled(9).unwrap();
        assert_eq!(reserved.as_slice(), &[0u8; 9]);
    }

    #[test]
    fn test_write_gap_is_zeroed() {
        let mut buf = Buffer::new(16);
        buf.append(b"PASSWORD").unwrap();
        buf.mark_unused(8);
        buf.write(b"!", 8).unwrap();
        assert_eq!(buf.as_slice(), b"\0\0\0\0\0\0\0\0!");

        buf.mark_unused(9);
        buf.append(b"ab").unwrap();
        buf.write_unfilled(3, 1).unwrap();
        assert_eq!(buf.as_slice(), b"ab\0\0");
    }

    #[test]
    fn test_write_past_capacity_respects_offset() {
        let mut buf = Buffer::new(8);
        buf.append(b"01234567").unwrap();
        buf.consume(4);
        buf.write(b"zz", 6).unwrap();

        assert_eq!(buf.offset(), 0);
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf.as_slice()[..4], b"4567");
        assert_eq!(&buf.as_slice()[6..], b"zz");
        assert!(buf.capacity() >= 8 + 16);
    }

    #[test]
    fn test_consume_reset_inverse() {
        let mut buf = Buffer::from_slice(b"0123456789");
        let before = buf.clone();
        buf.consume(3);
        assert!(buf.reset(3));
        assert_eq!(buf, before);
    }

    #[test]
    fn test_pad_fills_gap_past_len() {
        let mut buf = Buffer::from_slice(b"a");
        buf.pad(3, 2, 0xEE).unwrap();
        assert_eq!(buf.as_slice(), &[b'a', 0xEE, 0xEE, 0xEE, 0xEE]);

        buf.pad(0, 2, 0x00).unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.as_slice()[0], b'a');
    }

    #[test]
    fn test_pad_to() {
        let mut buf = Buffer::from_slice(b"xy");
        buf.pad_to(6, b'-').unwrap();
        assert_eq!(buf.as_slice(), b"xy----");
        buf.pad_to(3, b'!').unwrap();
        assert_eq!(buf.as_slice(), b"xy----");
    }

    #[test]
    fn test_mark_used_clamps() {
        let mut buf = Buffer::new(10);
        buf.append(b"abc").unwrap();
        buf.consume(1);
        assert_eq!(buf.mark_used(100), 7);
        assert_eq!(buf.len(), 9);
        assert_eq!(buf.mark_unused(100), 9);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_data_clamps() {
        let buf = Buffer::from_slice(b"hello");
        assert_eq!(buf.data(2), b"llo");
        assert_eq!(buf.data(99), b"");
    }

    #[test]
    fn test_spare_capacity_then_mark_used() {
        let mut buf = Buffer::new(8);
        buf.append(b"ab").unwrap();
        buf.spare_capacity_mut()[..2].copy_from_slice(b"cd");
        buf.mark_used(2);
        assert_eq!(buf.as_slice(), b"abcd");
    }

    #[test]
    fn test_range_clamped() {
        let buf = Buffer::from_slice(b"abcdef");
        assert_eq!(buf.range(4, 10).as_slice(), b"ef");
        assert!(buf.range(10, 1).is_empty());
    }
}
