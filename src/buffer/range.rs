// src/buffer/range.rs
//! Non-owning views into a [`Buffer`].

use super::core::Buffer;
use std::ops::AddAssign;

/// A borrowed `(buffer, offset, len)` view into a buffer's window.
///
/// A range never owns memory. Advancing it with `+=` narrows it from the
/// front, which is how a decoder walks through its input.
///
/// # Examples
///
/// ```
/// use secnet::Buffer;
///
/// let buf = Buffer::from_slice(b"abcdef");
/// let mut view = buf.range(1, 4);
/// assert_eq!(view.as_slice(), b"bcde");
///
/// view += 2;
/// assert_eq!(view.as_slice(), b"de");
/// view += 10;
/// assert!(view.is_empty());
/// ```
#[derive(Clone, Copy)]
pub struct BufferRange<'a> {
    buffer: &'a Buffer,
    offset: usize,
    len: usize,
}

impl<'a> BufferRange<'a> {
    /// Creates a view, clamped to the buffer's window.
    pub fn new(buffer: &'a Buffer, offset: usize, len: usize) -> Self {
        let offset = offset.min(buffer.len());
        let len = len.min(buffer.len() - offset);
        Self {
            buffer,
            offset,
            len,
        }
    }

    /// A view over the whole window.
    pub fn full(buffer: &'a Buffer) -> Self {
        Self::new(buffer, 0, buffer.len())
    }

    /// Number of bytes in view.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing is in view.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start of the view, relative to the buffer's window.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The buffer this view borrows from.
    pub fn buffer(&self) -> &'a Buffer {
        self.buffer
    }

    /// The bytes in view.
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        &self.buffer.as_slice()[self.offset..self.offset + self.len]
    }

    /// Drops up to `n` bytes from the front of the view.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.offset += n;
        self.len -= n;
    }
}

impl AddAssign<usize> for BufferRange<'_> {
    fn add_assign(&mut self, n: usize) {
        self.advance(n);
    }
}

impl<'a> From<&'a Buffer> for BufferRange<'a> {
    fn from(buffer: &'a Buffer) -> Self {
        Self::full(buffer)
    }
}

impl AsRef<[u8]> for BufferRange<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for BufferRange<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferRange")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
