// src/buffer/core.rs
//! Core buffer structure and capacity management
//!
//! This module provides the fundamental [`Buffer`] type: a zero-filled
//! arena with a consumable front window, securely erased whenever an
//! allocation is retired.

use crate::error::{BufferError, Result};
use std::fmt;
use zeroize::Zeroize;

/// Maximum buffer size (1GB)
pub const BUF_MAX_SIZE: usize = 1_000_000_000;
/// Capacity reserved by [`Buffer::default`]
pub const BUF_DEFAULT_SIZE: usize = 512;

/// A growable byte buffer with a consumable front.
///
/// Valid content lives in the window `[offset, offset + len)` of the backing
/// allocation. Bytes before the window have been consumed and are garbage;
/// bytes after it are spare capacity. The backing allocation is always fully
/// initialized (zero-filled), and it is wiped with [`zeroize`] every time it
/// is replaced by a larger one and when the buffer is dropped.
///
/// # Memory Safety
///
/// Growing never leaves a copy of the old content behind: the retired
/// allocation is zeroed before it is freed.
///
/// # Examples
///
/// ```
/// use secnet::Buffer;
/// # use secnet::BufferError;
///
/// let mut buf = Buffer::new(16);
/// buf.append(b"hello world")?;
/// buf.consume(6);
/// assert_eq!(buf.as_slice(), b"world");
/// # Ok::<(), BufferError>(())
/// ```
pub struct Buffer {
    /// Backing storage, `data.len()` is the capacity
    pub(crate) data: Vec<u8>,
    /// Bytes consumed from the front
    pub(crate) offset: usize,
    /// Length of the valid window
    pub(crate) used: usize,
}

impl Buffer {
    /// Creates an empty buffer with `reserved` bytes of zeroed capacity.
    ///
    /// Requests above [`BUF_MAX_SIZE`] are clamped to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    ///
    /// let buf = Buffer::new(8192);
    /// assert_eq!(buf.capacity(), 8192);
    /// assert_eq!(buf.len(), 0);
    /// ```
    #[inline]
    pub fn new(reserved: usize) -> Self {
        Self {
            data: vec![0; reserved.min(BUF_MAX_SIZE)],
            offset: 0,
            used: 0,
        }
    }

    /// Creates a buffer holding a copy of `bytes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    ///
    /// let buf = Buffer::from_slice(b"abc");
    /// assert_eq!(buf.as_slice(), b"abc");
    /// assert!(buf.capacity() >= 512);
    /// ```
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buf = Self::new(bytes.len().max(BUF_DEFAULT_SIZE));
        buf.data[..bytes.len()].copy_from_slice(bytes);
        buf.used = bytes.len();
        buf
    }

    /// Returns the size of the backing allocation.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of valid bytes in the window.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    /// # use secnet::BufferError;
    ///
    /// let mut buf = Buffer::default();
    /// assert_eq!(buf.len(), 0);
    ///
    /// buf.append(b"1234")?;
    /// assert_eq!(buf.len(), 4);
    /// # Ok::<(), BufferError>(())
    /// ```
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.used
    }

    /// Returns `true` if the window holds no bytes.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Returns how many bytes have been consumed from the front.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns how many bytes the window can hold without reallocating.
    #[inline(always)]
    pub fn window_capacity(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Returns the valid window.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.used]
    }

    /// Returns the valid window mutably.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    ///
    /// let mut buf = Buffer::from_slice(b"hello");
    /// buf.as_mut_slice()[0] = b'H';
    /// assert_eq!(buf.as_slice(), b"Hello");
    /// ```
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[self.offset..self.offset + self.used]
    }

    /// Ensures the window can hold at least `new_capacity` bytes, or
    /// `len() + new_capacity` bytes when `by` is set.
    ///
    /// Returns the resulting window capacity. Nothing moves when the window
    /// already fits. Otherwise the content is copied to the front of a fresh
    /// allocation at least twice the previous capacity, and the old one is
    /// zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::SizeTooBig`] if the target exceeds [`BUF_MAX_SIZE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    /// # use secnet::BufferError;
    ///
    /// let mut buf = Buffer::new(100);
    /// buf.append(b"data")?;
    ///
    /// assert_eq!(buf.increase(50, false)?, 100);
    /// assert!(buf.increase(500, true)? >= 504);
    /// assert_eq!(buf.as_slice(), b"data");
    /// # Ok::<(), BufferError>(())
    /// ```
    pub fn increase(&mut self, new_capacity: usize, by: bool) -> Result<usize> {
        let target = if by {
            self.used.checked_add(new_capacity)
        } else {
            Some(new_capacity)
        };
        let target = match target {
            Some(t) if t <= BUF_MAX_SIZE => t,
            _ => {
                return Err(BufferError::SizeTooBig {
                    requested: new_capacity,
                    max: BUF_MAX_SIZE,
                });
            }
        };

        if target <= self.window_capacity() {
            return Ok(self.window_capacity());
        }

        let grown = target.max(self.capacity().saturating_mul(2)).min(BUF_MAX_SIZE);
        let mut fresh = vec![0u8; grown];
        fresh[..self.used].copy_from_slice(self.as_slice());

        let old = std::mem::replace(&mut self.data, fresh);
        retire(old);
        self.offset = 0;

        Ok(grown)
    }

    /// Like [`increase`](Self::increase), then fills every byte past the
    /// window with `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    /// # use secnet::BufferError;
    ///
    /// let mut buf = Buffer::new(4);
    /// buf.increase_filled(8, 0xAA, false)?;
    /// buf.mark_used(8);
    /// assert_eq!(buf.as_slice(), &[0xAA; 8]);
    /// # Ok::<(), BufferError>(())
    /// ```
    pub fn increase_filled(&mut self, new_capacity: usize, value: u8, by: bool) -> Result<usize> {
        let capacity = self.increase(new_capacity, by)?;
        let end = self.offset + self.used;
        self.data[end..].fill(value);
        Ok(capacity)
    }

    /// Forgets the window without touching memory. Capacity is retained.
    ///
    /// Use [`burn`](Self::burn) for secure erasure.
    #[inline]
    pub fn clear(&mut self) {
        self.offset = 0;
        self.used = 0;
    }

    /// Securely zeros the whole allocation and clears the window.
    ///
    /// # Examples
    ///
    /// ```
    /// use secnet::Buffer;
    ///
    /// let mut buf = Buffer::from_slice(b"sensitive data");
    /// buf.burn();
    /// assert!(buf.is_empty());
    /// ```
    pub fn burn(&mut self) {
        // Slice zeroize keeps data.len() == capacity; Vec::zeroize would clear it.
        self.data.as_mut_slice().zeroize();
        self.clear();
    }
}

/// Zeroes a retired allocation before it is freed.
pub(crate) fn retire(mut data: Vec<u8>) {
    data.as_mut_slice().zeroize();
    #[cfg(test)]
    erasure::record(&data);
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(BUF_DEFAULT_SIZE)
    }
}

/// Copies only the window; the clone starts at offset zero with the same
/// capacity.
impl Clone for Buffer {
    fn clone(&self) -> Self {
        let mut data = vec![0u8; self.capacity()];
        data[..self.used].copy_from_slice(self.as_slice());
        Self {
            data,
            offset: 0,
            used: self.used,
        }
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Buffer {}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.used)
            .field("offset", &self.offset)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        retire(std::mem::take(&mut self.data));
    }
}
