// src/buffer/serialize.rs
//! Length-prefixed wire encoding.
//!
//! A value is written as a 4-byte big-endian length followed by that many raw
//! bytes. Decoding works on a [`BufferRange`] and only advances it when a
//! complete value was read, so a truncated input can be retried once more
//! bytes arrive.

use super::core::Buffer;
use super::range::BufferRange;
use crate::error::{BufferError, Result};

const PREFIX_LEN: usize = 4;

/// Types that can be written to and read back from a [`Buffer`].
pub trait Serializable {
    /// Appends the encoded form of `self` to `out`.
    fn serialize(&self, out: &mut Buffer) -> Result<()>;

    /// Decodes from the front of `input`.
    ///
    /// On success `input` is advanced past the consumed bytes. On failure
    /// both `input` and `self` are left untouched and `false` is returned.
    fn deserialize(&mut self, input: &mut BufferRange<'_>) -> bool;
}

/// Appends `bytes` with its big-endian `u32` length prefix.
pub fn write_prefixed(out: &mut Buffer, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| BufferError::SizeTooBig {
        requested: bytes.len(),
        max: u32::MAX as usize,
    })?;
    out.increase(PREFIX_LEN + bytes.len(), true)?;
    out.append(&len.to_be_bytes())?;
    out.append(bytes)?;
    Ok(())
}

/// Reads one length-prefixed value from the front of `input`.
///
/// # Errors
///
/// Returns [`BufferError::Truncated`] if the prefix or the payload is
/// incomplete; `input` is not advanced in that case.
///
/// # Examples
///
/// ```
/// use secnet::Buffer;
/// use secnet::buffer::{read_prefixed, write_prefixed};
/// # use secnet::BufferError;
///
/// let mut buf = Buffer::default();
/// write_prefixed(&mut buf, b"first")?;
/// write_prefixed(&mut buf, b"second")?;
///
/// let mut input = buf.range(0, buf.len());
/// assert_eq!(read_prefixed(&mut input)?, b"first");
/// assert_eq!(read_prefixed(&mut input)?, b"second");
/// assert!(input.is_empty());
/// # Ok::<(), BufferError>(())
/// ```
pub fn read_prefixed<'a>(input: &mut BufferRange<'a>) -> Result<&'a [u8]> {
    let bytes = input.as_slice();
    let Some(prefix) = bytes.first_chunk::<PREFIX_LEN>() else {
        return Err(BufferError::Truncated {
            needed: PREFIX_LEN,
            available: bytes.len(),
        });
    };

    let len = u32::from_be_bytes(*prefix) as usize;
    let available = bytes.len() - PREFIX_LEN;
    if len > available {
        return Err(BufferError::Truncated {
            needed: len,
            available,
        });
    }

    input.advance(PREFIX_LEN + len);
    Ok(&bytes[PREFIX_LEN..PREFIX_LEN + len])
}

impl Serializable for Buffer {
    fn serialize(&self, out: &mut Buffer) -> Result<()> {
        write_prefixed(out, self.as_slice())
    }

    /// Appends the decoded payload to whatever `self` already holds.
    fn deserialize(&mut self, input: &mut BufferRange<'_>) -> bool {
        let mut cursor = *input;
        let Ok(payload) = read_prefixed(&mut cursor) else {
            return false;
        };
        if self.append(payload).is_err() {
            return false;
        }
        *input = cursor;
        true
    }
}

impl Serializable for Vec<u8> {
    fn serialize(&self, out: &mut Buffer) -> Result<()> {
        write_prefixed(out, self)
    }

    fn deserialize(&mut self, input: &mut BufferRange<'_>) -> bool {
        match read_prefixed(input) {
            Ok(payload) => {
                self.clear();
                self.extend_from_slice(payload);
                true
            }
            Err(_) => false,
        }
    }
}
