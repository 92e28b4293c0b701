// src/buffer/mod.rs
//! Secure growable buffers, borrowed views into them, and the length-prefixed
//! encoding built on both.

mod core;
mod ops;
mod range;
mod serialize;

pub use self::core::{BUF_DEFAULT_SIZE, BUF_MAX_SIZE, Buffer};
pub use range::BufferRange;
pub use serialize::{Serializable, read_prefixed, write_prefixed};
