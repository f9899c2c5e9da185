//! The binary media frame codec: buffer, pool, and parser.
//!
//! # Components
//!
//! - [`FrameBuffer`]: a growable byte buffer with an explicit read/write
//!   cursor, used both as a completed frame's payload holder and (inside
//!   [`FrameParser`]) transiently while assembling one.
//! - [`FramePool`]: a bounded, mutex-guarded FIFO of frames with
//!   count/byte limits and drop-oldest eviction.
//! - [`FrameParser`]: a [`tokio_util::codec::Decoder`] turning a raw byte
//!   stream into frames.
//!
//! # Wire format
//!
//! `u16` magic `0xAAAA` (little-endian) + `u32 body_size` (little-endian)
//! + `body_size` bytes of payload. Six bytes of header, then the body.

pub mod buffer;
pub mod parser;
pub mod pool;

pub use buffer::FrameBuffer;
pub use parser::{pump_into_pool, FrameParser, FRAME_MAGIC};
pub use pool::{FramePool, FramePoolGuard};
