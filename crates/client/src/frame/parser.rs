//! The binary frame codec's parsing half.
//!
//! Implemented as a [`tokio_util::codec::Decoder`], the same idiom this
//! corpus uses for every other streaming grammar (`RequestDecoder`,
//! `ChunkedDecoder`, `LengthDecoder`): `decode` is handed whatever bytes
//! arrived and returns `Ok(None)` for "need more data", letting the caller
//! (or a `FramedRead`) keep accumulating and re-calling. `tokio_util`
//! already handles buffer compaction on our behalf, so the hand-rolled
//! "working buffer + base pointer" bookkeeping the original needed is
//! unnecessary here — only the size bound and the two-phase header/body
//! state machine carry over.

use crate::error::FrameError;
use crate::frame::buffer::FrameBuffer;
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

const HEADER_LEN: usize = 6;
pub const FRAME_MAGIC: u16 = 0xAAAA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    WaitingStart,
    WaitingData { body_size: u32 },
}

/// Parses a byte stream into length-prefixed frames: `u16` magic 0xAAAA
/// (little-endian) + `u32 body_size` (little-endian) + `body_size` bytes.
#[derive(Debug)]
pub struct FrameParser {
    state: ParserState,
    max_allowed_frames_size: usize,
}

impl FrameParser {
    pub fn new(max_allowed_frames_size: usize) -> Self {
        Self { state: ParserState::WaitingStart, max_allowed_frames_size }
    }

    fn check_not_overflowing(&self, buffered: usize) -> Result<(), FrameError> {
        if buffered > self.max_allowed_frames_size {
            warn!(buffered, max = self.max_allowed_frames_size, "frame parser buffer overflow");
            return Err(FrameError::BufferOverflow);
        }
        Ok(())
    }
}

impl Decoder for FrameParser {
    type Item = FrameBuffer;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ParserState::WaitingStart => {
                    if src.len() < HEADER_LEN {
                        self.check_not_overflowing(src.len())?;
                        return Ok(None);
                    }

                    let magic = (&src[0..2]).get_u16_le();
                    if magic != FRAME_MAGIC {
                        warn!(magic = format!("{magic:#06x}"), "malformed frame header");
                        return Err(FrameError::MalformedHeader { magic });
                    }

                    let body_size = (&src[2..6]).get_u32_le();
                    let max_body = (self.max_allowed_frames_size - HEADER_LEN) as u32;
                    if body_size > max_body {
                        warn!(body_size, max_body, "oversize frame body");
                        return Err(FrameError::OversizeBody { body_size, max: max_body });
                    }

                    trace!(body_size, "frame header parsed");
                    self.state = ParserState::WaitingData { body_size };
                }
                ParserState::WaitingData { body_size } => {
                    let total = HEADER_LEN + body_size as usize;
                    if src.len() < total {
                        self.check_not_overflowing(src.len())?;
                        return Ok(None);
                    }

                    let frame_bytes = src.split_to(total);
                    self.state = ParserState::WaitingStart;
                    trace!(len = frame_bytes.len(), "frame delivered");
                    return Ok(Some(FrameBuffer::from_bytes(frame_bytes)));
                }
            }
        }
    }
}

/// Runs `parser` over `chunk`, pushing accepted frames into `pool`.
///
/// `accept` is the optional filter contract: returning `false` silently
/// drops the frame instead of pushing it. Used by the inbound streaming
/// callback adapter, which owns neither the parser's buffer (that lives
/// with the adapter) nor the decision of whether a frame should be kept.
pub fn pump_into_pool(
    parser: &mut FrameParser,
    src: &mut BytesMut,
    pool: &crate::frame::pool::FramePool,
    mut accept: impl FnMut(&FrameBuffer) -> bool,
) -> Result<usize, FrameError> {
    let mut delivered = 0;
    while let Some(frame) = parser.decode(src)? {
        if accept(&frame) {
            pool.push_back(frame);
            delivered += 1;
        }
    }
    Ok(delivered)
}
