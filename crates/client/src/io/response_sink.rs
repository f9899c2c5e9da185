//! A growable response accumulator with a hard capacity cap.
//!
//! Fed by the control-plane response callback one chunk at a time;
//! finished off when the server sends `RST_STREAM`. Grows in 1 KiB
//! multiples like [`FrameBuffer`](crate::frame::FrameBuffer)'s own growth
//! policy, up to `max_capacity` — beyond that, further bytes are dropped
//! and the overflow is logged rather than growing without bound.

use bytes::BytesMut;
use tracing::warn;

pub struct ResponseSink {
    data: BytesMut,
    max_capacity: usize,
    finished: bool,
}

impl ResponseSink {
    pub fn new(initial_capacity: usize, max_capacity: usize) -> Self {
        Self { data: BytesMut::with_capacity(initial_capacity), max_capacity, finished: false }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Appends as much of `chunk` as fits under `max_capacity`. Returns
    /// `true` if the whole chunk fit, `false` if some (or all) of it was
    /// dropped to respect the cap.
    pub fn append(&mut self, chunk: &[u8]) -> bool {
        let allowed = self.max_capacity.saturating_sub(self.data.len());
        if allowed == 0 {
            if !chunk.is_empty() {
                warn!(max_capacity = self.max_capacity, "response sink at capacity, dropping chunk");
            }
            return chunk.is_empty();
        }

        let to_copy = chunk.len().min(allowed);
        let needed = self.data.len() + to_copy;
        if needed > self.data.capacity() {
            let shortfall = needed - self.data.capacity();
            let rounded = shortfall.div_ceil(1024) * 1024;
            self.data.reserve(rounded);
        }
        self.data.extend_from_slice(&chunk[..to_copy]);

        if to_copy < chunk.len() {
            warn!(max_capacity = self.max_capacity, "response sink overflow, truncated chunk");
            false
        } else {
            true
        }
    }

    /// Marks the response complete (the original's RST_STREAM epilogue,
    /// which null-terminates a C buffer — unnecessary here since `as_str`
    /// already exposes a properly-lengthed view).
    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Resets for the next request; retains allocated capacity.
    pub fn reset(&mut self) {
        self.data.clear();
        self.finished = false;
    }
}
