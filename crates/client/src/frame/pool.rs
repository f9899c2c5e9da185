//! A bounded FIFO of media frames with count and byte-size limits.
//!
//! Synchronized by a single `std::sync::Mutex` — the pool is touched from
//! the transport's inbound callback and from the session's streaming
//! lifecycle methods, never held across an `.await`, so a blocking mutex is
//! the right tool (this corpus reserves `tokio::sync::Mutex` for state that
//! genuinely needs to survive an await point, e.g. `OptionReqBody`).
//!
//! `lock()` returns a [`FramePoolGuard`] whose inherent methods are the
//! spec's "locked variants" — a caller that already holds the guard calls
//! those directly instead of re-acquiring the lock; the unlocked variants
//! on [`FramePool`] itself just acquire-then-delegate.

use super::buffer::FrameBuffer;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

struct Inner {
    frames: VecDeque<FrameBuffer>,
    total_bytes: usize,
}

/// A bounded FIFO of [`FrameBuffer`]s. Overflow policy is drop-oldest:
/// media realtime value decays faster than loss cost, so an overproducing
/// stream sheds its stalest frames rather than growing without bound.
pub struct FramePool {
    inner: Mutex<Inner>,
    count_limit: usize,
    bytes_limit: usize,
    on_erase: Option<Box<dyn Fn(&FrameBuffer) + Send + Sync>>,
}

impl FramePool {
    pub fn new(count_limit: usize, bytes_limit: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { frames: VecDeque::new(), total_bytes: 0 }),
            count_limit,
            bytes_limit,
            on_erase: None,
        }
    }

    /// Installs a callback invoked just before an evicted or popped frame
    /// is dropped (the original's `on_erase_cb`/`on_erase_data`).
    pub fn with_on_erase<F>(mut self, on_erase: F) -> Self
    where
        F: Fn(&FrameBuffer) + Send + Sync + 'static,
    {
        self.on_erase = Some(Box::new(on_erase));
        self
    }

    pub fn lock(&self) -> FramePoolGuard<'_> {
        FramePoolGuard { pool: self, guard: self.inner.lock().expect("frame pool mutex poisoned") }
    }

    pub fn push_back(&self, frame: FrameBuffer) {
        self.lock().push_back_locked(frame);
    }

    pub fn pop_front(&self) -> Option<FrameBuffer> {
        self.lock().pop_front_locked()
    }

    pub fn clear(&self) {
        self.lock().clear_locked();
    }

    pub fn count(&self) -> usize {
        self.lock().count()
    }

    pub fn total_bytes(&self) -> usize {
        self.lock().total_bytes()
    }
}

/// A held lock over a [`FramePool`]'s contents; its methods are the
/// spec's "locked" operation variants.
pub struct FramePoolGuard<'a> {
    pool: &'a FramePool,
    guard: MutexGuard<'a, Inner>,
}

impl FramePoolGuard<'_> {
    pub fn count(&self) -> usize {
        self.guard.frames.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.guard.total_bytes
    }

    /// Appends `frame`, then evicts from the front while either limit is
    /// breached, invoking the on-erase callback for each eviction.
    pub fn push_back_locked(&mut self, frame: FrameBuffer) {
        self.guard.total_bytes += frame.size();
        self.guard.frames.push_back(frame);

        while self.guard.frames.len() > self.pool.count_limit || self.guard.total_bytes > self.pool.bytes_limit {
            let Some(evicted) = self.guard.frames.pop_front() else { break };
            self.guard.total_bytes -= evicted.size();
            if let Some(on_erase) = &self.pool.on_erase {
                on_erase(&evicted);
            }
            warn!(count = self.guard.frames.len(), total_bytes = self.guard.total_bytes, "frame pool overflow, dropped oldest frame");
        }
    }

    pub fn pop_front_locked(&mut self) -> Option<FrameBuffer> {
        let frame = self.guard.frames.pop_front()?;
        self.guard.total_bytes -= frame.size();
        Some(frame)
    }

    /// Pops the oldest frame and invokes the on-erase callback on it.
    pub fn erase_front_locked(&mut self) -> Option<FrameBuffer> {
        let frame = self.pop_front_locked()?;
        if let Some(on_erase) = &self.pool.on_erase {
            on_erase(&frame);
        }
        Some(frame)
    }

    pub fn clear_locked(&mut self) {
        while self.erase_front_locked().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn frame_of(size: usize) -> FrameBuffer {
        let mut buf = FrameBuffer::new();
        buf.write(&vec![0u8; size]);
        buf
    }

    #[test]
    fn respects_count_limit_and_drops_oldest() {
        let pool = FramePool::new(2, usize::MAX);
        pool.push_back(frame_of(100));
        pool.push_back(frame_of(100));
        pool.push_back(frame_of(100));

        assert_eq!(pool.count(), 2);
        assert_eq!(pool.total_bytes(), 200);
    }

    #[test]
    fn on_erase_invoked_once_per_eviction() {
        let erased = Arc::new(AtomicUsize::new(0));
        let erased2 = erased.clone();
        let pool = FramePool::new(2, usize::MAX).with_on_erase(move |_| {
            erased2.fetch_add(1, Ordering::SeqCst);
        });

        pool.push_back(frame_of(10));
        pool.push_back(frame_of(10));
        pool.push_back(frame_of(10));

        assert_eq!(erased.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bytes_limit_evicts_independently_of_count() {
        let pool = FramePool::new(usize::MAX, 150);
        pool.push_back(frame_of(100));
        pool.push_back(frame_of(100));

        assert_eq!(pool.count(), 1);
        assert_eq!(pool.total_bytes(), 100);
    }

    #[test]
    fn invariant_holds_after_every_push() {
        let pool = FramePool::new(3, 250);
        for _ in 0..10 {
            pool.push_back(frame_of(40));
            assert!(pool.count() <= 3);
            assert!(pool.total_bytes() <= 250);
        }
    }
}
