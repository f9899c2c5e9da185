//! Outgoing and incoming JSON-RPC message pools.
//!
//! Mutex-protected the same way [`FramePool`](crate::frame::FramePool) is —
//! a plain `std::sync::Mutex`, never held across an `.await`. Both pools
//! are touched from synchronous call sites inside
//! [`SessionClient`](crate::session::SessionClient) operations, not from
//! the transport pump itself.

use crate::protocol::rpc::{IncomingMessage, OutgoingMessage};
use serde_json::Value;
use std::sync::Mutex;

/// Producer-appended, send-drained pool of outgoing messages.
///
/// `take_for_send`/`restore_after_failed_send` implement the
/// duplicate-before-send / restore-on-failure contract: a send attempt
/// takes the whole pool (leaving it empty for concurrent producers), and
/// if the send fails, the taken snapshot is prepended back ahead of
/// whatever producers appended in the meantime.
#[derive(Default)]
pub struct OutgoingPool {
    inner: Mutex<Vec<OutgoingMessage>>,
}

impl OutgoingPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_msg(&self, msg: OutgoingMessage) {
        self.inner.lock().expect("outgoing pool mutex poisoned").push(msg);
    }

    /// True iff the pool is currently non-empty (a polling helper mirroring
    /// `locked_waiting`).
    pub fn is_waiting(&self) -> bool {
        !self.inner.lock().expect("outgoing pool mutex poisoned").is_empty()
    }

    /// Takes the whole pool for a send attempt, leaving it empty.
    pub fn take_for_send(&self) -> Vec<OutgoingMessage> {
        std::mem::take(&mut *self.inner.lock().expect("outgoing pool mutex poisoned"))
    }

    /// Restores `sent` ahead of anything producers appended while the send
    /// was in flight, preserving `sent`'s relative order.
    pub fn restore_after_failed_send(&self, sent: Vec<OutgoingMessage>) {
        if sent.is_empty() {
            return;
        }
        let mut guard = self.inner.lock().expect("outgoing pool mutex poisoned");
        let mut restored = sent;
        restored.append(&mut guard);
        *guard = restored;
    }
}

/// Server-populated, cursor-drained pool of incoming messages.
#[derive(Default)]
struct IncomingInner {
    msgs: Vec<IncomingMessage>,
    cursor: usize,
}

#[derive(Default)]
pub struct IncomingPool {
    inner: Mutex<IncomingInner>,
}

impl IncomingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly-received `msgs` array and resets the cursor.
    pub fn set_pool(&self, msgs: Vec<IncomingMessage>) {
        let mut guard = self.inner.lock().expect("incoming pool mutex poisoned");
        guard.msgs = msgs;
        guard.cursor = 0;
    }

    pub fn reset(&self) {
        let mut guard = self.inner.lock().expect("incoming pool mutex poisoned");
        guard.msgs.clear();
        guard.cursor = 0;
    }

    /// Walks messages from the current cursor, invoking `callback(device,
    /// kind, params, mid)` for each message that carries both a device and
    /// a kind. The cursor always advances; the walk stops when `callback`
    /// returns `false`, the cursor reaches the end (the pool is then
    /// cleared), or more than `limit` callbacks have fired.
    ///
    /// Returns the number of callback invocations and the most recent
    /// `stamp` value seen, if any — the caller (not this pool) is
    /// responsible for folding that into the session's monotonic
    /// `last_stamp`, since this pool has no notion of session state.
    pub fn proceed<F>(&self, limit: usize, mut callback: F) -> (usize, Option<Value>)
    where
        F: FnMut(&str, &str, Option<&Value>, Option<&str>) -> bool,
    {
        let mut guard = self.inner.lock().expect("incoming pool mutex poisoned");
        let mut consumed = 0;
        let mut last_stamp = None;

        while guard.cursor < guard.msgs.len() {
            let idx = guard.cursor;
            guard.cursor += 1;

            let msg = guard.msgs[idx].clone();
            if let Some(stamp) = msg.stamp.clone() {
                last_stamp = Some(stamp);
            }

            if let (Some(device), Some(kind)) = (msg.device.as_deref(), msg.msg.as_deref()) {
                let keep_going = callback(device, kind, msg.params.as_ref(), msg.mid());
                consumed += 1;
                if !keep_going || consumed > limit {
                    break;
                }
            }
        }

        if guard.cursor >= guard.msgs.len() {
            guard.msgs.clear();
            guard.cursor = 0;
        }

        (consumed, last_stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_pool_fifo_and_restore_preserves_order() {
        let pool = OutgoingPool::new();
        pool.add_msg(OutgoingMessage::new("A"));
        pool.add_msg(OutgoingMessage::new("B"));

        let sent = pool.take_for_send();
        assert!(!pool.is_waiting());

        pool.add_msg(OutgoingMessage::new("C")); // concurrent append during send

        pool.restore_after_failed_send(sent);

        let remaining = pool.take_for_send();
        let kinds: Vec<_> = remaining.iter().map(|m| m.msg.as_str()).collect();
        assert_eq!(kinds, vec!["A", "B", "C"]);
    }

    #[test]
    fn restore_into_empty_pool_just_replaces() {
        let pool = OutgoingPool::new();
        pool.add_msg(OutgoingMessage::new("A"));
        let sent = pool.take_for_send();
        pool.restore_after_failed_send(sent);

        let remaining = pool.take_for_send();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].msg, "A");
    }

    #[test]
    fn incoming_pool_clears_when_cursor_reaches_end() {
        let pool = IncomingPool::new();
        pool.set_pool(vec![
            IncomingMessage { device: Some("cam1".into()), msg: Some("ping".into()), stamp: None, params: None },
            IncomingMessage { device: Some("cam2".into()), msg: Some("ping".into()), stamp: None, params: None },
        ]);

        let (consumed, _) = pool.proceed(usize::MAX, |_, _, _, _| true);
        assert_eq!(consumed, 2);

        // pool was cleared, a further proceed does nothing
        let (consumed2, _) = pool.proceed(usize::MAX, |_, _, _, _| true);
        assert_eq!(consumed2, 0);
    }

    #[test]
    fn incoming_pool_skips_messages_missing_device_or_kind() {
        let pool = IncomingPool::new();
        pool.set_pool(vec![
            IncomingMessage { device: None, msg: Some("ping".into()), stamp: None, params: None },
            IncomingMessage { device: Some("cam1".into()), msg: Some("ping".into()), stamp: None, params: None },
        ]);

        let (consumed, _) = pool.proceed(usize::MAX, |_, _, _, _| true);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn incoming_pool_respects_limit() {
        let pool = IncomingPool::new();
        pool.set_pool(vec![
            IncomingMessage { device: Some("d".into()), msg: Some("m".into()), stamp: None, params: None },
            IncomingMessage { device: Some("d".into()), msg: Some("m".into()), stamp: None, params: None },
            IncomingMessage { device: Some("d".into()), msg: Some("m".into()), stamp: None, params: None },
        ]);

        let (consumed, _) = pool.proceed(1, |_, _, _, _| true);
        assert_eq!(consumed, 2); // limit_cnt+1 invocations per call
    }

    #[test]
    fn incoming_pool_tracks_latest_stamp() {
        let pool = IncomingPool::new();
        pool.set_pool(vec![
            IncomingMessage { device: Some("d".into()), msg: Some("m".into()), stamp: Some(Value::from(1)), params: None },
            IncomingMessage { device: Some("d".into()), msg: Some("m".into()), stamp: Some(Value::from(2)), params: None },
        ]);

        let (_, stamp) = pool.proceed(usize::MAX, |_, _, _, _| true);
        assert_eq!(stamp, Some(Value::from(2)));
    }
}
