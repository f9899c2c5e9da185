//! [`SessionClient`]: the public façade over one HTTP/2 connection to a
//! webcam/IoT streaming service.
//!
//! One `SessionClient` owns exactly one control-plane session (`sid`) and,
//! depending on [`Mode`], up to two concurrent streaming planes: an inbound
//! `GET /output.raw` and an outbound `PUT /input.raw`. All three share the
//! same underlying [`Transport`], the same way the original multiplexes
//! every plane over one `nghttp2` session.

use bytes::{Bytes, BytesMut};
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, FrameError, ProtocolError, ServerErrorCode};
use crate::frame::{pump_into_pool, FrameParser, FramePool, FRAME_MAGIC};
use crate::io::{RequestBodySource, ResponseSink};
use crate::pools::{IncomingPool, OutgoingPool};
use crate::protocol::{paths, rpc};
use crate::transport::{DataProviderResult, RstStreamCode, StreamDriver, StreamEvent, StreamId, Transport};

/// Drives a single control-plane request: supplies the serialized request
/// body, if any, and accumulates the response into a [`ResponseSink`].
struct JsonExchange<'a, 'b> {
    body: Option<RequestBodySource<'b>>,
    sink: &'a mut ResponseSink,
    finished: bool,
    goaway: bool,
}

impl StreamDriver for JsonExchange<'_, '_> {
    fn poll_data(&mut self, buf: &mut [u8]) -> DataProviderResult {
        let Some(body) = self.body.as_mut() else {
            return DataProviderResult::KeepAlive;
        };
        let (n, eof) = body.read(buf);
        DataProviderResult::Wrote { len: n, eof }
    }

    fn on_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Data(chunk) => {
                self.sink.append(&chunk);
            }
            StreamEvent::FrameComplete | StreamEvent::RstStream => {
                self.sink.mark_finished();
                self.finished = true;
            }
            StreamEvent::GoAway => self.goaway = true,
            StreamEvent::SendProgress { .. } => {}
        }
    }
}

/// Drives the inbound media stream: no outbound body, just chunks of raw
/// bytes handed straight to the frame parser.
struct IncomingExchange<'a> {
    chunks: &'a mut Vec<Bytes>,
    rst: bool,
    goaway: bool,
}

impl StreamDriver for IncomingExchange<'_> {
    fn on_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Data(chunk) => self.chunks.push(chunk),
            StreamEvent::RstStream => self.rst = true,
            StreamEvent::GoAway => self.goaway = true,
            StreamEvent::FrameComplete | StreamEvent::SendProgress { .. } => {}
        }
    }
}

/// A single outbound media frame in flight on the outgoing stream: header
/// and payload pre-assembled into one contiguous buffer so the data
/// provider is a plain slice-copy rather than a two-phase header/body
/// write.
struct OutFrame {
    bytes: Bytes,
    cursor: usize,
    acked: usize,
    sending_finished: bool,
}

impl OutFrame {
    fn new(payload: Bytes) -> Self {
        let mut framed = BytesMut::with_capacity(6 + payload.len());
        framed.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
        framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        framed.extend_from_slice(&payload);
        Self { bytes: framed.freeze(), cursor: 0, acked: 0, sending_finished: false }
    }
}

/// Drives the outgoing media stream for one prepared frame: supplies the
/// frame's bytes, tracks how much the transport has acknowledged sending.
struct OutgoingExchange<'a> {
    frame: &'a mut OutFrame,
    rst: bool,
    goaway: bool,
}

impl StreamDriver for OutgoingExchange<'_> {
    fn poll_data(&mut self, buf: &mut [u8]) -> DataProviderResult {
        let remaining = self.frame.bytes.len() - self.frame.cursor;
        if remaining == 0 {
            return DataProviderResult::Park;
        }
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&self.frame.bytes[self.frame.cursor..self.frame.cursor + n]);
        self.frame.cursor += n;
        DataProviderResult::Wrote { len: n, eof: false }
    }

    fn on_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::SendProgress { bytes } => {
                self.frame.acked += bytes;
                if self.frame.acked >= self.frame.bytes.len() {
                    self.frame.sending_finished = true;
                }
            }
            StreamEvent::RstStream => {
                self.rst = true;
                self.frame.sending_finished = true;
            }
            StreamEvent::GoAway => self.goaway = true,
            StreamEvent::Data(_) | StreamEvent::FrameComplete => {}
        }
    }
}

/// The client façade. Generic over [`Transport`] so tests can drive it
/// against a hand-written double instead of a real HTTP/2 connection.
pub struct SessionClient<T: Transport> {
    config: ClientConfig,
    transport: T,

    sid: Option<String>,
    last_stamp: Option<Value>,
    protocol_errors: u32,
    last_err_code: Option<ServerErrorCode>,

    response_sink: ResponseSink,

    frame_pool: Option<FramePool>,
    frame_parser: Option<FrameParser>,
    frame_parse_buf: BytesMut,

    outgoing: Option<OutgoingPool>,
    incoming: Option<IncomingPool>,

    inc_stream_id: Option<StreamId>,
    out_stream_id: Option<StreamId>,
    out_frame: Option<OutFrame>,
}

impl<T: Transport> SessionClient<T> {
    /// Builds a client over an already-constructed transport, allocating
    /// the pools and buffers [`ClientConfig::mode`] calls for.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        let frame_pool = config.mode.incoming.then(|| FramePool::new(config.max_allowed_frames, config.max_allowed_frames_size));
        let frame_parser = config.mode.incoming.then(|| FrameParser::new(config.max_allowed_frames_size));
        let outgoing = config.mode.messaging.then(OutgoingPool::new);
        let incoming = config.mode.messaging.then(IncomingPool::new);
        let response_sink = ResponseSink::new(config.initial_response_buffer, config.max_response_buffer);
        let frame_parse_buf = BytesMut::with_capacity(config.initial_frame_buffer);

        Self {
            config,
            transport,
            sid: None,
            last_stamp: None,
            protocol_errors: 0,
            last_err_code: None,
            response_sink,
            frame_pool,
            frame_parser,
            frame_parse_buf,
            outgoing,
            incoming,
            inc_stream_id: None,
            out_stream_id: None,
            out_frame: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn protocol_error_count(&self) -> u32 {
        self.protocol_errors
    }

    pub fn last_server_error(&self) -> Option<ServerErrorCode> {
        self.last_err_code
    }

    /// Connects the underlying transport. Does not authorize a session.
    pub async fn initialize(&mut self, server: &str) -> Result<(), ClientError> {
        self.transport.connect(server).await.map_err(|e| ClientError::internal(e.to_string()))?;
        Ok(())
    }

    // ---- control plane -------------------------------------------------

    /// Authorizes a new session. On success, `sid()` is populated and
    /// `last_stamp` is seeded so the first `get_msgs` call has a baseline.
    pub async fn authorize(&mut self, name: &str, password: &str, device: &str, meta: Value) -> Result<(), ClientError> {
        self.sid = None;

        let body = serde_json::json!({
            rpc::FIELD_NAME: name,
            rpc::FIELD_PASS: password,
            rpc::FIELD_DEVICE: device,
            rpc::FIELD_META: meta,
        });
        let bytes = serde_json::to_vec(&body).map_err(ClientError::internal)?;

        let stream_id = self.transport.submit_post(paths::AUTHORIZE, bytes.len()).await.map_err(|_| ClientError::NotConnected)?;
        if !self.run_exchange(stream_id, Some(RequestBodySource::owned(bytes))).await? {
            return Err(ClientError::NotConnected);
        }

        let value = self.parse_response()?;
        match value.get("shash").and_then(Value::as_str) {
            Some(shash) => {
                self.sid = Some(shash.to_string());
                self.protocol_errors = 0;
                self.last_err_code = None;
                self.last_stamp = Some(rpc::sync_stamp());
                Ok(())
            }
            None => self.reject(&value),
        }
    }

    /// Lists the caller's online devices, invoking `on_device(device,
    /// subproto)` for each entry until it returns `false`.
    pub async fn get_streams<F>(&mut self, mut on_device: F) -> Result<(), ClientError>
    where
        F: FnMut(&str, Option<&str>) -> bool,
    {
        let sid = self.require_sid()?;
        let body = serde_json::json!({ rpc::FIELD_SHASH: sid });
        let bytes = serde_json::to_vec(&body).map_err(ClientError::internal)?;

        let stream_id = self.transport.submit_post(paths::GET_STREAMS, bytes.len()).await.map_err(|_| ClientError::NotConnected)?;
        if !self.run_exchange(stream_id, Some(RequestBodySource::owned(bytes))).await? {
            return Err(ClientError::NotConnected);
        }

        let value = self.parse_response()?;
        if value.get(rpc::FIELD_RESULT).and_then(Value::as_str) != Some(rpc::RESULT_OK) {
            return self.reject(&value);
        }

        if let Some(devices) = value.get(rpc::FIELD_DEVICES).and_then(Value::as_array) {
            for entry in devices {
                let Some(device) = entry.get(rpc::FIELD_DEVICE).and_then(Value::as_str) else { continue };
                let subproto = entry.get(rpc::FIELD_SUBPROTO).and_then(Value::as_str);
                if !on_device(device, subproto) {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Drains the outgoing message pool and POSTs it. On anything but a
    /// clean `"OK"` the drained messages are restored ahead of whatever a
    /// concurrent producer appended meanwhile — see
    /// [`OutgoingPool::restore_after_failed_send`]. Not restored on
    /// [`ClientError::NotConnected`]: a dropped connection is expected to
    /// go through [`Self::reset`], which clears the pool outright.
    pub async fn send_msgs(&mut self) -> Result<(), ClientError> {
        let sid = self.require_sid()?;
        if !self.config.mode.messaging {
            return Err(ClientError::invalid_state("messaging mode not enabled"));
        }
        let outgoing = self.outgoing.as_ref().expect("messaging mode implies an outgoing pool");
        let drained = outgoing.take_for_send();
        if drained.is_empty() {
            return Ok(());
        }

        let body = serde_json::json!({ rpc::FIELD_SHASH: sid, rpc::FIELD_MSGS: drained });
        let bytes = match serde_json::to_vec(&body) {
            Ok(b) => b,
            Err(e) => {
                self.outgoing.as_ref().unwrap().restore_after_failed_send(drained);
                return Err(ClientError::internal(e));
            }
        };

        let stream_id = self.transport.submit_post(paths::ADD_MSGS, bytes.len()).await.map_err(|_| ClientError::NotConnected)?;
        if !self.run_exchange(stream_id, Some(RequestBodySource::owned(bytes))).await? {
            return Err(ClientError::NotConnected);
        }

        let value = match self.parse_response() {
            Ok(v) => v,
            Err(e) => {
                self.outgoing.as_ref().unwrap().restore_after_failed_send(drained);
                return Err(e);
            }
        };

        if value.get(rpc::FIELD_RESULT).and_then(Value::as_str) == Some(rpc::RESULT_OK) {
            Ok(())
        } else {
            self.outgoing.as_ref().unwrap().restore_after_failed_send(drained);
            self.reject(&value)
        }
    }

    /// One-shot POST of a media record, distinct from the long-lived
    /// outgoing stream: used for small, infrequent out-of-band blobs
    /// rather than the continuous media plane.
    pub async fn send_media_record(&mut self, buf: &[u8]) -> Result<(), ClientError> {
        let sid = self.require_sid()?;
        let path = paths::add_record(&sid);

        let stream_id = self.transport.submit_post(&path, buf.len()).await.map_err(|_| ClientError::NotConnected)?;
        if !self.run_exchange(stream_id, Some(RequestBodySource::borrowed(buf))).await? {
            return Err(ClientError::NotConnected);
        }

        let value = self.parse_response()?;
        if value.get(rpc::FIELD_RESULT).and_then(Value::as_str) == Some(rpc::RESULT_OK) {
            Ok(())
        } else {
            self.reject(&value)
        }
    }

    /// Fetches new JSON-RPC messages and syncs `last_stamp`. Messages are
    /// installed into the incoming pool but not dispatched — call
    /// [`Self::dispatch_incoming`] to walk them.
    pub async fn get_msgs(&mut self) -> Result<(), ClientError> {
        let sid = self.require_sid()?;
        if !self.config.mode.messaging {
            return Err(ClientError::invalid_state("messaging mode not enabled"));
        }
        let stamp = self.last_stamp.clone().ok_or_else(|| ClientError::invalid_state("authorize before get_msgs"))?;

        let body = serde_json::json!({ rpc::FIELD_SHASH: sid, rpc::FIELD_STAMP: stamp });
        let bytes = serde_json::to_vec(&body).map_err(ClientError::internal)?;

        let stream_id = self.transport.submit_post(paths::GET_MSGS_AND_SYNC, bytes.len()).await.map_err(|_| ClientError::NotConnected)?;
        if !self.run_exchange(stream_id, Some(RequestBodySource::owned(bytes))).await? {
            return Err(ClientError::NotConnected);
        }

        let incoming = self.incoming.as_ref().expect("messaging mode implies an incoming pool");
        incoming.reset();

        if self.response_sink.is_empty() {
            return Err(ClientError::EmptyResponse);
        }
        let value = self.parse_response()?;
        if value.get(rpc::FIELD_RESULT).and_then(Value::as_str) != Some(rpc::RESULT_OK) {
            return self.reject(&value);
        }

        let Some(msgs_val) = value.get(rpc::FIELD_MSGS) else {
            return Err(ClientError::EmptyResponse);
        };
        let msgs = serde_json::from_value(msgs_val.clone()).map_err(ClientError::internal)?;

        if let Some(new_stamp) = value.get(rpc::FIELD_STAMP) {
            self.last_stamp = Some(new_stamp.clone());
        }
        self.incoming.as_ref().unwrap().set_pool(msgs);
        Ok(())
    }

    /// Walks the incoming pool, invoking `callback(device, kind, params,
    /// mid)` per message; see [`IncomingPool::proceed`]. Folds the most
    /// recent `stamp` seen into `last_stamp`, since the pool itself tracks
    /// no session state.
    pub fn dispatch_incoming<F>(&mut self, limit: usize, callback: F) -> Result<usize, ClientError>
    where
        F: FnMut(&str, &str, Option<&Value>, Option<&str>) -> bool,
    {
        let incoming = self.incoming.as_ref().ok_or_else(|| ClientError::invalid_state("messaging mode not enabled"))?;
        let (consumed, stamp) = incoming.proceed(limit, callback);
        if let Some(stamp) = stamp {
            self.last_stamp = Some(stamp);
        }
        Ok(consumed)
    }

    pub fn outgoing_pool(&self) -> Option<&OutgoingPool> {
        self.outgoing.as_ref()
    }

    // ---- inbound media stream -------------------------------------------

    /// Opens the inbound `GET /output.raw` stream for `device_name`.
    pub async fn incoming_launch(&mut self, device_name: &str) -> Result<(), ClientError> {
        let sid = self.require_sid()?;
        if !self.config.mode.incoming {
            return Err(ClientError::invalid_state("incoming mode not enabled"));
        }
        let path = paths::output_raw(&sid, device_name);
        let stream_id = self
            .transport
            .submit_get(&path)
            .await
            .map_err(|_| ClientError::invalid_state("failed to launch incoming stream"))?;
        self.inc_stream_id = Some(stream_id);
        self.frame_parse_buf.clear();
        Ok(())
    }

    pub fn is_launched(&self) -> bool {
        self.inc_stream_id.is_some()
    }

    /// Pumps the inbound stream for up to `incoming_wait_ticks`, parsing
    /// any bytes received into complete frames and pushing them into the
    /// frame pool. Returns `false` once the stream ends (RST, GOAWAY, or
    /// the connection drops) — callers should stop calling it and, if they
    /// want to keep streaming, call [`Self::incoming_launch`] again.
    pub async fn incoming_wait_for_frame(&mut self) -> Result<bool, ClientError> {
        let Some(stream_id) = self.inc_stream_id else {
            return Ok(false);
        };

        for _ in 0..self.config.incoming_wait_ticks {
            self.transport.resume_data(stream_id).await;

            let mut chunks = Vec::new();
            let (rst, goaway) = {
                let mut driver = IncomingExchange { chunks: &mut chunks, rst: false, goaway: false };
                self.transport.pump(stream_id, &mut driver).await.map_err(|e| ClientError::internal(e.to_string()))?;
                (driver.rst, driver.goaway)
            };

            if goaway {
                self.disconnect();
                return Ok(false);
            }
            if rst {
                self.inc_stream_id = None;
                return Ok(false);
            }

            for chunk in chunks {
                let mut pos = 0;
                while pos < chunk.len() {
                    let free = self.config.max_allowed_frames_size.saturating_sub(self.frame_parse_buf.len());
                    let take = free.min(chunk.len() - pos);
                    self.frame_parse_buf.extend_from_slice(&chunk[pos..pos + take]);
                    pos += take;

                    if let (Some(parser), Some(pool)) = (self.frame_parser.as_mut(), self.frame_pool.as_ref()) {
                        pump_into_pool(parser, &mut self.frame_parse_buf, pool, |_| true)?;
                    }

                    if take == 0 && pos < chunk.len() {
                        return Err(ClientError::from(FrameError::BufferOverflow));
                    }
                }
            }

            if !self.transport.is_connected() {
                self.disconnect();
                return Ok(false);
            }
            tokio::task::yield_now().await;
        }
        Ok(true)
    }

    pub fn frame_pool(&self) -> Option<&FramePool> {
        self.frame_pool.as_ref()
    }

    /// Resets the inbound stream without tearing down the connection.
    pub async fn incoming_stop(&mut self) {
        if let Some(stream_id) = self.inc_stream_id.take() {
            if self.transport.is_connected() {
                self.transport.submit_rst_stream(stream_id, RstStreamCode::RefusedStream).await;
            }
        }
        if let Some(pool) = &self.frame_pool {
            pool.clear();
        }
    }

    // ---- outbound media stream -------------------------------------------

    /// Opens the outbound `PUT /input.raw` stream.
    pub async fn outgoing_prepare(&mut self) -> Result<(), ClientError> {
        let sid = self.require_sid()?;
        if !self.config.mode.outgoing {
            return Err(ClientError::invalid_state("outgoing mode not enabled"));
        }
        let path = paths::input_raw(&sid);
        let stream_id = self
            .transport
            .submit_put(&path)
            .await
            .map_err(|_| ClientError::invalid_state("failed to prepare outgoing stream"))?;
        self.out_stream_id = Some(stream_id);
        self.out_frame = None;
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.out_stream_id.is_some()
    }

    /// Queues `payload` as the next frame to push on the outgoing stream.
    pub fn outgoing_prepare_frame(&mut self, payload: Bytes) -> Result<(), ClientError> {
        if self.out_stream_id.is_none() {
            return Err(ClientError::invalid_state("outgoing_prepare before prepare_frame"));
        }
        self.out_frame = Some(OutFrame::new(payload));
        Ok(())
    }

    /// Pumps the outgoing stream until the prepared frame has been fully
    /// sent and acknowledged. Returns `false` if the stream ended before
    /// that happened.
    pub async fn outgoing_wait_for_frame(&mut self) -> Result<bool, ClientError> {
        let Some(stream_id) = self.out_stream_id else {
            return Ok(false);
        };

        loop {
            let Some(frame) = self.out_frame.as_mut() else {
                return Ok(false);
            };

            let (rst, goaway, done) = {
                let mut driver = OutgoingExchange { frame, rst: false, goaway: false };
                self.transport.pump(stream_id, &mut driver).await.map_err(|e| ClientError::internal(e.to_string()))?;
                (driver.rst, driver.goaway, driver.frame.sending_finished)
            };

            if goaway {
                self.disconnect();
                return Ok(false);
            }
            if rst {
                self.out_stream_id = None;
                self.out_frame = None;
                return Ok(false);
            }
            if done {
                self.out_frame = None;
                return Ok(true);
            }
            if !self.transport.is_connected() {
                self.disconnect();
                return Ok(false);
            }
            tokio::task::yield_now().await;
        }
    }

    // ---- lifecycle -------------------------------------------------------

    /// Clears transient per-request buffers without touching the session
    /// (`sid`) or the streaming stream ids.
    pub fn reset_buffers(&mut self) {
        self.response_sink.reset();
        self.frame_parse_buf.clear();
        self.out_frame = None;
    }

    /// Tears down all session and streaming state, but leaves the
    /// transport connection itself alone.
    pub fn reset(&mut self) {
        self.sid = None;
        self.last_stamp = None;
        self.protocol_errors = 0;
        self.last_err_code = None;
        self.inc_stream_id = None;
        self.out_stream_id = None;
        self.out_frame = None;
        self.reset_buffers();
        if let Some(pool) = &self.frame_pool {
            pool.clear();
        }
        if let Some(parser) = &mut self.frame_parser {
            *parser = FrameParser::new(self.config.max_allowed_frames_size);
        }
        if let Some(outgoing) = &self.outgoing {
            outgoing.take_for_send();
        }
        if let Some(incoming) = &self.incoming {
            incoming.reset();
        }
    }

    /// Tears down everything, including the transport connection.
    pub fn disconnect(&mut self) {
        self.reset();
        self.transport.disconnect();
    }

    /// Consumes the client, returning the underlying transport.
    pub fn finalize(mut self) -> T {
        self.reset();
        self.transport
    }

    // ---- shared request machinery -----------------------------------------

    fn require_sid(&self) -> Result<String, ClientError> {
        self.sid.clone().ok_or_else(|| ClientError::invalid_state("authorize before this call"))
    }

    fn parse_response(&self) -> Result<Value, ClientError> {
        let text = self.response_sink.as_str().map_err(ClientError::internal)?;
        serde_json::from_str(text).map_err(ClientError::internal)
    }

    fn reject<R>(&mut self, value: &Value) -> Result<R, ClientError> {
        let code_num = value.get(rpc::FIELD_CODE).and_then(Value::as_i64).unwrap_or(1);
        let code = ServerErrorCode::from_code(code_num);
        let message = value.get(rpc::FIELD_RESULT).and_then(Value::as_str).map(String::from);
        self.protocol_errors += 1;
        self.last_err_code = Some(code);
        debug!(?code, protocol_errors = self.protocol_errors, "server rejected request");
        Err(ClientError::from(ProtocolError::new(code, message)))
    }

    /// Runs the control-plane request/response pump for `stream_id` until
    /// the response is complete or the connection is lost. Returns `false`
    /// on connection loss (the caller should treat this as
    /// [`ClientError::NotConnected`]); on success, the response bytes are
    /// left in `self.response_sink` for the caller to parse.
    async fn run_exchange<'b>(&mut self, stream_id: StreamId, body: Option<RequestBodySource<'b>>) -> Result<bool, ClientError> {
        self.response_sink.reset();
        let mut body = body;

        loop {
            let (finished, goaway) = {
                let mut exchange = JsonExchange { body: body.take(), sink: &mut self.response_sink, finished: false, goaway: false };
                self.transport.pump(stream_id, &mut exchange).await.map_err(|e| ClientError::internal(e.to_string()))?;
                body = exchange.body.take();
                (exchange.finished, exchange.goaway)
            };

            if goaway {
                self.disconnect();
                return Ok(false);
            }
            if finished {
                return Ok(true);
            }
            if !self.transport.is_connected() {
                self.disconnect();
                return Ok(false);
            }
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// A hand-written transport double: every stream submission enqueues a
    /// scripted sequence of events to replay on successive `pump` calls,
    /// the same style this corpus uses for its own test doubles rather
    /// than a mocking framework.
    #[derive(Default, Clone)]
    struct MockTransport {
        connected: Arc<Mutex<bool>>,
        next_stream_id: Arc<Mutex<StreamId>>,
        scripts: Arc<Mutex<std::collections::HashMap<StreamId, VecDeque<StreamEvent>>>>,
        pending_script: Arc<Mutex<VecDeque<StreamEvent>>>,
    }

    impl MockTransport {
        fn new() -> Self {
            let t = Self { connected: Arc::new(Mutex::new(true)), ..Default::default() };
            *t.next_stream_id.lock().unwrap() = 1;
            t
        }

        /// Queues the events the *next* submitted stream will replay.
        fn queue_next(&self, events: Vec<StreamEvent>) {
            *self.pending_script.lock().unwrap() = events.into();
        }

        fn alloc_stream(&self) -> StreamId {
            let mut id = self.next_stream_id.lock().unwrap();
            let this = *id;
            *id += 1;
            let script = std::mem::take(&mut *self.pending_script.lock().unwrap());
            self.scripts.lock().unwrap().insert(this, script);
            this
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock transport error")]
    struct MockError;

    impl LocalTransport for MockTransport {
        type Error = MockError;

        async fn connect(&mut self, _server: &str) -> Result<(), Self::Error> {
            *self.connected.lock().unwrap() = true;
            Ok(())
        }

        async fn submit_get(&mut self, _path: &str) -> Result<StreamId, Self::Error> {
            Ok(self.alloc_stream())
        }

        async fn submit_post(&mut self, _path: &str, _content_length: usize) -> Result<StreamId, Self::Error> {
            Ok(self.alloc_stream())
        }

        async fn submit_put(&mut self, _path: &str) -> Result<StreamId, Self::Error> {
            Ok(self.alloc_stream())
        }

        async fn pump(&mut self, stream_id: StreamId, driver: &mut dyn StreamDriver) -> Result<(), Self::Error> {
            let mut buf = [0u8; 256];
            let _ = driver.poll_data(&mut buf);
            if let Some(event) = self.scripts.lock().unwrap().get_mut(&stream_id).and_then(VecDeque::pop_front) {
                driver.on_event(event);
            }
            Ok(())
        }

        async fn resume_data(&mut self, _stream_id: StreamId) {}

        async fn submit_rst_stream(&mut self, _stream_id: StreamId, _code: RstStreamCode) {}

        fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap()
        }

        fn disconnect(&mut self) {
            *self.connected.lock().unwrap() = false;
        }
    }

    fn scripted_response(body: &str) -> Vec<StreamEvent> {
        vec![StreamEvent::Data(Bytes::copy_from_slice(body.as_bytes())), StreamEvent::RstStream]
    }

    #[tokio::test]
    async fn authorize_happy_path_sets_sid_and_seeds_stamp() {
        let transport = MockTransport::new();
        transport.queue_next(scripted_response(r#"{"shash":"abc123"}"#));
        let mut client = SessionClient::new(ClientConfig::with_mode(crate::config::Mode::none().messaging()), transport);

        client.authorize("alice", "hunter2", "cam1", serde_json::json!({})).await.unwrap();

        assert_eq!(client.sid(), Some("abc123"));
        assert_eq!(client.protocol_error_count(), 0);
    }

    #[tokio::test]
    async fn authorize_bad_credentials_is_a_protocol_error_and_leaves_sid_unset() {
        let transport = MockTransport::new();
        transport.queue_next(scripted_response(r#"{"result":"BAD","code":7}"#));
        let mut client = SessionClient::new(ClientConfig::default(), transport);

        let err = client.authorize("alice", "wrong", "cam1", serde_json::json!({})).await.unwrap_err();

        assert!(matches!(err, ClientError::Protocol { source: ProtocolError { code: ServerErrorCode::NoSuchUser, .. } }));
        assert_eq!(client.sid(), None);
        assert_eq!(client.protocol_error_count(), 1);
        assert_eq!(client.last_server_error(), Some(ServerErrorCode::NoSuchUser));
    }

    #[tokio::test]
    async fn get_streams_requires_prior_authorize() {
        let transport = MockTransport::new();
        let mut client = SessionClient::new(ClientConfig::default(), transport);

        let err = client.get_streams(|_, _| true).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn send_msgs_restores_pool_on_protocol_failure() {
        let transport = MockTransport::new();
        transport.queue_next(scripted_response(r#"{"shash":"sid1"}"#));
        let mut client = SessionClient::new(ClientConfig::with_mode(crate::config::Mode::none().messaging()), transport.clone());
        client.authorize("a", "b", "c", serde_json::json!({})).await.unwrap();

        client.outgoing_pool().unwrap().add_msg(rpc::OutgoingMessage::new("ping"));

        transport.queue_next(scripted_response(r#"{"result":"BAD","code":4}"#));
        let err = client.send_msgs().await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol { .. }));

        // the message was restored, not lost
        let pending = client.outgoing_pool().unwrap().take_for_send();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].msg, "ping");
    }

    #[tokio::test]
    async fn send_msgs_succeeds_and_drains_pool() {
        let transport = MockTransport::new();
        transport.queue_next(scripted_response(r#"{"shash":"sid1"}"#));
        let mut client = SessionClient::new(ClientConfig::with_mode(crate::config::Mode::none().messaging()), transport.clone());
        client.authorize("a", "b", "c", serde_json::json!({})).await.unwrap();

        client.outgoing_pool().unwrap().add_msg(rpc::OutgoingMessage::new("ping"));
        transport.queue_next(scripted_response(r#"{"result":"OK"}"#));
        client.send_msgs().await.unwrap();

        assert!(!client.outgoing_pool().unwrap().is_waiting());
    }

    #[tokio::test]
    async fn disconnect_clears_session_and_streaming_state() {
        let transport = MockTransport::new();
        transport.queue_next(scripted_response(r#"{"shash":"sid1"}"#));
        let mut client = SessionClient::new(ClientConfig::with_mode(crate::config::Mode::all()), transport.clone());
        client.authorize("a", "b", "c", serde_json::json!({})).await.unwrap();
        client.incoming_launch("cam1").await.unwrap();
        client.outgoing_prepare().await.unwrap();

        client.disconnect();

        assert_eq!(client.sid(), None);
        assert!(!client.is_launched());
        assert!(!client.is_prepared());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn send_media_record_uses_borrowed_body_without_copying() {
        let transport = MockTransport::new();
        transport.queue_next(scripted_response(r#"{"shash":"sid1"}"#));
        let mut client = SessionClient::new(ClientConfig::default(), transport.clone());
        client.authorize("a", "b", "c", serde_json::json!({})).await.unwrap();

        let payload = vec![1u8, 2, 3, 4];
        transport.queue_next(scripted_response(r#"{"result":"OK"}"#));
        client.send_media_record(&payload).await.unwrap();
    }
}
