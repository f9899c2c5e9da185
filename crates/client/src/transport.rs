//! The HTTP/2 transport contract this crate is generic over.
//!
//! The transport itself — TLS setup, multiplexed stream submission, the
//! DATA provider pump — is out of scope; this module only names the shape
//! a transport must have for [`SessionClient`](crate::session::SessionClient)
//! to drive it. Modeled as an async trait via `trait-variant`, the same
//! macro this corpus uses to generate a `Send`/non-`Send` pair for its own
//! transport-facing `Handler` trait.
//!
//! The original submits a stream once with a data-provider *callback* that
//! the transport's event loop pulls from indefinitely, and a separate
//! response callback that the loop pushes received bytes into. This crate
//! merges both halves into one [`StreamDriver`] per stream and drives the
//! pump itself, one tick at a time (`wait_for_response`/`wait_for_frame`
//! call [`Transport::pump`] in a loop) — so a driver only ever needs to be
//! borrowed for the duration of a single tick, never stored inside the
//! transport across calls. That sidesteps the lifetime-erasure machinery a
//! true callback-pull model would need (the kind of unsafe vtable trick
//! this corpus's own `StreamingReqBody` resorts to) while preserving the
//! same cooperative, single-request-in-flight scheduling model.

use std::fmt;

/// An HTTP/2 stream identifier.
pub type StreamId = u32;

/// Cooperative data-provider scheduling signals, distinct from errors.
///
/// `Wrote` is normal progress (with `eof` set on the provider's last
/// chunk), `Park` asks the transport to suspend the provider until
/// [`Transport::resume_data`] is called, and `KeepAlive` asks it to leave
/// the stream open without producing more data on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProviderResult {
    Wrote { len: usize, eof: bool },
    Park,
    KeepAlive,
}

/// Events a stream's driver receives from a [`Transport::pump`] tick.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A chunk of response/frame bytes arrived.
    Data(bytes::Bytes),
    /// `bytes` worth of a PUT body have been acknowledged sent.
    SendProgress { bytes: usize },
    /// The stream's response is complete (control-plane POST/GET).
    FrameComplete,
    /// The peer reset the stream.
    RstStream,
    /// The connection received GOAWAY; all streams are to be torn down.
    GoAway,
}

/// Drives one stream: supplies outbound body bytes (if any) and receives
/// inbound events. A single `StreamDriver` implementation covers both
/// halves so a [`Transport::pump`] tick only ever needs one mutable
/// borrow of the caller's state.
pub trait StreamDriver {
    /// Supplies bytes for an outstanding request/frame body. The default
    /// is "nothing to send", for streams with no outbound phase (GET).
    fn poll_data(&mut self, buf: &mut [u8]) -> DataProviderResult {
        let _ = buf;
        DataProviderResult::KeepAlive
    }

    fn on_event(&mut self, event: StreamEvent);
}

/// RST_STREAM error codes this crate submits (subset of HTTP/2's).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RstStreamCode {
    RefusedStream,
}

impl fmt::Display for RstStreamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefusedStream => f.write_str("REFUSED_STREAM"),
        }
    }
}

/// The transport contract: connect, submit GET/POST/PUT, pump a stream,
/// resume a parked provider, reset a stream, disconnect.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&mut self, server: &str) -> Result<(), Self::Error>;

    async fn submit_get(&mut self, path: &str) -> Result<StreamId, Self::Error>;

    async fn submit_post(&mut self, path: &str, content_length: usize) -> Result<StreamId, Self::Error>;

    async fn submit_put(&mut self, path: &str) -> Result<StreamId, Self::Error>;

    /// Runs one pump tick for `stream_id`, pulling from and pushing events
    /// into `driver`.
    async fn pump(&mut self, stream_id: StreamId, driver: &mut dyn StreamDriver) -> Result<(), Self::Error>;

    /// Wakes a data provider previously parked via [`DataProviderResult::Park`].
    async fn resume_data(&mut self, stream_id: StreamId);

    async fn submit_rst_stream(&mut self, stream_id: StreamId, code: RstStreamCode);

    fn is_connected(&self) -> bool;

    fn disconnect(&mut self);
}
