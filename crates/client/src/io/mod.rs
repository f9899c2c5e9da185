//! Transient per-request buffer state: the bytes about to be sent, and the
//! bytes accumulated in response.
//!
//! # Components
//!
//! - [`RequestBodySource`]: an owned-or-borrowed view over the bytes being
//!   sent, with a read cursor the data provider drains chunk by chunk.
//! - [`ResponseSink`]: a growable, capacity-capped accumulator for the
//!   control-plane response.

mod request_body;
mod response_sink;

pub use request_body::RequestBodySource;
pub use response_sink::ResponseSink;
