//! Error types for the session client.
//!
//! Layered the way this corpus layers its own protocol errors (see
//! `HttpError`/`ParseError`/`SendError`): [`ClientError`] is the top-level
//! type every public [`SessionClient`](crate::session::SessionClient)
//! operation returns, wrapping [`FrameError`] (parser layer) and
//! [`ProtocolError`] (server response layer) via `#[from]` so call sites
//! propagate with `?`.

use thiserror::Error;

/// Top-level error returned by all public session operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport is not connected (no active HTTP/2 session).
    #[error("not connected")]
    NotConnected,

    /// The operation's preconditions were not met (no sid, wrong mode, no
    /// last_stamp). No side effects occur when this is returned.
    #[error("invalid state: {reason}")]
    InvalidState { reason: &'static str },

    /// The server responded but `result` was not `"OK"`, or a required
    /// field was missing. The session is not torn down; callers may retry.
    #[error("protocol error: {source}")]
    Protocol {
        #[from]
        source: ProtocolError,
    },

    /// The media frame parser rejected the stream.
    #[error("frame error: {source}")]
    Frame {
        #[from]
        source: FrameError,
    },

    /// The response body could not be parsed at all, despite the
    /// connection being alive (distinct from a well-formed `"BAD"` result).
    #[error("internal error: {0}")]
    Internal(String),

    /// The server closed the stream without sending any response bytes.
    #[error("empty response")]
    EmptyResponse,
}

impl ClientError {
    pub fn invalid_state(reason: &'static str) -> Self {
        Self::InvalidState { reason }
    }

    pub fn internal<S: ToString>(reason: S) -> Self {
        Self::Internal(reason.to_string())
    }

    /// The flat numeric/categorical code the original API surfaced to
    /// callers, for bridging code that still branches on the old taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotConnected => ErrorCode::NotConnected,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::Protocol { .. } => ErrorCode::Protocol,
            Self::Frame { .. } => ErrorCode::InvalidResponse,
            Self::Internal(_) => ErrorCode::Internal,
            Self::EmptyResponse => ErrorCode::EmptyResponse,
        }
    }
}

/// The original's flat error-code namespace, preserved for callers that
/// need to branch on it rather than match on [`ClientError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Ok,
    EmptyResponse,
    NotConnected,
    Protocol,
    Internal,
    InvalidState,
    InvalidArg,
    InvalidResponse,
    NoMem,
}

/// A well-formed server response whose `result` was not `"OK"`.
#[derive(Debug, Error)]
#[error("server rejected request: {code}{}", message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default())]
pub struct ProtocolError {
    pub code: ServerErrorCode,
    pub message: Option<String>,
}

impl ProtocolError {
    pub fn new(code: ServerErrorCode, message: Option<String>) -> Self {
        Self { code, message }
    }
}

/// The server-side error taxonomy, propagated verbatim from the original
/// `REST_RESPONSE_ERRORS` table (indices 0..12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorCode {
    NoError,
    Unspecified,
    InternalUnknownError,
    DatabaseFail,
    JsonParserFail,
    JsonFail,
    NoSuchSession,
    NoSuchUser,
    NoDevicesOnline,
    NoSuchRecord,
    NoDataReturned,
    EmptyRequest,
    MalformedRequest,
}

impl ServerErrorCode {
    /// Maps a server-supplied numeric `code` field to its taxonomy entry,
    /// falling back to `Unspecified` for anything outside the known range —
    /// the same fallback the original uses when the code is absent.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::NoError,
            2 => Self::InternalUnknownError,
            3 => Self::DatabaseFail,
            4 => Self::JsonParserFail,
            5 => Self::JsonFail,
            6 => Self::NoSuchSession,
            7 => Self::NoSuchUser,
            8 => Self::NoDevicesOnline,
            9 => Self::NoSuchRecord,
            10 => Self::NoDataReturned,
            11 => Self::EmptyRequest,
            12 => Self::MalformedRequest,
            _ => Self::Unspecified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoError => "NO_ERROR",
            Self::Unspecified => "UNSPECIFIED",
            Self::InternalUnknownError => "INTERNAL_UNKNOWN_ERROR",
            Self::DatabaseFail => "DATABASE_FAIL",
            Self::JsonParserFail => "JSON_PARSER_FAIL",
            Self::JsonFail => "JSON_FAIL",
            Self::NoSuchSession => "NO_SUCH_SESSION",
            Self::NoSuchUser => "NO_SUCH_USER",
            Self::NoDevicesOnline => "NO_DEVICES_ONLINE",
            Self::NoSuchRecord => "NO_SUCH_RECORD",
            Self::NoDataReturned => "NO_DATA_RETURNED",
            Self::EmptyRequest => "EMPTY_REQUEST",
            Self::MalformedRequest => "MALFORMED_REQUEST",
        }
    }
}

impl std::fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while parsing the binary media frame stream.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The 2-byte magic at the start of a frame header was not `0xAAAA`.
    #[error("malformed frame header: expected magic 0xAAAA, got {magic:#06x}")]
    MalformedHeader { magic: u16 },

    /// The header declared a body larger than the parser's working buffer
    /// can ever hold.
    #[error("oversize frame body: {body_size} exceeds max {max}")]
    OversizeBody { body_size: u32, max: u32 },

    /// The working buffer is full and no further bytes can be buffered
    /// until a complete frame is drained.
    #[error("frame parser buffer overflow")]
    BufferOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_code_round_trips_known_indices() {
        for (code, expected) in [
            (0, ServerErrorCode::NoError),
            (7, ServerErrorCode::NoSuchUser),
            (12, ServerErrorCode::MalformedRequest),
        ] {
            assert_eq!(ServerErrorCode::from_code(code), expected);
        }
    }

    #[test]
    fn server_error_code_falls_back_to_unspecified() {
        assert_eq!(ServerErrorCode::from_code(99), ServerErrorCode::Unspecified);
        assert_eq!(ServerErrorCode::from_code(1), ServerErrorCode::Unspecified);
    }

    #[test]
    fn client_error_code_maps_variants() {
        assert_eq!(ClientError::NotConnected.code(), ErrorCode::NotConnected);
        assert_eq!(ClientError::invalid_state("no sid").code(), ErrorCode::InvalidState);
    }
}
