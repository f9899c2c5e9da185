//! JSON-RPC field names, result literals, and message shapes.
//!
//! Field names are kept as `&str` constants (rather than folded into
//! `#[serde(rename = ...)]` attributes scattered across request structs)
//! because several of them — `shash`, `stamp` — are reused across more than
//! one request/response shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FIELD_NAME: &str = "name";
pub const FIELD_PASS: &str = "pass";
pub const FIELD_DEVICE: &str = "device";
pub const FIELD_META: &str = "meta";
pub const FIELD_SHASH: &str = "shash";
pub const FIELD_MSG: &str = "msg";
pub const FIELD_MSGS: &str = "msgs";
pub const FIELD_DEVICES: &str = "devices";
pub const FIELD_RESULT: &str = "result";
pub const FIELD_CODE: &str = "code";
pub const FIELD_STAMP: &str = "stamp";
pub const FIELD_MID: &str = "mid";
pub const FIELD_TARGET: &str = "target";
pub const FIELD_PARAMS: &str = "params";
pub const FIELD_SUBPROTO: &str = "subproto";

pub const RESULT_OK: &str = "OK";
pub const RESULT_BAD: &str = "BAD";

/// The bootstrap value `last_stamp` is set to on a successful authorize,
/// before the first real `getMsgsAndSync` delta.
pub fn sync_stamp() -> Value {
    serde_json::json!({ "msg": "sync" })
}

/// One entry in the outgoing message pool.
///
/// Mirrors `om_add_msg`'s parameter set: a required `msg` kind plus four
/// optional fields. `#[serde(skip_serializing_if = "Option::is_none")]`
/// keeps absent fields out of the wire representation, matching the
/// original only ever writing fields it was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl OutgoingMessage {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into(), target: None, params: None, result: None, code: None }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

/// One entry delivered by `getMsgsAndSync`, as consumed by
/// [`IncomingPool::proceed`](crate::pools::IncomingPool::proceed).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomingMessage {
    pub device: Option<String>,
    pub msg: Option<String>,
    pub stamp: Option<Value>,
    pub params: Option<Value>,
}

impl IncomingMessage {
    /// `mid` lives nested inside `params`, not at the top level.
    pub fn mid(&self) -> Option<&str> {
        self.params.as_ref()?.get(FIELD_MID)?.as_str()
    }
}
