//! Bit-exact URL path builders for the seven endpoints this client drives.

use super::percent::percent_encode;

pub const AUTHORIZE: &str = "/authorize.json";
pub const GET_STREAMS: &str = "/getStreams.json";
pub const GET_MSGS_AND_SYNC: &str = "/getMsgsAndSync.json";
pub const ADD_MSGS: &str = "/addMsgs.json";

/// `/addRecord.json?shash=<PCT-ENCODED-SID>` — used by both
/// `send_media_record` (POST) and outgoing-stream `prepare` is a separate
/// path (`input.raw`, see [`input_raw`]); this one backs the one-shot
/// `send_media_record` POST.
pub fn add_record(sid: &str) -> String {
    format!("/addRecord.json?shash={}", percent_encode(sid))
}

/// `/output.raw?shash=<SID>&device=<DEVICE>` — the inbound device stream.
pub fn output_raw(sid: &str, device: &str) -> String {
    format!("/output.raw?shash={}&device={}", percent_encode(sid), percent_encode(device))
}

/// `/input.raw?shash=<SID>` — the outbound media-record stream.
pub fn input_raw(sid: &str) -> String {
    format!("/input.raw?shash={}", percent_encode(sid))
}
