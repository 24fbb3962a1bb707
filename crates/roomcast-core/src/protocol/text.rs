//! Text envelope (JSON).
//!
//! Requests keep `data` as `RawValue` so services parse it lazily into their
//! own types. Outbound frames are encoded once into `Bytes`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{Result, RoomcastError};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Inbound request envelope.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Protocol version.
    pub v: u8,
    /// Service name (e.g., "room").
    pub svc: String,
    /// Handler name within the service (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Request id. Absent for notifies, which expect no response.
    #[serde(default)]
    pub seq: Option<u64>,
    /// Optional payload, stored as raw JSON (lazy parsing).
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

impl Envelope {
    /// Parse `data` into a typed request body.
    pub fn parse_data<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let raw = self.data.as_ref().ok_or_else(|| {
            RoomcastError::BadRequest(format!("{}.{} requires data", self.svc, self.msg_type))
        })?;
        serde_json::from_str(raw.get()).map_err(|e| {
            RoomcastError::BadRequest(format!("{}.{} invalid data: {e}", self.svc, self.msg_type))
        })
    }
}

/// Decode one text frame into an envelope, rejecting unknown versions.
pub fn decode_envelope(buf: &[u8]) -> Result<Envelope> {
    let env: Envelope = serde_json::from_slice(buf)
        .map_err(|e| RoomcastError::BadRequest(format!("invalid envelope json: {e}")))?;
    if env.v != PROTOCOL_VERSION {
        return Err(RoomcastError::UnsupportedVersion);
    }
    Ok(env)
}

/// Outbound frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Push,
    Response,
    Error,
}

/// Owned outbound frame, as a client reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub v: u8,
    pub kind: FrameKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        serde_json::from_slice(buf)
            .map_err(|e| RoomcastError::BadRequest(format!("invalid frame json: {e}")))
    }
}

#[derive(Serialize)]
struct FrameRef<'a> {
    v: u8,
    kind: FrameKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
    data: &'a Value,
}

impl FrameRef<'_> {
    fn encode(&self) -> Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| RoomcastError::Internal(format!("json encode failed: {e}")))
    }
}

/// Encode a server push under `route`.
pub fn encode_push(route: &str, data: &Value) -> Result<Bytes> {
    FrameRef {
        v: PROTOCOL_VERSION,
        kind: FrameKind::Push,
        route: Some(route),
        seq: None,
        data,
    }
    .encode()
}

/// Encode the response to request `seq`.
pub fn encode_response(seq: u64, data: &Value) -> Result<Bytes> {
    FrameRef {
        v: PROTOCOL_VERSION,
        kind: FrameKind::Response,
        route: None,
        seq: Some(seq),
        data,
    }
    .encode()
}

/// Encode an error frame. `seq` is set when the error answers a request.
pub fn encode_error(seq: Option<u64>, err: &RoomcastError) -> Result<Bytes> {
    let data = serde_json::json!({
        "code": err.client_code().as_str(),
        "msg": err.to_string(),
    });
    FrameRef {
        v: PROTOCOL_VERSION,
        kind: FrameKind::Error,
        route: None,
        seq,
        data: &data,
    }
    .encode()
}
