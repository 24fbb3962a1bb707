//! Frame codec shared by the acceptors.
//!
//! - Inbound: size check, inbound pipeline, then decode once into an
//!   `Envelope` (lazy `RawValue` for data).
//! - Outbound: encoded frames go through the outbound pipeline before the
//!   transport writes them.

use axum::extract::ws::Message;
use bytes::Bytes;

use roomcast_core::{
    error::{Result, RoomcastError},
    protocol::text::{self, Envelope},
};

use crate::app_state::AppState;
use crate::realtime::SessionId;

/// Inbound WS frame, classified before decode.
#[derive(Debug)]
pub enum Inbound {
    Data(Bytes),
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn classify(msg: Message) -> Inbound {
    match msg {
        Message::Text(s) => Inbound::Data(Bytes::from(s)),
        Message::Binary(b) => Inbound::Data(Bytes::from(b)),
        Message::Ping(v) => Inbound::Ping(v),
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    }
}

pub fn decode(app: &AppState, session: SessionId, raw: Bytes) -> Result<Envelope> {
    let max = app.cfg().gateway.max_frame_bytes;
    if raw.len() > max {
        return Err(RoomcastError::PayloadTooLarge { len: raw.len(), max });
    }
    let raw = app.pipeline().inbound.process(session, raw)?;
    text::decode_envelope(&raw)
}

pub fn encode_outbound(app: &AppState, session: SessionId, frame: Bytes) -> Result<Bytes> {
    app.pipeline().outbound.process(session, frame)
}

/// Outbound frames are JSON, so they go out as WS text.
pub fn to_ws_message(frame: Bytes) -> Result<Message> {
    String::from_utf8(frame.to_vec())
        .map(Message::Text)
        .map_err(|e| RoomcastError::Internal(format!("outbound frame not utf8: {e}")))
}
