//! Helpers shared by the gateway integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use roomcast_core::protocol::text::{Frame, FrameKind};
use roomcast_gateway::realtime::{RequestCtx, Session, SessionHandle};

pub fn session(id: u64) -> (Arc<SessionHandle>, mpsc::Receiver<Bytes>) {
    let (tx, rx) = mpsc::channel(64);
    (Arc::new(SessionHandle::new(id, tx)), rx)
}

pub fn ctx(s: &Arc<SessionHandle>, seq: Option<u64>) -> RequestCtx {
    RequestCtx::new(Arc::clone(s) as Arc<dyn Session>, seq)
}

/// Everything queued for a session so far.
pub fn drain(rx: &mut mpsc::Receiver<Bytes>) -> Vec<Frame> {
    let mut out = Vec::new();
    while let Ok(b) = rx.try_recv() {
        out.push(Frame::decode(&b).unwrap());
    }
    out
}

pub fn pushes<'a>(frames: &'a [Frame], route: &'a str) -> Vec<&'a Frame> {
    frames
        .iter()
        .filter(|f| f.kind == FrameKind::Push && f.route.as_deref() == Some(route))
        .collect()
}

pub fn responses(frames: &[Frame]) -> Vec<&Frame> {
    frames
        .iter()
        .filter(|f| f.kind == FrameKind::Response)
        .collect()
}
