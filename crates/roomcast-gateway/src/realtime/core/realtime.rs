use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use roomcast_core::error::{Result, RoomcastError};

use super::session::Session;

/// Per-request context passed to services.
///
/// Carries the calling session and the request `seq`. A request is answered
/// at most once.
#[derive(Clone)]
pub struct RequestCtx {
    session: Arc<dyn Session>,
    seq: Option<u64>,
    responded: Arc<AtomicBool>,
}

impl RequestCtx {
    pub fn new(session: Arc<dyn Session>, seq: Option<u64>) -> Self {
        Self {
            session,
            seq,
            responded: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Answer the request. Notifies have nobody waiting, so the payload is
    /// dropped.
    pub fn respond<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let Some(seq) = self.seq else {
            tracing::trace!(session = self.session.id(), "notify, response dropped");
            return Ok(());
        };
        if self.responded.swap(true, Ordering::AcqRel) {
            return Err(RoomcastError::AlreadyResponded);
        }
        let data = serde_json::to_value(payload)
            .map_err(|e| RoomcastError::Internal(format!("response encode failed: {e}")))?;
        self.session.respond(seq, &data)
    }
}
