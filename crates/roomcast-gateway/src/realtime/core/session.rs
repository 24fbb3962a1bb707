use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use tokio::sync::mpsc::error::TrySendError;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::text::{encode_error, encode_push, encode_response};

/// Process-unique connection handle.
pub type SessionId = u64;

/// Callback run once when a session closes.
pub type CloseHook = Box<dyn FnOnce() + Send + 'static>;

/// Result of binding a uid to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The session was unbound and now carries this uid.
    Bound(Arc<str>),
    /// The session already carried a uid; it is kept.
    AlreadyBound(Arc<str>),
}

impl BindOutcome {
    pub fn uid(&self) -> &Arc<str> {
        match self {
            BindOutcome::Bound(uid) | BindOutcome::AlreadyBound(uid) => uid,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, BindOutcome::Bound(_))
    }
}

/// Capabilities a service may use on one client connection.
///
/// Delivery calls never block: they either queue the frame or fail with
/// `SessionClosed` / `Backpressure`.
pub trait Session: Send + Sync {
    fn id(&self) -> SessionId;

    /// Bound uid, if any.
    fn uid(&self) -> Option<Arc<str>>;

    /// Unbound -> Bound, at most once. Binding an already bound session keeps
    /// the existing uid and reports `AlreadyBound`.
    fn bind(&self, uid: &str) -> Result<BindOutcome>;

    /// Fire-and-forget server push.
    fn push(&self, route: &str, data: &Value) -> Result<()>;

    /// Queue an already encoded push frame.
    fn push_frame(&self, frame: Bytes) -> Result<()>;

    /// Answer request `seq`.
    fn respond(&self, seq: u64, data: &Value) -> Result<()>;

    /// Register a hook run when the session closes. Hooks registered after
    /// close run immediately on the caller.
    fn on_close(&self, hook: CloseHook);

    fn is_closed(&self) -> bool;
}

/// Close hooks with a single-fire guard.
#[derive(Default)]
pub struct CloseHooks {
    fired: AtomicBool,
    hooks: Mutex<Vec<CloseHook>>,
}

impl CloseHooks {
    fn lock(&self) -> MutexGuard<'_, Vec<CloseHook>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, hook: CloseHook) {
        {
            // `fired` only flips under this lock, so a hook is either queued
            // before `fire` drains the list or run here.
            let mut hooks = self.lock();
            if !self.fired.load(Ordering::Acquire) {
                hooks.push(hook);
                return;
            }
        }
        hook();
    }

    /// Run every registered hook. Returns false if already fired.
    pub fn fire(&self) -> bool {
        let hooks = {
            let mut hooks = self.lock();
            if self.fired.swap(true, Ordering::AcqRel) {
                return false;
            }
            std::mem::take(&mut *hooks)
        };
        for hook in hooks {
            hook();
        }
        true
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Session backed by a bounded outbound queue drained by the transport writer.
pub struct SessionHandle {
    id: SessionId,
    uid: OnceLock<Arc<str>>,
    tx: mpsc::Sender<Bytes>,
    close_hooks: CloseHooks,
    closed_signal: Notify,
}

impl SessionHandle {
    pub fn new(id: SessionId, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            uid: OnceLock::new(),
            tx,
            close_hooks: CloseHooks::default(),
            closed_signal: Notify::new(),
        }
    }

    /// Mark the session closed and run its close hooks. Idempotent; returns
    /// true only for the call that actually closed it.
    pub fn close(&self) -> bool {
        let fired = self.close_hooks.fire();
        if fired {
            // One transport loop waits on this; `notify_one` keeps the permit
            // if it is not parked yet.
            self.closed_signal.notify_one();
            tracing::debug!(session = self.id, "session closed");
        }
        fired
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        if self.close_hooks.is_fired() {
            return;
        }
        self.closed_signal.notified().await;
    }

    /// Best-effort error frame. Failures are only logged.
    pub fn send_error(&self, seq: Option<u64>, err: &RoomcastError) {
        let res = encode_error(seq, err).and_then(|frame| self.enqueue(frame));
        if let Err(e) = res {
            tracing::debug!(session = self.id, error = %e, "error frame not delivered");
        }
    }

    fn enqueue(&self, frame: Bytes) -> Result<()> {
        if self.close_hooks.is_fired() {
            return Err(RoomcastError::SessionClosed(self.id));
        }
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => RoomcastError::Backpressure(self.id),
            TrySendError::Closed(_) => RoomcastError::SessionClosed(self.id),
        })
    }
}

impl Session for SessionHandle {
    fn id(&self) -> SessionId {
        self.id
    }

    fn uid(&self) -> Option<Arc<str>> {
        self.uid.get().cloned()
    }

    fn bind(&self, uid: &str) -> Result<BindOutcome> {
        if uid.is_empty() {
            return Err(RoomcastError::BadRequest("uid must not be empty".into()));
        }
        let candidate: Arc<str> = Arc::from(uid);
        match self.uid.set(Arc::clone(&candidate)) {
            Ok(()) => Ok(BindOutcome::Bound(candidate)),
            Err(_) => {
                let existing = self
                    .uid
                    .get()
                    .cloned()
                    .ok_or_else(|| RoomcastError::Internal("uid lost after bind".into()))?;
                Ok(BindOutcome::AlreadyBound(existing))
            }
        }
    }

    fn push(&self, route: &str, data: &Value) -> Result<()> {
        self.enqueue(encode_push(route, data)?)
    }

    fn push_frame(&self, frame: Bytes) -> Result<()> {
        self.enqueue(frame)
    }

    fn respond(&self, seq: u64, data: &Value) -> Result<()> {
        self.enqueue(encode_response(seq, data)?)
    }

    fn on_close(&self, hook: CloseHook) {
        self.close_hooks.register(hook);
    }

    fn is_closed(&self) -> bool {
        self.close_hooks.is_fired() || self.tx.is_closed()
    }
}
