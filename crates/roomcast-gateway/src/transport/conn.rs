//! Transport-independent connection lifecycle.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::app_state::AppState;
use crate::realtime::{RequestCtx, Session, SessionHandle};
use crate::transport::codec;

/// Allocate and register a session. The receiver is the transport writer's
/// outbound queue.
pub fn open(app: &AppState) -> (Arc<SessionHandle>, mpsc::Receiver<Bytes>) {
    let (tx, rx) = mpsc::channel(app.cfg().gateway.outbound_queue);
    let session = Arc::new(SessionHandle::new(app.sessions().next_id(), tx));
    app.sessions().insert(Arc::clone(&session));
    (session, rx)
}

/// Decode and dispatch one inbound frame. Errors are reported back to the
/// client as error frames, never propagated to the read loop.
pub async fn handle_frame(app: &AppState, session: &Arc<SessionHandle>, raw: Bytes) {
    let env = match codec::decode(app, session.id(), raw) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(error = %e, "inbound frame rejected");
            session.send_error(None, &e);
            return;
        }
    };

    let seq = env.seq;
    let route = format!("{}.{}", env.svc, env.msg_type);
    let ctx = RequestCtx::new(Arc::clone(session) as Arc<dyn Session>, seq);
    if let Err(e) = app.dispatcher().dispatch_text(ctx, env).await {
        tracing::warn!(%route, error = %e, "handler failed");
        session.send_error(seq, &e);
    }
}

/// Deregister and close. Runs the session's close hooks.
pub fn close(app: &AppState, session: &SessionHandle) {
    app.sessions().remove(session.id());
    session.close();
}
