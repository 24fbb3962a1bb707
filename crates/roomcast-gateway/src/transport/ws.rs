//! WebSocket acceptor.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS on the configured path
//! - Register a session and drain its outbound queue through the outbound
//!   pipeline
//! - Lifecycle: ping + idle timeout, close hooks on any exit path
//! - Hand every data frame (text or binary) to `conn::handle_frame`

use std::sync::Arc;

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::Instrument;

use roomcast_core::error::{Result, RoomcastError};

use crate::app_state::AppState;
use crate::realtime::{Session, SessionHandle};
use crate::transport::codec::{self, Inbound};
use crate::transport::conn;

pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_session(app, socket))
}

async fn run_session(app: AppState, socket: WebSocket) {
    let (session, out_rx) = conn::open(&app);
    let span = tracing::info_span!("session", id = session.id(), transport = "ws");
    async {
        tracing::debug!("connected");
        if let Err(e) = drive(&app, &session, socket, out_rx).await {
            tracing::debug!(error = %e, "session ended with error");
        }
        conn::close(&app, &session);
        tracing::debug!("disconnected");
    }
    .instrument(span)
    .await
}

async fn drive(
    app: &AppState,
    session: &Arc<SessionHandle>,
    socket: WebSocket,
    mut out_rx: mpsc::Receiver<Bytes>,
) -> Result<()> {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let gw = &app.cfg().gateway;
    let ping_every = Duration::from_millis(gw.ping_interval_ms);
    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(frame) = maybe_out else { break; };
                let msg = match codec::encode_outbound(app, session.id(), frame)
                    .and_then(codec::to_ws_message)
                {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::warn!(error = %e, "outbound frame dropped");
                        continue;
                    }
                };
                ws_tx
                    .send(msg)
                    .await
                    .map_err(|e| RoomcastError::Internal(format!("ws send failed: {e}")))?;
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break; };
                let msg = incoming
                    .map_err(|e| RoomcastError::Internal(format!("ws recv failed: {e}")))?;
                last_activity = Instant::now();

                match codec::classify(msg) {
                    Inbound::Data(raw) => conn::handle_frame(app, session, raw).await,
                    Inbound::Ping(payload) => {
                        let _ = ws_tx.send(Message::Pong(payload)).await;
                    }
                    Inbound::Pong => {}
                    Inbound::Close => break,
                }
            }

            _ = session.closed() => break,

            _ = ping_tick.tick() => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!("idle timeout");
                    break;
                }
                let _ = ws_tx.send(Message::Ping(Vec::new())).await;
            }
        }
    }

    let _ = ws_tx.close().await;
    Ok(())
}
