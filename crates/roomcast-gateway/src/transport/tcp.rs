//! Plain TCP acceptor: one JSON envelope per line in both directions.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::Instrument;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::text::encode_error;

use crate::app_state::AppState;
use crate::realtime::{Session, SessionHandle};
use crate::transport::{codec, conn};

/// Accept until `shutdown` flips to true.
pub async fn serve(app: AppState, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(run_session(app.clone(), stream, peer));
                }
                Err(e) => tracing::warn!(error = %e, "tcp accept failed"),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("tcp acceptor stopped");
}

async fn run_session(app: AppState, stream: TcpStream, peer: SocketAddr) {
    let (session, out_rx) = conn::open(&app);
    let span = tracing::info_span!("session", id = session.id(), transport = "tcp", %peer);
    async {
        tracing::debug!("connected");
        if let Err(e) = drive(&app, &session, stream, out_rx).await {
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
    stream: TcpStream,
    mut out_rx: mpsc::Receiver<Bytes>,
) -> Result<()> {
    let (rd, mut wr) = stream.into_split();
    let max = app.cfg().gateway.max_frame_bytes;
    let mut lines = FramedRead::new(rd, LinesCodec::new_with_max_length(max));

    // Only inbound lines push the deadline out; pushes to a silent client do not.
    let idle_timeout = Duration::from_millis(app.cfg().gateway.idle_timeout_ms);
    let idle = sleep_until(Instant::now() + idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            maybe_out = out_rx.recv() => {
                let Some(frame) = maybe_out else { break; };
                write_frame(app, session, &mut wr, frame).await?;
            }

            line = lines.next() => {
                let Some(line) = line else { break; };
                idle.as_mut().reset(Instant::now() + idle_timeout);
                let line = match line {
                    Ok(line) => line,
                    Err(LinesCodecError::MaxLineLengthExceeded) => {
                        tracing::info!(max, "line too long, closing");
                        let err = RoomcastError::PayloadTooLarge { len: max + 1, max };
                        write_frame(app, session, &mut wr, encode_error(None, &err)?).await?;
                        break;
                    }
                    Err(LinesCodecError::Io(e)) => return Err(io_err(e)),
                };
                if line.trim().is_empty() {
                    continue;
                }
                conn::handle_frame(app, session, Bytes::from(line)).await;
            }

            () = &mut idle => {
                tracing::info!("idle timeout");
                break;
            }

            _ = session.closed() => break,
        }
    }

    let _ = wr.shutdown().await;
    Ok(())
}

async fn write_frame(
    app: &AppState,
    session: &SessionHandle,
    wr: &mut OwnedWriteHalf,
    frame: Bytes,
) -> Result<()> {
    let frame = match codec::encode_outbound(app, session.id(), frame) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "outbound frame dropped");
            return Ok(());
        }
    };
    wr.write_all(&frame).await.map_err(io_err)?;
    wr.write_all(b"\n").await.map_err(io_err)
}

fn io_err(e: std::io::Error) -> RoomcastError {
    RoomcastError::Internal(format!("tcp io failed: {e}"))
}
