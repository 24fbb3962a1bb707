//! Process lifecycle: acceptors and reporter up, then down in reverse.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use roomcast_core::error::{Result, RoomcastError};

use crate::app_state::AppState;
use crate::realtime::Reporter;
use crate::{router, transport};

/// A running gateway.
pub struct Server {
    state: AppState,
    ws_addr: SocketAddr,
    tcp_addr: Option<SocketAddr>,
    stop: watch::Sender<bool>,
    ws_task: JoinHandle<()>,
    tcp_task: Option<JoinHandle<()>>,
    reporter: Reporter,
}

impl Server {
    /// Bind the acceptors and start the reporter.
    pub async fn start(state: AppState) -> Result<Self> {
        let gw = &state.cfg().gateway;
        let (stop, stopped) = watch::channel(false);

        let ws_listener = bind(gw.listen_addr()?).await?;
        let ws_addr = local_addr(&ws_listener)?;
        let app = router::build_router(state.clone());
        let mut ws_stopped = stopped.clone();
        let ws_task = tokio::spawn(async move {
            let res = axum::serve(ws_listener, app)
                .with_graceful_shutdown(async move {
                    loop {
                        let stop = *ws_stopped.borrow_and_update();
                        if stop || ws_stopped.changed().await.is_err() {
                            break;
                        }
                    }
                })
                .await;
            if let Err(e) = res {
                tracing::error!(error = %e, "ws acceptor failed");
            }
        });
        tracing::info!(%ws_addr, path = %gw.ws_path, "ws acceptor listening");

        let (tcp_addr, tcp_task) = match gw.tcp_listen_addr()? {
            Some(addr) => {
                let listener = bind(addr).await?;
                let addr = local_addr(&listener)?;
                let task = tokio::spawn(transport::tcp::serve(state.clone(), listener, stopped));
                tracing::info!(tcp_addr = %addr, "tcp acceptor listening");
                (Some(addr), Some(task))
            }
            None => (None, None),
        };

        let every = Duration::from_millis(state.cfg().room.report_interval_ms);
        let reporter = Reporter::spawn(state.clone(), every);

        Ok(Self {
            state,
            ws_addr,
            tcp_addr,
            stop,
            ws_task,
            tcp_task,
            reporter,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        self.tcp_addr
    }

    /// Stop the reporter, then the acceptors, then release sessions and the
    /// room.
    pub async fn shutdown(self) {
        self.reporter.stop().await;

        let _ = self.stop.send(true);
        // Upgraded WS connections are not tracked by axum; closing the
        // sessions below ends their loops.
        self.state.shutdown();

        if let Some(task) = self.tcp_task {
            let _ = task.await;
        }
        let _ = self.ws_task.await;
        tracing::info!("roomcast-gateway stopped");
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| RoomcastError::Internal(format!("bind {addr} failed: {e}")))
}

fn local_addr(listener: &TcpListener) -> Result<SocketAddr> {
    listener
        .local_addr()
        .map_err(|e| RoomcastError::Internal(format!("local_addr failed: {e}")))
}
