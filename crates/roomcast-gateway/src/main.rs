//! roomcast gateway
//!
//! - WebSocket acceptor on gateway.listen + gateway.ws_path
//! - Optional line-delimited TCP acceptor on gateway.tcp_listen
//! - `room` service: join / message
//! - Periodic room/traffic report

use tracing_subscriber::{fmt, EnvFilter};

use roomcast_gateway::{app_state::AppState, config, server::Server};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "roomcast.yaml".to_string());
    if let Err(e) = run(&path).await {
        tracing::error!(error = %e, config = %path, "roomcast-gateway failed");
        std::process::exit(1);
    }
}

async fn run(path: &str) -> roomcast_core::Result<()> {
    let cfg = config::load_from_file(path)?;
    let state = AppState::new(cfg)?;
    let server = Server::start(state).await?;
    tracing::info!("roomcast-gateway started");

    shutdown_signal().await;
    server.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
