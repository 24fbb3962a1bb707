//! Axum router wiring (HTTP -> WS upgrade).
//!
//! Exposes the WebSocket upgrade on `gateway.ws_path`.

use axum::{routing::get, Router};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    let path = state.cfg().gateway.ws_path.clone();
    Router::new()
        .route(&path, get(transport::ws::ws_upgrade))
        .with_state(state)
}
