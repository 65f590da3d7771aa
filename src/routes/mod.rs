// HTTP + WebSocket routes over the snapshot store

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};

use crate::snapshot_store::SnapshotStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<SnapshotStore>,
    pub(crate) ws_network_connections: Arc<AtomicUsize>,
}

pub fn app(store: Arc<SnapshotStore>, ws_network_connections: Arc<AtomicUsize>) -> Router {
    let state = AppState {
        store,
        ws_network_connections,
    };
    Router::new()
        .route("/", get(|| async { "ifstat: interface traffic monitor" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/get_data", get(http::get_data_handler)) // GET /get_data
        .route("/ws/network", get(ws::ws_network)) // WS /ws/network
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
