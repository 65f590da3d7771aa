// GET handlers: version, latest snapshot

use axum::{extract::State, response::IntoResponse};

use super::AppState;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /get_data: latest published snapshot. Never waits on the poller.
pub(super) async fn get_data_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.store.get_snapshot().as_ref().clone())
}
