//! Route construction

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{api, voice};
use crate::state::AppState;

/// Create the REST API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/voices", get(api::list_voices))
        .layer(TraceLayer::new_for_http())
}

/// Create the WebSocket router for voice sessions
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(voice::voice_session_handler))
}
