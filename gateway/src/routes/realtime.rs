//! Realtime WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::realtime::realtime_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Path of the relay WebSocket endpoint
pub const REALTIME_PATH: &str = "/ws/realtime";

/// Create the Realtime WebSocket router
///
/// # Endpoint
///
/// `GET /ws/realtime` - WebSocket upgrade into one relay session
///
/// # Example
///
/// ```json
/// // Gateway configures the upstream session, then the client streams audio
/// {"type": "input_audio_buffer.append", "audio": "<base64 pcm16>"}
///
/// // Upstream events are relayed back unchanged
/// {"type": "response.audio.delta", "delta": "<base64 pcm16>"}
/// ```
pub fn create_realtime_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(REALTIME_PATH, get(realtime_handler))
        .layer(TraceLayer::new_for_http())
}
