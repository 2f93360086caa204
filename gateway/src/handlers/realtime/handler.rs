//! Realtime WebSocket handler
//!
//! Upgrades `/ws/realtime` and hands the socket to a [`RelaySession`]. The
//! connection slot reserved by the connection-limit middleware is released
//! when the session ends, or immediately if the upgrade fails.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::middleware::ClientIp;
use crate::state::AppState;

use super::messages::{MAX_WS_FRAME_SIZE, MAX_WS_MESSAGE_SIZE};
use super::relay::RelaySession;

/// Realtime WebSocket handler
///
/// # Arguments
/// * `ws` - The WebSocket upgrade request from Axum
/// * `state` - Application state
/// * `client_ip` - Address whose connection slot was reserved, if any
pub async fn realtime_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let session_id = Uuid::new_v4();
    let client_ip = client_ip.map(|Extension(ip)| ip);
    info!(session_id = %session_id, client_ip = ?client_ip, "Realtime WebSocket connection upgrade requested");

    let failed_state = state.clone();
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_failed_upgrade(move |e| {
            warn!(session_id = %session_id, "WebSocket upgrade failed: {}", e);
            if let Some(ClientIp(ip)) = client_ip {
                failed_state.release_connection(ip);
            }
        })
        .on_upgrade(move |socket| async move {
            let phase = RelaySession::new(state.clone(), session_id).run(socket).await;
            if let Some(ClientIp(ip)) = client_ip {
                state.release_connection(ip);
            }
            info!(session_id = %session_id, phase = phase.as_str(), "Realtime WebSocket connection terminated");
        })
}
