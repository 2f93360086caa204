//! Relay message routing types
//!
//! Client frames are forwarded upstream as opaque text. The only frames the
//! relay produces itself are the error notification sent to the client and
//! the tool results injected upstream.

use bytes::Bytes;
use serde::Serialize;

use crate::core::realtime::openai::messages::EventTag;
use crate::core::realtime::{ClientEvent, RealtimeError};

/// Channel buffer size for each socket writer
pub const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
pub const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
pub const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Client frame `type` that is accepted and discarded.
pub const NO_OP_FRAME_TYPE: &str = "test";

// =============================================================================
// Outgoing error
// =============================================================================

/// `{"type": "error", "error": {"message": ...}}` sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionErrorMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    pub error: SessionErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionErrorBody {
    pub message: String,
}

impl SessionErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            error: SessionErrorBody {
                message: message.into(),
            },
        }
    }

    /// Client-facing message for a fatal session error.
    pub fn from_realtime_error(err: &RealtimeError) -> Self {
        if err.is_configuration() {
            Self::new(err.to_string())
        } else {
            Self::new(format!("Voice service unavailable: {err}"))
        }
    }

    pub fn idle_timeout() -> Self {
        Self::new("Connection closed due to inactivity")
    }
}

// =============================================================================
// Message Routing
// =============================================================================

/// Frames queued for the client writer.
#[derive(Debug)]
pub enum ClientRoute {
    /// Upstream text frame, verbatim
    Text(String),
    /// Upstream binary frame, verbatim
    Binary(Bytes),
    /// Error notification generated by the relay
    Error(SessionErrorMessage),
    /// Close connection
    Close,
}

/// Frames queued for the upstream writer.
#[derive(Debug)]
pub enum UpstreamRoute {
    /// Client text frame, verbatim
    Text(String),
    /// Event generated by the relay (handshake, tool results)
    Event(ClientEvent),
    /// Reply to an upstream ping
    Pong(Bytes),
    /// Close connection
    Close,
}

// =============================================================================
// Client frame classification
// =============================================================================

/// What the relay does with one client text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFrameKind {
    /// Declared no-op; dropped silently
    NoOp,
    Forward,
    /// Not a JSON object; skipped
    Malformed,
}

impl ClientFrameKind {
    pub fn classify(text: &str) -> Self {
        match EventTag::parse(text) {
            Ok(tag) if tag.kind() == Some(NO_OP_FRAME_TYPE) => Self::NoOp,
            Ok(_) => Self::Forward,
            Err(_) => Self::Malformed,
        }
    }
}
