//! Base error types for the upstream realtime connection.
//!
//! Every failure on the way to an established upstream stream (credential
//! exchange, WebSocket handshake, wire encoding) is reported as a
//! [`RealtimeError`]. Errors raised here are fatal to the session that
//! triggered them; payload-level problems are handled by the tool dispatcher
//! and never surface as a `RealtimeError`.

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while establishing or driving an upstream session.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The provider rejected our credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Missing or invalid configuration (API key, credential payload)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Provider returned something we could not use
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl RealtimeError {
    /// Whether this error belongs to the configuration class.
    ///
    /// Configuration errors are reported to the client verbatim; transport
    /// errors are reported with a generic prefix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::AuthenticationFailed(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocketError(err.to_string())
    }
}

impl From<serde_json::Error> for RealtimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;
