//! OpenAI Realtime API integration.
//!
//! The gateway does not drive a conversation itself. It obtains a short-lived
//! client secret, opens the upstream stream, and relays events between the
//! browser and OpenAI while answering function calls locally.
//!
//! # Protocol
//!
//! Realtime v1 (`OpenAI-Beta: realtime=v1`) over WebSocket. Audio is PCM 16-bit
//! signed little-endian at 24kHz in both directions.
//!
//! # Example
//!
//! ```rust,ignore
//! use policy_voice_gateway::core::realtime::openai::{
//!     CredentialProvider, CredentialRequest, OpenAISessionCredentials, connect_upstream,
//! };
//!
//! let provider = OpenAISessionCredentials::new(Some("sk-...".to_string()));
//! let credential = provider
//!     .issue(&CredentialRequest::new("gpt-realtime", "shimmer", tools))
//!     .await?;
//! let stream = connect_upstream(OPENAI_REALTIME_URL, "gpt-realtime", &credential).await?;
//! ```

mod config;
mod credentials;
pub mod messages;
mod upstream;

pub use config::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TRANSCRIPTION_MODEL, Modality, OPENAI_BETA_HEADER,
    OPENAI_REALTIME_SESSIONS_URL, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeVoice,
};
pub use credentials::{
    CredentialProvider, CredentialRequest, OpenAISessionCredentials, UpstreamCredential,
};
pub use messages::{
    ClientEvent, ConversationItem, FunctionCall, InputAudioTranscription, MaxTokens,
    ResponseConfig, ServerEvent, SessionConfig, ToolDef, TurnDetection, UpstreamEventKind,
};
pub use upstream::{UpstreamStream, build_upstream_url, connect_upstream};
