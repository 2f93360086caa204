//! Realtime voice relay WebSocket
//!
//! The browser speaks the upstream realtime protocol directly; the gateway
//! is a relay, not a translator.
//!
//! ## Client → Upstream
//!
//! - Text frames are forwarded byte-for-byte
//! - `{"type": "test"}` is accepted and dropped
//! - Frames that are not JSON objects, and binary frames, are skipped
//!
//! ## Upstream → Client
//!
//! - Everything is forwarded verbatim except tool-call events
//! - `response.function_call_arguments.done` and `response.tool_calls` are
//!   answered by the gateway and never reach the client
//! - `response.done` is answered, then forwarded
//! - `{"type": "error", "error": {"message": ...}}` is sent when the session
//!   cannot start or goes idle

mod handler;
pub mod interceptor;
pub mod messages;
pub mod relay;

pub use handler::realtime_handler;
pub use interceptor::{Interception, ToolCallInterceptor};
pub use relay::{RelaySession, SessionPhase};
