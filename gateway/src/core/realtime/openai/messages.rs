//! OpenAI Realtime API WebSocket message types.
//!
//! The gateway is a relay, so it only models the events it produces or must
//! look inside. Everything else crosses the relay as opaque text.
//!
//! # Protocol Overview
//!
//! Client events the gateway produces:
//! - session.update - Declare the session configuration and tools
//! - conversation.item.create - Return a function call result
//! - response.create - Ask the model to continue
//!
//! Server events the gateway inspects:
//! - error - Logged, then forwarded
//! - response.done - Scanned for `function_call` output items
//! - response.function_call_arguments.done - One completed function call
//! - response.tool_calls - Legacy batched function calls
//!
//! All other server events are classified as [`UpstreamEventKind::PassThrough`]
//! from their `type` tag alone.

use std::borrow::Cow;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::config::{Modality, OpenAIRealtimeAudioFormat};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for OpenAI Realtime API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<OpenAIRealtimeAudioFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<OpenAIRealtimeAudioFormat>,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Tool definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum response output tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<MaxTokens>,
}

/// Maximum tokens configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxTokens {
    /// Specific number of tokens
    Number(u32),
    /// Infinite tokens
    Infinite(String), // "inf"
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
        /// Whether to create response on turn end
        #[serde(skip_serializing_if = "Option::is_none")]
        create_response: Option<bool>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

impl TurnDetection {
    /// Server VAD with every parameter left to the provider.
    pub fn server_vad_defaults() -> Self {
        Self::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
            create_response: None,
        }
    }
}

/// Tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function parameters JSON schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item, used for outgoing function results and for the
/// output list of `response.done`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type
    #[serde(rename = "type", default)]
    pub item_type: String,
    /// Item status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Call ID for function call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Function name for function call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function arguments for function call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Function output for function call result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ConversationItem {
    pub const FUNCTION_CALL: &'static str = "function_call";
    pub const FUNCTION_CALL_OUTPUT: &'static str = "function_call_output";
}

// =============================================================================
// Response Configuration
// =============================================================================

/// Response configuration for creating responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Response modalities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,
    /// Per-response instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events the gateway sends to the OpenAI Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: Box<SessionConfig>,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response configuration
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },
}

impl ClientEvent {
    /// Build the `conversation.item.create` carrying a function call result.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ConversationItemCreate {
            item: ConversationItem {
                item_type: ConversationItem::FUNCTION_CALL_OUTPUT.to_string(),
                call_id: Some(call_id.into()),
                output: Some(output.into()),
                ..Default::default()
            },
        }
    }

    /// A bare `response.create`, used to let the model continue after a tool result.
    pub fn response_create() -> Self {
        Self::ResponseCreate { response: None }
    }

    /// The wire name of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::ConversationItemCreate { .. } => "conversation.item.create",
            Self::ResponseCreate { .. } => "response.create",
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Borrowed view of the `type` tag of any realtime event.
///
/// Deserializing into this skips every other field, which keeps audio deltas
/// off the full event parser.
///
/// A `type` that is not a string still parses; it matches no known event.
#[derive(Debug, Deserialize)]
pub struct EventTag<'a> {
    #[serde(rename = "type", borrow, default)]
    tag: Option<TagValue<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagValue<'a> {
    Name(#[serde(borrow)] Cow<'a, str>),
    Other(IgnoredAny),
}

impl<'a> EventTag<'a> {
    /// Parse the tag of a frame. Fails when the frame is not a JSON object.
    pub fn parse(text: &'a str) -> Result<Self, serde_json::Error> {
        if !text.trim_start().starts_with('{') {
            return Err(serde::de::Error::custom("expected a JSON object"));
        }
        serde_json::from_str(text)
    }

    /// The tag when it is a string.
    pub fn kind(&self) -> Option<&str> {
        match &self.tag {
            Some(TagValue::Name(name)) => Some(name.as_ref()),
            _ => None,
        }
    }
}

/// Closed classification of upstream event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamEventKind {
    /// `error`
    Error,
    /// `response.done`
    ResponseDone,
    /// `response.function_call_arguments.done`
    FunctionCallArgumentsDone,
    /// `response.tool_calls`
    ToolCalls,
    /// Anything else, relayed without further parsing
    PassThrough,
}

impl UpstreamEventKind {
    /// Map a `type` value to its kind.
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "error" => Self::Error,
            "response.done" => Self::ResponseDone,
            "response.function_call_arguments.done" => Self::FunctionCallArgumentsDone,
            "response.tool_calls" => Self::ToolCalls,
            _ => Self::PassThrough,
        }
    }

    /// Classify a raw upstream text frame by its `type` tag.
    ///
    /// Fails only when the frame is not a JSON object.
    pub fn classify(text: &str) -> Result<Self, serde_json::Error> {
        let tag = EventTag::parse(text)?;
        Ok(tag.kind().map(Self::from_type).unwrap_or(Self::PassThrough))
    }

    /// Whether events of this kind may carry function calls.
    pub fn carries_function_calls(self) -> bool {
        matches!(
            self,
            Self::ResponseDone | Self::FunctionCallArgumentsDone | Self::ToolCalls
        )
    }
}

/// Server events the gateway inspects.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        #[serde(default)]
        error: ApiError,
    },

    /// Response completed
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response data
        #[serde(default)]
        response: Response,
    },

    /// Function call arguments complete
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        item_id: Option<String>,
        #[serde(default)]
        call_id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        arguments: Option<String>,
    },

    /// Batched function calls (legacy shape)
    #[serde(rename = "response.tool_calls")]
    ToolCalls {
        #[serde(default, deserialize_with = "skip_malformed_items")]
        tool_calls: Vec<LegacyToolCall>,
    },

    /// Any other event type
    #[serde(other)]
    Other,
}

impl ServerEvent {
    /// Extract every function call carried by this event, in arrival order.
    pub fn into_function_calls(self) -> Vec<FunctionCall> {
        match self {
            Self::ResponseDone { response } => response
                .output
                .into_iter()
                .filter(|item| item.item_type == ConversationItem::FUNCTION_CALL)
                .map(|item| FunctionCall {
                    name: item.name.unwrap_or_default(),
                    arguments: item.arguments.unwrap_or_default(),
                    call_id: item.call_id,
                })
                .collect(),
            Self::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
                ..
            } => vec![FunctionCall {
                name: name.unwrap_or_default(),
                arguments: arguments.unwrap_or_default(),
                call_id,
            }],
            Self::ToolCalls { tool_calls } => tool_calls
                .into_iter()
                .map(|call| FunctionCall {
                    name: call.function.name.unwrap_or_default(),
                    arguments: call
                        .arguments
                        .or(call.function.arguments)
                        .unwrap_or_default(),
                    call_id: call.id.or(call.call_id),
                })
                .collect(),
            Self::Error { .. } | Self::Other => Vec::new(),
        }
    }
}

/// API error details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: Option<String>,
    /// Parameter that caused the error
    #[serde(default)]
    pub param: Option<String>,
    /// Client event ID that caused the error
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Response information carried by `response.done`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Output items
    #[serde(default, deserialize_with = "skip_malformed_items")]
    pub output: Vec<ConversationItem>,
}

/// One entry of the legacy `response.tool_calls` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub function: LegacyFunction,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Decode a list item by item, dropping entries that do not fit `T`.
fn skip_malformed_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed upstream list item: {}", e);
                None
            }
        })
        .collect())
}

/// A function call requested by the model, as found on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
    /// Correlation id; absent only on malformed events
    pub call_id: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
