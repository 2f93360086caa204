//! Session handshake profiles.
//!
//! A profile is the data sent to the upstream model before relaying starts:
//! one `session.update` and, optionally, a greeting `response.create`. Both
//! presets share the same control flow and differ only in these values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::base::{RealtimeError, RealtimeResult};
use super::openai::{
    ClientEvent, DEFAULT_TRANSCRIPTION_MODEL, InputAudioTranscription, MaxTokens, Modality,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, ResponseConfig, SessionConfig, ToolDef,
    TurnDetection,
};
use crate::config::ServerConfig;
use crate::core::tools::tool_definitions;

const CONCIERGE_INSTRUCTIONS: &str = include_str!("../../../data/instructions/concierge.md");
const GUIDED_INSTRUCTIONS: &str = include_str!("../../../data/instructions/guided.md");

const CONCIERGE_GREETING: &str =
    "Please introduce yourself as a customer service assistant and ask how you can help today.";

/// Preset selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeProfileKind {
    #[default]
    Concierge,
    Guided,
}

impl HandshakeProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concierge => "concierge",
            Self::Guided => "guided",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "guided" => Self::Guided,
            _ => Self::Concierge,
        }
    }
}

impl std::fmt::Display for HandshakeProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What, if anything, is sent after the session configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Greeting {
    Disabled,
    /// `response.create` with no overrides
    Bare,
    /// `response.create` with text and audio and a one-off instruction
    Prompted(String),
}

#[derive(Debug, Clone)]
pub struct HandshakeProfile {
    pub kind: HandshakeProfileKind,
    pub instructions: String,
    pub voice: OpenAIRealtimeVoice,
    pub turn_detection: TurnDetection,
    pub input_audio_transcription: Option<InputAudioTranscription>,
    pub temperature: Option<f32>,
    pub max_response_output_tokens: Option<MaxTokens>,
    pub greeting: Greeting,
    pub tools: Vec<ToolDef>,
}

impl HandshakeProfile {
    /// Plain server VAD, provider defaults, spoken introduction.
    pub fn concierge(voice: OpenAIRealtimeVoice) -> Self {
        Self {
            kind: HandshakeProfileKind::Concierge,
            instructions: CONCIERGE_INSTRUCTIONS.trim().to_string(),
            voice,
            turn_detection: TurnDetection::server_vad_defaults(),
            input_audio_transcription: None,
            temperature: None,
            max_response_output_tokens: None,
            greeting: Greeting::Prompted(CONCIERGE_GREETING.to_string()),
            tools: tool_definitions(),
        }
    }

    /// Tuned VAD, input transcription and capped responses.
    pub fn guided(voice: OpenAIRealtimeVoice) -> Self {
        Self {
            kind: HandshakeProfileKind::Guided,
            instructions: GUIDED_INSTRUCTIONS.trim().to_string(),
            voice,
            turn_detection: TurnDetection::ServerVad {
                threshold: Some(0.5),
                prefix_padding_ms: Some(300),
                silence_duration_ms: Some(700),
                create_response: Some(true),
            },
            input_audio_transcription: Some(InputAudioTranscription {
                model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            }),
            temperature: Some(0.7),
            max_response_output_tokens: Some(MaxTokens::Number(800)),
            greeting: Greeting::Bare,
            tools: tool_definitions(),
        }
    }

    pub fn preset(kind: HandshakeProfileKind, voice: OpenAIRealtimeVoice) -> Self {
        match kind {
            HandshakeProfileKind::Concierge => Self::concierge(voice),
            HandshakeProfileKind::Guided => Self::guided(voice),
        }
    }

    /// Build the configured preset, applying instruction and greeting overrides.
    pub fn from_config(config: &ServerConfig) -> RealtimeResult<Self> {
        let voice = OpenAIRealtimeVoice::from_str_or_default(&config.realtime_voice);
        let mut profile = Self::preset(config.handshake_profile, voice);

        if let Some(path) = &config.instructions_path {
            profile.instructions = load_instructions(path)?;
        }
        if !config.greeting_enabled {
            profile.greeting = Greeting::Disabled;
        }
        Ok(profile)
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_greeting(mut self, greeting: Greeting) -> Self {
        self.greeting = greeting;
        self
    }

    /// The `session.update` declaring this profile.
    pub fn session_update(&self) -> ClientEvent {
        ClientEvent::SessionUpdate {
            session: Box::new(SessionConfig {
                modalities: Some(Modality::TEXT_AND_AUDIO.to_vec()),
                instructions: Some(self.instructions.clone()),
                voice: Some(self.voice.as_str().to_string()),
                input_audio_format: Some(OpenAIRealtimeAudioFormat::Pcm16),
                output_audio_format: Some(OpenAIRealtimeAudioFormat::Pcm16),
                input_audio_transcription: self.input_audio_transcription.clone(),
                turn_detection: Some(self.turn_detection.clone()),
                tools: Some(self.tools.clone()),
                temperature: self.temperature,
                max_response_output_tokens: self.max_response_output_tokens.clone(),
            }),
        }
    }

    fn greeting_event(&self) -> Option<ClientEvent> {
        match &self.greeting {
            Greeting::Disabled => None,
            Greeting::Bare => Some(ClientEvent::response_create()),
            Greeting::Prompted(instructions) => Some(ClientEvent::ResponseCreate {
                response: Some(ResponseConfig {
                    modalities: Some(Modality::TEXT_AND_AUDIO.to_vec()),
                    instructions: Some(instructions.clone()),
                }),
            }),
        }
    }

    /// Events to send upstream, in order, before relaying.
    pub fn events(&self) -> Vec<ClientEvent> {
        let mut events = vec![self.session_update()];
        events.extend(self.greeting_event());
        events
    }
}

fn load_instructions(path: &Path) -> RealtimeResult<String> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        RealtimeError::InvalidConfiguration(format!(
            "Failed to read instructions file {}: {e}",
            path.display()
        ))
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Err(RealtimeError::InvalidConfiguration(format!(
            "Instructions file {} is empty",
            path.display()
        )));
    }
    Ok(text.to_string())
}
