//! OpenAI Realtime API configuration types.
//!
//! This module contains the endpoint constants and the small closed sets the
//! gateway negotiates with the Realtime API:
//! - Voice selection
//! - Audio format
//! - Output modalities

use serde::{Deserialize, Serialize};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Endpoint that exchanges the server API key for a short-lived client secret.
pub const OPENAI_REALTIME_SESSIONS_URL: &str = "https://api.openai.com/v1/realtime/sessions";

/// Value of the `OpenAI-Beta` header required by the v1 realtime protocol.
pub const OPENAI_BETA_HEADER: &str = "realtime=v1";

/// Model requested when none is configured.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-realtime";

/// Transcription model used when input transcription is enabled.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

// =============================================================================
// Voices
// =============================================================================

/// Available voices for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIRealtimeVoice {
    Alloy,
    Ash,
    Ballad,
    Cedar,
    Coral,
    Echo,
    Marin,
    Sage,
    /// Shimmer voice (default)
    #[default]
    Shimmer,
    Verse,
}

impl OpenAIRealtimeVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Cedar => "cedar",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Marin => "marin",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "cedar" => Self::Cedar,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "marin" => Self::Marin,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Supported audio formats for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAIRealtimeAudioFormat {
    /// PCM 16-bit signed little-endian at 24kHz (default)
    #[default]
    #[serde(rename = "pcm16")]
    Pcm16,
    /// G.711 u-law (8-bit)
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
    /// G.711 a-law (8-bit)
    #[serde(rename = "g711_alaw")]
    G711Alaw,
}

impl OpenAIRealtimeAudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
            Self::G711Alaw => "g711_alaw",
        }
    }
}

// =============================================================================
// Modalities
// =============================================================================

/// Output modalities for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

impl Modality {
    /// Text and audio, the pair every gateway session negotiates.
    pub const TEXT_AND_AUDIO: [Modality; 2] = [Modality::Text, Modality::Audio];
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_from_str() {
        assert_eq!(
            OpenAIRealtimeVoice::from_str_or_default("alloy"),
            OpenAIRealtimeVoice::Alloy
        );
        assert_eq!(
            OpenAIRealtimeVoice::from_str_or_default(" MARIN "),
            OpenAIRealtimeVoice::Marin
        );
        assert_eq!(
            OpenAIRealtimeVoice::from_str_or_default("unknown"),
            OpenAIRealtimeVoice::Shimmer
        );
    }

    #[test]
    fn test_voice_serialization() {
        let json = serde_json::to_string(&OpenAIRealtimeVoice::Cedar).unwrap();
        assert_eq!(json, "\"cedar\"");
    }

    #[test]
    fn test_audio_format_serialization() {
        assert_eq!(OpenAIRealtimeAudioFormat::default().as_str(), "pcm16");
        let json = serde_json::to_string(&OpenAIRealtimeAudioFormat::G711Ulaw).unwrap();
        assert_eq!(json, "\"g711_ulaw\"");
    }

    #[test]
    fn test_modalities() {
        let json = serde_json::to_string(&Modality::TEXT_AND_AUDIO).unwrap();
        assert_eq!(json, r#"["text","audio"]"#);
    }

    #[test]
    fn test_urls() {
        assert_eq!(OPENAI_REALTIME_URL, "wss://api.openai.com/v1/realtime");
        assert!(OPENAI_REALTIME_SESSIONS_URL.ends_with("/v1/realtime/sessions"));
    }
}
