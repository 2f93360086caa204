//! Short-lived upstream credential exchange.
//!
//! The server API key never leaves the gateway. Each session exchanges it for
//! an ephemeral client secret bound to the session's model, voice and tools.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::config::{
    Modality, OPENAI_BETA_HEADER, OPENAI_REALTIME_SESSIONS_URL, OpenAIRealtimeAudioFormat,
};
use super::messages::ToolDef;
use crate::core::realtime::base::{RealtimeError, RealtimeResult};

/// Capability declaration a credential is issued for.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRequest {
    pub model: String,
    pub voice: String,
    pub modalities: Vec<Modality>,
    pub input_audio_format: OpenAIRealtimeAudioFormat,
    pub tools: Vec<ToolDef>,
}

impl CredentialRequest {
    pub fn new(model: impl Into<String>, voice: impl Into<String>, tools: Vec<ToolDef>) -> Self {
        Self {
            model: model.into(),
            voice: voice.into(),
            modalities: vec![Modality::Audio, Modality::Text],
            input_audio_format: OpenAIRealtimeAudioFormat::Pcm16,
            tools,
        }
    }
}

/// Ephemeral secret used to open one upstream connection.
pub struct UpstreamCredential {
    secret: Zeroizing<String>,
    /// Unix timestamp reported by the provider, when present
    pub expires_at: Option<i64>,
}

impl UpstreamCredential {
    pub fn new(secret: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for UpstreamCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamCredential")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues one upstream credential per session.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn issue(&self, request: &CredentialRequest) -> RealtimeResult<UpstreamCredential>;
}

// =============================================================================
// OpenAI sessions endpoint
// =============================================================================

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    client_secret: Option<ClientSecret>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClientSecret {
    Object {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        expires_at: Option<i64>,
    },
    Plain(String),
}

impl SessionResponse {
    fn into_credential(self) -> RealtimeResult<UpstreamCredential> {
        match self.client_secret {
            Some(ClientSecret::Object {
                value: Some(value),
                expires_at,
            }) if !value.is_empty() => Ok(UpstreamCredential::new(value, expires_at)),
            Some(ClientSecret::Plain(value)) if !value.is_empty() => {
                Ok(UpstreamCredential::new(value, None))
            }
            _ => Err(RealtimeError::InvalidConfiguration(
                "No client_secret in response".to_string(),
            )),
        }
    }
}

/// Credential provider backed by the OpenAI realtime sessions endpoint.
pub struct OpenAISessionCredentials {
    client: reqwest::Client,
    api_key: Option<Zeroizing<String>>,
    url: String,
    timeout: Duration,
}

impl OpenAISessionCredentials {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()).map(Zeroizing::new),
            url: OPENAI_REALTIME_SESSIONS_URL.to_string(),
            timeout: Duration::from_secs(20),
        }
    }

    /// Override the sessions endpoint URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CredentialProvider for OpenAISessionCredentials {
    async fn issue(&self, request: &CredentialRequest) -> RealtimeResult<UpstreamCredential> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            RealtimeError::InvalidConfiguration("OPENAI_API_KEY is not configured".to_string())
        })?;

        debug!(url = %self.url, model = %request.model, voice = %request.voice, "Requesting upstream credential");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", api_key.as_str()))
            .header("OpenAI-Beta", OPENAI_BETA_HEADER)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RealtimeError::Timeout(format!("credential request to {}", self.url))
                } else {
                    RealtimeError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Credential request rejected");
            return Err(RealtimeError::AuthenticationFailed(format!(
                "HTTP {} - {}",
                status, error_text
            )));
        }

        let body: SessionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                RealtimeError::Timeout(format!("credential response from {}", self.url))
            } else {
                RealtimeError::ProviderError(format!("Failed to parse response: {}", e))
            }
        })?;

        body.into_credential()
    }
}
