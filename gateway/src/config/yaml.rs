use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///   tls:
///     enabled: true
///     cert_path: "/etc/gateway/cert.pem"
///     key_path: "/etc/gateway/key.pem"
///
/// realtime:
///   api_key: "sk-..."
///   model: "gpt-realtime"
///   voice: "shimmer"
///   url: "wss://api.openai.com/v1/realtime"
///   sessions_url: "https://api.openai.com/v1/realtime/sessions"
///   credential_timeout_seconds: 20
///   profile: "guided"
///   instructions_path: "/etc/gateway/instructions.md"
///   greeting: true
///   idle_timeout_seconds: 300
///
/// data:
///   path: "/etc/gateway/seed.yaml"
///   audit_capacity: 1000
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///   max_websocket_connections: 500
///   max_connections_per_ip: 20
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub data: Option<DataYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Upstream realtime session configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    /// OpenAI API key used to mint per-session client secrets
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    /// Realtime WebSocket endpoint
    pub url: Option<String>,
    /// Client secret endpoint
    pub sessions_url: Option<String>,
    pub credential_timeout_seconds: Option<u64>,
    /// Handshake preset: "concierge" or "guided"
    pub profile: Option<String>,
    pub instructions_path: Option<String>,
    /// Send a greeting `response.create` after the session update
    pub greeting: Option<bool>,
    pub idle_timeout_seconds: Option<u64>,
}

/// Reference data configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DataYaml {
    /// Seed file path; the built-in seed is used when absent
    pub path: Option<String>,
    pub audit_capacity: Option<usize>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
    /// Maximum concurrent WebSocket connections
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  tls:
    enabled: true
    cert_path: "/tmp/cert.pem"
    key_path: "/tmp/key.pem"

realtime:
  api_key: "sk-yaml"
  model: "gpt-realtime"
  voice: "alloy"
  url: "wss://realtime.example.com/v1/realtime"
  sessions_url: "https://realtime.example.com/v1/realtime/sessions"
  credential_timeout_seconds: 15
  profile: "guided"
  instructions_path: "/etc/prompt.md"
  greeting: false
  idle_timeout_seconds: 120

data:
  path: "/etc/seed.yaml"
  audit_capacity: 50

security:
  cors_allowed_origins: "https://app.example.com"
  rate_limit_requests_per_second: 30
  rate_limit_burst_size: 5
  max_websocket_connections: 100
  max_connections_per_ip: 4
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.tls.as_ref().unwrap().enabled, Some(true));

        let realtime = config.realtime.as_ref().unwrap();
        assert_eq!(realtime.api_key.as_deref(), Some("sk-yaml"));
        assert_eq!(realtime.voice.as_deref(), Some("alloy"));
        assert_eq!(realtime.credential_timeout_seconds, Some(15));
        assert_eq!(realtime.profile.as_deref(), Some("guided"));
        assert_eq!(realtime.greeting, Some(false));
        assert_eq!(realtime.idle_timeout_seconds, Some(120));

        let data = config.data.as_ref().unwrap();
        assert_eq!(data.path.as_deref(), Some("/etc/seed.yaml"));
        assert_eq!(data.audit_capacity, Some(50));

        let security = config.security.as_ref().unwrap();
        assert_eq!(security.max_websocket_connections, Some(100));
        assert_eq!(security.max_connections_per_ip, Some(4));
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert!(config.server.as_ref().unwrap().host.is_none());
        assert!(config.realtime.is_none());
        assert!(config.data.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.security.is_none());
    }

    #[test]
    fn test_yaml_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "realtime:\n  model: \"custom-model\"\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(
            config.realtime.unwrap().model.as_deref(),
            Some("custom-model")
        );
    }

    #[test]
    fn test_yaml_from_file_missing() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let err = YamlConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_yaml_invalid_type() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server:\n  port: \"not-a-number\"\n").unwrap();

        let err = YamlConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }
}
