//! Build a [`ServerConfig`] from environment variables with optional YAML
//! overrides.
//!
//! Priority: YAML > ENV vars > .env values > defaults.

use std::path::PathBuf;

use super::env::{env_bool, env_parse, env_string};
use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig};
use crate::core::realtime::HandshakeProfileKind;
use crate::core::realtime::openai::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_SESSIONS_URL, OPENAI_REALTIME_URL,
};
use crate::core::store::DEFAULT_AUDIT_CAPACITY;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_VOICE: &str = "shimmer";
pub const DEFAULT_CREDENTIAL_TIMEOUT_SECONDS: u64 = 20;
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_PER_IP: u32 = 100;

/// Merge environment configuration with optional YAML overrides.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = config_from_env()?;
    if let Some(yaml) = yaml {
        apply_yaml(&mut config, yaml);
    }
    Ok(config)
}

fn tls_from_env() -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    if !env_bool("TLS_ENABLED")?.unwrap_or(false) {
        return Ok(None);
    }
    let cert_path = env_string("TLS_CERT_PATH")
        .ok_or("TLS_ENABLED is true but TLS_CERT_PATH is not set")?;
    let key_path =
        env_string("TLS_KEY_PATH").ok_or("TLS_ENABLED is true but TLS_KEY_PATH is not set")?;
    Ok(Some(TlsConfig {
        cert_path: PathBuf::from(cert_path),
        key_path: PathBuf::from(key_path),
    }))
}

fn config_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let handshake_profile = env_string("HANDSHAKE_PROFILE")
        .map(|p| HandshakeProfileKind::from_str_or_default(&p))
        .unwrap_or_default();

    Ok(ServerConfig {
        host: env_string("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env_parse("PORT")?.unwrap_or(DEFAULT_PORT),
        tls: tls_from_env()?,

        openai_api_key: env_string("OPENAI_API_KEY"),
        realtime_model: env_string("REALTIME_MODEL")
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        realtime_voice: env_string("REALTIME_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        realtime_url: env_string("REALTIME_URL").unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        realtime_sessions_url: env_string("REALTIME_SESSIONS_URL")
            .unwrap_or_else(|| OPENAI_REALTIME_SESSIONS_URL.to_string()),
        credential_timeout_seconds: env_parse("CREDENTIAL_TIMEOUT_SECONDS")?
            .unwrap_or(DEFAULT_CREDENTIAL_TIMEOUT_SECONDS),
        handshake_profile,
        instructions_path: env_string("INSTRUCTIONS_PATH").map(PathBuf::from),
        greeting_enabled: env_bool("GREETING_ENABLED")?.unwrap_or(true),
        idle_timeout_seconds: env_parse("IDLE_TIMEOUT_SECONDS")?
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECONDS),

        data_path: env_string("DATA_PATH").map(PathBuf::from),
        audit_log_capacity: env_parse("AUDIT_LOG_CAPACITY")?.unwrap_or(DEFAULT_AUDIT_CAPACITY),

        cors_allowed_origins: env_string("CORS_ALLOWED_ORIGINS")
            .or_else(|| env_string("APP_ORIGIN")),
        rate_limit_requests_per_second: env_parse("RATE_LIMIT_REQUESTS_PER_SECOND")?
            .unwrap_or(DEFAULT_RATE_LIMIT_RPS),
        rate_limit_burst_size: env_parse("RATE_LIMIT_BURST_SIZE")?
            .unwrap_or(DEFAULT_RATE_LIMIT_BURST),
        max_websocket_connections: env_parse("MAX_WEBSOCKET_CONNECTIONS")?,
        max_connections_per_ip: env_parse("MAX_CONNECTIONS_PER_IP")?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS_PER_IP),
    })
}

fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                Some(true) | None => {
                    let cert = tls
                        .cert_path
                        .map(PathBuf::from)
                        .or_else(|| config.tls.as_ref().map(|t| t.cert_path.clone()));
                    let key = tls
                        .key_path
                        .map(PathBuf::from)
                        .or_else(|| config.tls.as_ref().map(|t| t.key_path.clone()));
                    let wanted = tls.enabled == Some(true) || config.tls.is_some();
                    if let (true, Some(cert_path), Some(key_path)) = (wanted, cert, key) {
                        config.tls = Some(TlsConfig {
                            cert_path,
                            key_path,
                        });
                    }
                }
            }
        }
    }

    if let Some(realtime) = yaml.realtime {
        if let Some(key) = realtime.api_key.filter(|k| !k.is_empty()) {
            config.openai_api_key = Some(key);
        }
        if let Some(model) = realtime.model {
            config.realtime_model = model;
        }
        if let Some(voice) = realtime.voice {
            config.realtime_voice = voice;
        }
        if let Some(url) = realtime.url {
            config.realtime_url = url;
        }
        if let Some(url) = realtime.sessions_url {
            config.realtime_sessions_url = url;
        }
        if let Some(timeout) = realtime.credential_timeout_seconds {
            config.credential_timeout_seconds = timeout;
        }
        if let Some(profile) = realtime.profile {
            config.handshake_profile = HandshakeProfileKind::from_str_or_default(&profile);
        }
        if let Some(path) = realtime.instructions_path {
            config.instructions_path = Some(PathBuf::from(path));
        }
        if let Some(greeting) = realtime.greeting {
            config.greeting_enabled = greeting;
        }
        if let Some(timeout) = realtime.idle_timeout_seconds {
            config.idle_timeout_seconds = timeout;
        }
    }

    if let Some(data) = yaml.data {
        if let Some(path) = data.path {
            config.data_path = Some(PathBuf::from(path));
        }
        if let Some(capacity) = data.audit_capacity {
            config.audit_log_capacity = capacity;
        }
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            config.cors_allowed_origins = Some(origins);
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
        if let Some(max) = security.max_websocket_connections {
            config.max_websocket_connections = Some(max);
        }
        if let Some(max) = security.max_connections_per_ip {
            config.max_connections_per_ip = max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::cleanup_env_vars;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        cleanup_env_vars();
        let config = merge_config(None).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert!(config.tls.is_none());
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.realtime_model, "gpt-realtime");
        assert_eq!(config.realtime_voice, "shimmer");
        assert_eq!(config.realtime_url, OPENAI_REALTIME_URL);
        assert_eq!(config.credential_timeout_seconds, 20);
        assert_eq!(config.handshake_profile, HandshakeProfileKind::Concierge);
        assert!(config.greeting_enabled);
        assert_eq!(config.idle_timeout_seconds, 300);
        assert_eq!(config.audit_log_capacity, 1000);
        assert_eq!(config.rate_limit_requests_per_second, 60);
        assert_eq!(config.max_connections_per_ip, 100);
        assert!(config.max_websocket_connections.is_none());
    }

    #[test]
    #[serial]
    fn test_env_values() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "9100");
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("HANDSHAKE_PROFILE", "guided");
            env::set_var("GREETING_ENABLED", "false");
            env::set_var("APP_ORIGIN", "https://app.example.com");
            env::set_var("MAX_WEBSOCKET_CONNECTIONS", "25");
        }
        let config = merge_config(None).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.handshake_profile, HandshakeProfileKind::Guided);
        assert!(!config.greeting_enabled);
        assert_eq!(
            config.cors_allowed_origins.as_deref(),
            Some("https://app.example.com")
        );
        assert_eq!(config.max_websocket_connections, Some(25));
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_env_number() {
        cleanup_env_vars();
        unsafe {
            env::set_var("IDLE_TIMEOUT_SECONDS", "soon");
        }
        let err = merge_config(None).unwrap_err();
        assert!(err.to_string().contains("IDLE_TIMEOUT_SECONDS"));
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_tls_enabled_requires_paths() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TLS_ENABLED", "true");
            env::set_var("TLS_CERT_PATH", "/tmp/cert.pem");
        }
        let err = merge_config(None).unwrap_err();
        assert!(err.to_string().contains("TLS_KEY_PATH"));
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_yaml_overrides_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("REALTIME_VOICE", "echo");
            env::set_var("PORT", "9200");
        }
        let yaml: YamlConfig = serde_yaml::from_str(
            r#"
server:
  port: 9300
realtime:
  voice: "cedar"
  profile: "guided"
data:
  audit_capacity: 10
"#,
        )
        .unwrap();
        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.port, 9300);
        assert_eq!(config.realtime_voice, "cedar");
        assert_eq!(config.handshake_profile, HandshakeProfileKind::Guided);
        assert_eq!(config.audit_log_capacity, 10);
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_yaml_tls_disable_and_enable() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TLS_ENABLED", "true");
            env::set_var("TLS_CERT_PATH", "/tmp/cert.pem");
            env::set_var("TLS_KEY_PATH", "/tmp/key.pem");
        }
        let yaml: YamlConfig =
            serde_yaml::from_str("server:\n  tls:\n    enabled: false\n").unwrap();
        assert!(merge_config(Some(yaml)).unwrap().tls.is_none());
        cleanup_env_vars();

        let yaml: YamlConfig = serde_yaml::from_str(
            "server:\n  tls:\n    enabled: true\n    cert_path: /a.pem\n    key_path: /b.pem\n",
        )
        .unwrap();
        let config = merge_config(Some(yaml)).unwrap();
        let tls = config.tls.as_ref().unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("/a.pem"));
        assert_eq!(tls.key_path, PathBuf::from("/b.pem"));
    }
}
