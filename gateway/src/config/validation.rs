//! Configuration validation.
//!
//! Every check here is fatal at startup.

use url::Url;

use super::{ServerConfig, TlsConfig};

/// Run every validation against a merged configuration.
pub fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_tls(&config.tls)?;
    validate_positive("credential_timeout_seconds", config.credential_timeout_seconds)?;
    validate_positive("idle_timeout_seconds", config.idle_timeout_seconds)?;
    validate_positive(
        "rate_limit_requests_per_second",
        u64::from(config.rate_limit_requests_per_second),
    )?;
    validate_url("realtime_url", &config.realtime_url, &["ws", "wss"])?;
    validate_url(
        "realtime_sessions_url",
        &config.realtime_sessions_url,
        &["http", "https"],
    )?;
    Ok(())
}

/// TLS files must exist when TLS is enabled.
pub fn validate_tls(tls: &Option<TlsConfig>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(tls) = tls {
        if !tls.cert_path.exists() {
            return Err(format!(
                "TLS certificate file not found: {}",
                tls.cert_path.display()
            )
            .into());
        }
        if !tls.key_path.exists() {
            return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
        }
    }
    Ok(())
}

pub fn validate_positive(name: &str, value: u64) -> Result<(), Box<dyn std::error::Error>> {
    if value == 0 {
        return Err(format!("{name} must be greater than 0").into());
    }
    Ok(())
}

pub fn validate_url(
    name: &str,
    value: &str,
    schemes: &[&str],
) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(value).map_err(|e| format!("Invalid {name} '{value}': {e}"))?;
    if !schemes.contains(&url.scheme()) {
        return Err(format!(
            "Invalid {name} '{value}': scheme must be one of {}",
            schemes.join(", ")
        )
        .into());
    }
    if url.host_str().is_none() {
        return Err(format!("Invalid {name} '{value}': missing host").into());
    }
    Ok(())
}
