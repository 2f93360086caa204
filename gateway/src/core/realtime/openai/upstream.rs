//! Upstream WebSocket connector for the OpenAI Realtime API.

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::config::OPENAI_BETA_HEADER;
use super::credentials::UpstreamCredential;
use crate::core::realtime::base::{RealtimeError, RealtimeResult};

/// Established upstream stream.
pub type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Append the model query parameter to the realtime endpoint.
pub fn build_upstream_url(base: &str, model: &str) -> RealtimeResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| RealtimeError::InvalidConfiguration(format!("Invalid realtime URL: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "Realtime URL must use ws or wss, got {other}"
            )));
        }
    }
    url.query_pairs_mut().append_pair("model", model);
    Ok(url)
}

/// `Host` header value for a URL, including a non-default port.
fn host_header(url: &Url) -> RealtimeResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| RealtimeError::InvalidConfiguration("Realtime URL has no host".into()))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Open the upstream realtime stream with a per-session credential.
pub async fn connect_upstream(
    base_url: &str,
    model: &str,
    credential: &UpstreamCredential,
) -> RealtimeResult<UpstreamStream> {
    let url = build_upstream_url(base_url, model)?;

    let request = http::Request::builder()
        .uri(url.as_str())
        .header("Authorization", format!("Bearer {}", credential.secret()))
        .header("OpenAI-Beta", OPENAI_BETA_HEADER)
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Host", host_header(&url)?)
        .body(())
        .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

    tracing::info!(host = %url.host_str().unwrap_or_default(), model = %model, "Connected to upstream realtime API");
    Ok(ws_stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_upstream_url() {
        let url = build_upstream_url("wss://api.openai.com/v1/realtime", "gpt-realtime").unwrap();
        assert_eq!(url.as_str(), "wss://api.openai.com/v1/realtime?model=gpt-realtime");
    }

    #[test]
    fn test_build_upstream_url_rejects_http() {
        let err = build_upstream_url("https://api.openai.com/v1/realtime", "m").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_host_header_with_port() {
        let url = Url::parse("ws://127.0.0.1:9123/v1/realtime").unwrap();
        assert_eq!(host_header(&url).unwrap(), "127.0.0.1:9123");
        let url = Url::parse("wss://api.openai.com/v1/realtime").unwrap();
        assert_eq!(host_header(&url).unwrap(), "api.openai.com");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let cred = UpstreamCredential::new("ek_test", None);
        let err = connect_upstream(&format!("ws://127.0.0.1:{port}/v1/realtime"), "m", &cred)
            .await
            .unwrap_err();
        assert!(matches!(err, RealtimeError::ConnectionFailed(_)));
    }
}
