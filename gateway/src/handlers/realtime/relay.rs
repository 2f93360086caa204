//! Session relay
//!
//! One [`RelaySession`] per browser connection. It issues an upstream
//! credential, opens the upstream realtime socket, sends the handshake and
//! then pumps frames in both directions until either side closes, the idle
//! watchdog fires or a writer fails.
//!
//! Each socket has a single writer task fed by an mpsc channel, so injected
//! tool results and pass-through frames never interleave mid-write.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::realtime::openai::{UpstreamStream, connect_upstream};
use crate::core::realtime::{CredentialRequest, RealtimeError};
use crate::state::AppState;

use super::interceptor::ToolCallInterceptor;
use super::messages::{
    CHANNEL_BUFFER_SIZE, ClientFrameKind, ClientRoute, SessionErrorMessage, UpstreamRoute,
};

/// How long writers get to flush and close during teardown
const WRITER_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Upper bound on the idle watchdog's polling interval
const MAX_IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Lifecycle of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Acquiring,
    Connecting,
    Handshaking,
    Relaying,
    Closed,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acquiring => "acquiring",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Relaying => "relaying",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

/// Apply ±10% jitter to `base`, derived from `seed`.
///
/// The result is never below one millisecond.
pub fn jittered_timeout(base: Duration, seed: u128) -> Duration {
    let base_ms = base.as_millis().min(u128::from(u64::MAX)) as u64;
    let range_ms = base_ms / 10;
    if range_ms == 0 {
        return base.max(Duration::from_millis(1));
    }
    let span = u128::from(range_ms) * 2 + 1;
    let offset = (seed % span) as i128 - i128::from(range_ms);
    let millis = (i128::from(base_ms) + offset).max(1) as u64;
    Duration::from_millis(millis)
}

/// Last time a frame arrived from either side.
#[derive(Clone)]
struct ActivityClock {
    origin: Instant,
    last_ms: Arc<AtomicU64>,
}

impl ActivityClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    fn touch(&self) {
        let now = self.origin.elapsed().as_millis() as u64;
        self.last_ms.fetch_max(now, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let now = self.origin.elapsed().as_millis() as u64;
        Duration::from_millis(now.saturating_sub(self.last_ms.load(Ordering::Relaxed)))
    }
}

pub struct RelaySession {
    state: Arc<AppState>,
    session_id: Uuid,
    phase: SessionPhase,
}

impl RelaySession {
    pub fn new(state: Arc<AppState>, session_id: Uuid) -> Self {
        Self {
            state,
            session_id,
            phase: SessionPhase::Acquiring,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    fn transition(&mut self, next: SessionPhase) {
        info!(
            session_id = %self.session_id,
            from = self.phase.as_str(),
            to = next.as_str(),
            "Session phase change"
        );
        self.phase = next;
    }

    /// Drive the session to completion and return its terminal phase.
    pub async fn run(mut self, socket: WebSocket) -> SessionPhase {
        let session_id = self.session_id.to_string();
        info!(session_id = %session_id, "Relay session started");

        let cancel = CancellationToken::new();
        let (client_sink, client_stream) = socket.split();
        let (client_tx, client_rx) = mpsc::channel::<ClientRoute>(CHANNEL_BUFFER_SIZE);
        let client_writer = tokio::spawn(client_writer(client_sink, client_rx, cancel.clone()));

        let upstream = match self.open_upstream().await {
            Ok(upstream) => upstream,
            Err(e) => {
                error!(session_id = %session_id, phase = self.phase.as_str(), "Session setup failed: {}", e);
                let _ = client_tx
                    .send(ClientRoute::Error(SessionErrorMessage::from_realtime_error(&e)))
                    .await;
                let _ = client_tx.send(ClientRoute::Close).await;
                drop(client_tx);
                finish_writer(client_writer).await;
                self.transition(SessionPhase::Failed);
                self.state.verification.reset(&session_id).await;
                return self.phase;
            }
        };

        self.transition(SessionPhase::Handshaking);
        let (upstream_sink, upstream_stream) = upstream.split();
        let (upstream_tx, upstream_rx) = mpsc::channel::<UpstreamRoute>(CHANNEL_BUFFER_SIZE);
        let upstream_writer =
            tokio::spawn(upstream_writer(upstream_sink, upstream_rx, cancel.clone()));

        for event in self.state.handshake.events() {
            debug!(session_id = %session_id, event_type = event.event_type(), "Sending handshake event");
            if upstream_tx.send(UpstreamRoute::Event(event)).await.is_err() {
                cancel.cancel();
                break;
            }
        }

        self.transition(SessionPhase::Relaying);
        let clock = ActivityClock::new();
        let idle_timeout =
            jittered_timeout(self.state.config.idle_timeout(), self.session_id.as_u128());
        let interceptor = ToolCallInterceptor::new(self.state.dispatcher.clone(), &session_id);

        tokio::join!(
            client_to_upstream(
                client_stream,
                upstream_tx.clone(),
                cancel.clone(),
                clock.clone(),
                &session_id,
            ),
            upstream_to_client(
                upstream_stream,
                client_tx.clone(),
                upstream_tx.clone(),
                interceptor,
                cancel.clone(),
                clock.clone(),
                &session_id,
            ),
            idle_watchdog(idle_timeout, clock, client_tx.clone(), cancel.clone(), &session_id),
        );

        // Teardown
        let _ = upstream_tx.try_send(UpstreamRoute::Close);
        let _ = client_tx.try_send(ClientRoute::Close);
        drop(upstream_tx);
        drop(client_tx);
        finish_writer(upstream_writer).await;
        finish_writer(client_writer).await;

        self.state.verification.reset(&session_id).await;
        self.transition(SessionPhase::Closed);
        info!(session_id = %session_id, "Relay session closed");
        self.phase
    }

    /// Acquiring and Connecting phases.
    async fn open_upstream(&mut self) -> Result<UpstreamStream, RealtimeError> {
        let state = self.state.clone();
        let config = &state.config;
        let handshake = &state.handshake;

        let request = CredentialRequest::new(
            config.realtime_model.clone(),
            handshake.voice.as_str(),
            handshake.tools.clone(),
        );
        let credential = self.state.credentials.issue(&request).await?;
        debug!(session_id = %self.session_id, expires_at = ?credential.expires_at, "Upstream credential issued");

        self.transition(SessionPhase::Connecting);
        let upstream =
            connect_upstream(&config.realtime_url, &config.realtime_model, &credential).await?;
        info!(session_id = %self.session_id, model = %config.realtime_model, "Connected to upstream realtime service");
        Ok(upstream)
    }
}

/// Wait for a writer to drain, aborting it after the grace period.
async fn finish_writer(mut handle: JoinHandle<()>) {
    if tokio::time::timeout(WRITER_GRACE_PERIOD, &mut handle)
        .await
        .is_err()
    {
        warn!("Writer did not finish within grace period; aborting");
        handle.abort();
    }
}

// =============================================================================
// Writers
// =============================================================================

async fn client_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ClientRoute>,
    cancel: CancellationToken,
) {
    while let Some(route) = rx.recv().await {
        let should_close = matches!(route, ClientRoute::Close);

        let result = match route {
            ClientRoute::Text(text) => sink.send(Message::Text(text.into())).await,
            ClientRoute::Binary(data) => sink.send(Message::Binary(data)).await,
            ClientRoute::Error(message) => match serde_json::to_string(&message) {
                Ok(json) => sink.send(Message::Text(json.into())).await,
                Err(e) => {
                    error!("Failed to serialize error message: {}", e);
                    continue;
                }
            },
            ClientRoute::Close => sink.send(Message::Close(None)).await,
        };

        if let Err(e) = result {
            debug!("Client write failed: {}", e);
            cancel.cancel();
            break;
        }
        if should_close {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn upstream_writer(
    mut sink: SplitSink<UpstreamStream, UpstreamMessage>,
    mut rx: mpsc::Receiver<UpstreamRoute>,
    cancel: CancellationToken,
) {
    while let Some(route) = rx.recv().await {
        let should_close = matches!(route, UpstreamRoute::Close);

        let result = match route {
            UpstreamRoute::Text(text) => sink.send(UpstreamMessage::Text(text.into())).await,
            UpstreamRoute::Event(event) => match serde_json::to_string(&event) {
                Ok(json) => sink.send(UpstreamMessage::Text(json.into())).await,
                Err(e) => {
                    error!(event_type = event.event_type(), "Failed to serialize upstream event: {}", e);
                    continue;
                }
            },
            UpstreamRoute::Pong(data) => sink.send(UpstreamMessage::Pong(data)).await,
            UpstreamRoute::Close => sink.send(UpstreamMessage::Close(None)).await,
        };

        if let Err(e) = result {
            debug!("Upstream write failed: {}", e);
            cancel.cancel();
            break;
        }
        if should_close {
            break;
        }
    }
    let _ = sink.close().await;
}

// =============================================================================
// Readers
// =============================================================================

async fn client_to_upstream(
    mut stream: SplitStream<WebSocket>,
    upstream_tx: mpsc::Sender<UpstreamRoute>,
    cancel: CancellationToken,
    clock: ActivityClock,
    session_id: &str,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = stream.next() => {
                clock.touch();
                match msg {
                    Some(Ok(Message::Text(text))) => match ClientFrameKind::classify(text.as_str()) {
                        ClientFrameKind::NoOp => debug!(session_id = %session_id, "Dropping no-op client frame"),
                        ClientFrameKind::Malformed => {
                            warn!(session_id = %session_id, bytes = text.len(), "Skipping malformed client frame");
                        }
                        ClientFrameKind::Forward => {
                            if upstream_tx.send(UpstreamRoute::Text(text.as_str().to_owned())).await.is_err() {
                                break;
                            }
                        }
                    },
                    Some(Ok(Message::Binary(data))) => {
                        debug!(session_id = %session_id, bytes = data.len(), "Skipping binary client frame");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        info!(session_id = %session_id, "Client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, "Client WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }
    cancel.cancel();
}

async fn upstream_to_client(
    mut stream: SplitStream<UpstreamStream>,
    client_tx: mpsc::Sender<ClientRoute>,
    upstream_tx: mpsc::Sender<UpstreamRoute>,
    mut interceptor: ToolCallInterceptor,
    cancel: CancellationToken,
    clock: ActivityClock,
    session_id: &str,
) {
    'relay: loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = stream.next() => {
                clock.touch();
                match msg {
                    Some(Ok(UpstreamMessage::Text(text))) => {
                        let interception = interceptor.intercept(text.as_str()).await;
                        for event in interception.replies {
                            if upstream_tx.send(UpstreamRoute::Event(event)).await.is_err() {
                                break 'relay;
                            }
                        }
                        if interception.forward
                            && client_tx.send(ClientRoute::Text(text.as_str().to_owned())).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(UpstreamMessage::Binary(data))) => {
                        if client_tx.send(ClientRoute::Binary(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(UpstreamMessage::Ping(data))) => {
                        if upstream_tx.send(UpstreamRoute::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(UpstreamMessage::Pong(_) | UpstreamMessage::Frame(_))) => {}
                    Some(Ok(UpstreamMessage::Close(frame))) => {
                        info!(session_id = %session_id, frame = ?frame, "Upstream closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, "Upstream WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!(session_id = %session_id, "Upstream stream ended");
                        break;
                    }
                }
            }
        }
    }
    cancel.cancel();
}

async fn idle_watchdog(
    idle_timeout: Duration,
    clock: ActivityClock,
    client_tx: mpsc::Sender<ClientRoute>,
    cancel: CancellationToken,
    session_id: &str,
) {
    let check_interval = (idle_timeout / 4).clamp(Duration::from_millis(50), MAX_IDLE_CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(check_interval) => {
                let idle = clock.idle_for();
                if idle >= idle_timeout {
                    warn!(
                        session_id = %session_id,
                        idle_secs = idle.as_secs(),
                        "Session idle too long, closing"
                    );
                    let _ = client_tx
                        .send(ClientRoute::Error(SessionErrorMessage::idle_timeout()))
                        .await;
                    cancel.cancel();
                    return;
                }
            }
        }
    }
}
