//! Shared application state.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::realtime::{CredentialProvider, HandshakeProfile, OpenAISessionCredentials};
use crate::core::store::{
    AuditLog, InMemoryVerificationStore, RecordStore, SeedData, SeedRecordStore,
    VerificationStore,
};
use crate::core::tools::ToolDispatcher;

/// Reasons a WebSocket connection is refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionLimitError {
    #[error("global WebSocket connection limit reached")]
    GlobalLimitReached,
    #[error("per-IP WebSocket connection limit reached")]
    PerIpLimitReached,
}

/// State shared by every request and relay session.
pub struct AppState {
    pub config: ServerConfig,
    pub verification: Arc<dyn VerificationStore>,
    pub records: Arc<dyn RecordStore>,
    pub audit: Arc<AuditLog>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub dispatcher: ToolDispatcher,
    pub handshake: HandshakeProfile,

    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, usize>,
}

impl AppState {
    /// Build state from configuration: seed data, stores, credential provider
    /// and handshake profile.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>> {
        let seed = match &config.data_path {
            Some(path) => SeedData::from_file(path)
                .with_context(|| format!("loading seed data from {}", path.display()))?,
            None => SeedData::builtin().context("loading built-in seed data")?,
        };
        info!(
            customers = seed.customers.len(),
            customer_policies = seed.customer_policies.len(),
            policies = seed.policies.len(),
            "Seed data loaded"
        );

        let handshake =
            HandshakeProfile::from_config(&config).context("building handshake profile")?;

        let credentials = OpenAISessionCredentials::new(config.openai_api_key.clone())
            .with_url(config.realtime_sessions_url.clone())
            .with_timeout(config.credential_timeout());

        Ok(Self::with_components(
            Arc::new(InMemoryVerificationStore::new()),
            Arc::new(SeedRecordStore::new(seed)),
            Arc::new(AuditLog::new(config.audit_log_capacity)),
            Arc::new(credentials),
            handshake,
            config,
        ))
    }

    /// Assemble state from explicit collaborators.
    pub fn with_components(
        verification: Arc<dyn VerificationStore>,
        records: Arc<dyn RecordStore>,
        audit: Arc<AuditLog>,
        credentials: Arc<dyn CredentialProvider>,
        handshake: HandshakeProfile,
        config: ServerConfig,
    ) -> Arc<Self> {
        let dispatcher = ToolDispatcher::new(verification.clone(), records.clone(), audit.clone());
        Arc::new(Self {
            config,
            verification,
            records,
            audit,
            credentials,
            dispatcher,
            handshake,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        })
    }

    /// Reserve a WebSocket slot for `ip`.
    ///
    /// The global check and the per-IP check are both applied; on per-IP
    /// rejection the global reservation is rolled back.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let global_limit = self.config.max_websocket_connections;
        self.ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                match global_limit {
                    Some(max) if current >= max => None,
                    _ => Some(current + 1),
                }
            })
            .map_err(|_| ConnectionLimitError::GlobalLimitReached)?;

        let per_ip_limit = self.config.max_connections_per_ip as usize;
        let mut entry = self.ip_connections.entry(ip).or_insert(0);
        if *entry >= per_ip_limit {
            drop(entry);
            self.ws_connections.fetch_sub(1, Ordering::AcqRel);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *entry += 1;
        Ok(())
    }

    /// Release a slot reserved by [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            });

        if let Some(mut count) = self.ip_connections.get_mut(&ip) {
            *count = count.saturating_sub(1);
        }
        self.ip_connections.remove_if(&ip, |_, count| *count == 0);
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::Acquire)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> usize {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }
}
