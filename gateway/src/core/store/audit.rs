//! Bounded in-memory audit trail of dispatcher decisions.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    VerificationSuccess,
    VerificationFailed,
    CustomerPoliciesAccessed,
    CustomerPoliciesDenied,
    PolicyAccessGranted,
    PolicyAccessDenied,
    PolicyNotFound,
    UnsupportedCapability,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerificationSuccess => "verification_success",
            Self::VerificationFailed => "verification_failed",
            Self::CustomerPoliciesAccessed => "customer_policies_accessed",
            Self::CustomerPoliciesDenied => "customer_policies_denied",
            Self::PolicyAccessGranted => "policy_access_granted",
            Self::PolicyAccessDenied => "policy_access_denied",
            Self::PolicyNotFound => "policy_not_found",
            Self::UnsupportedCapability => "unsupported_capability",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 UTC timestamp
    pub ts: String,
    /// Session id that triggered the event
    pub actor: String,
    pub event: AuditEvent,
    pub detail: String,
}

/// Ring buffer of the most recent audit entries.
#[derive(Debug)]
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn record(&self, actor: &str, event: AuditEvent, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::info!(actor = %actor, event = event.as_str(), detail = %detail, "audit");

        let ts = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let entry = AuditEntry {
            ts,
            actor: actor.to_string(),
            event,
            detail,
        };

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
