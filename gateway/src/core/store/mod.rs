//! Verification state and reference records consumed by the tool dispatcher.
//!
//! Both collaborators sit behind async traits so that the relay can be wired
//! to the in-memory implementations here or to an external service without
//! changing dispatch logic.

mod audit;
mod memory;
mod records;
mod seed;

use async_trait::async_trait;
use thiserror::Error;

pub use audit::{AuditEntry, AuditEvent, AuditLog, DEFAULT_AUDIT_CAPACITY};
pub use memory::{InMemoryVerificationStore, SeedRecordStore};
pub use records::{Classification, Customer, CustomerPolicy, PolicyRecord, PolicyStatus};
pub use seed::{BUILTIN_SEED, SeedData};

/// Errors raised by record lookups.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Seed data failed to load
    #[error("Seed data error: {0}")]
    Seed(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Per-session verification flags.
///
/// Reads of an unknown session return `false`. Writes to one session never
/// affect another.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn is_verified(&self, session_id: &str) -> bool;

    async fn set_verified(&self, session_id: &str, verified: bool);

    /// Drop the flag for a session that has ended.
    async fn reset(&self, session_id: &str);
}

/// Read-only customer and policy records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a customer by email (case-insensitive).
    async fn find_customer(&self, email: &str) -> StoreResult<Option<Customer>>;

    /// All policies held by a customer, keyed by email (case-insensitive).
    async fn list_policies_for_customer(&self, email: &str) -> StoreResult<Vec<CustomerPolicy>>;

    /// Coverage reference document by topic key (trimmed, case-insensitive).
    async fn get_policy_by_topic(&self, topic: &str) -> StoreResult<Option<PolicyRecord>>;
}
