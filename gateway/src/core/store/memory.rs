//! In-memory store implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use super::records::{Customer, CustomerPolicy, PolicyRecord};
use super::seed::{SeedData, normalize_key};
use super::{RecordStore, StoreResult, VerificationStore};

/// Verification flags keyed by session id.
///
/// Each entry is guarded by its own shard lock, so sessions never contend on
/// a shared flag.
#[derive(Debug, Default)]
pub struct InMemoryVerificationStore {
    flags: DashMap<String, bool>,
}

impl InMemoryVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a stored flag.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[async_trait]
impl VerificationStore for InMemoryVerificationStore {
    async fn is_verified(&self, session_id: &str) -> bool {
        self.flags.get(session_id).map(|v| *v).unwrap_or(false)
    }

    async fn set_verified(&self, session_id: &str, verified: bool) {
        self.flags.insert(session_id.to_string(), verified);
    }

    async fn reset(&self, session_id: &str) {
        self.flags.remove(session_id);
    }
}

/// Immutable record store built from seed data.
#[derive(Debug, Clone, Default)]
pub struct SeedRecordStore {
    customers: HashMap<String, Customer>,
    policies_by_customer: HashMap<String, Vec<CustomerPolicy>>,
    documents: HashMap<String, PolicyRecord>,
}

impl SeedRecordStore {
    pub fn new(seed: SeedData) -> Self {
        let customers = seed
            .customers
            .into_iter()
            .map(|c| (c.email.clone(), c))
            .collect();

        let mut policies_by_customer: HashMap<String, Vec<CustomerPolicy>> = HashMap::new();
        for policy in seed.customer_policies {
            policies_by_customer
                .entry(policy.customer_email.clone())
                .or_default()
                .push(policy);
        }

        let documents = seed
            .policies
            .into_iter()
            .map(|p| (p.topic.clone(), p))
            .collect();

        Self {
            customers,
            policies_by_customer,
            documents,
        }
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[async_trait]
impl RecordStore for SeedRecordStore {
    async fn find_customer(&self, email: &str) -> StoreResult<Option<Customer>> {
        Ok(self.customers.get(&normalize_key(email)).cloned())
    }

    async fn list_policies_for_customer(&self, email: &str) -> StoreResult<Vec<CustomerPolicy>> {
        Ok(self
            .policies_by_customer
            .get(&normalize_key(email))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_policy_by_topic(&self, topic: &str) -> StoreResult<Option<PolicyRecord>> {
        Ok(self.documents.get(&normalize_key(topic)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unknown_session_is_unverified() {
        let store = InMemoryVerificationStore::new();
        assert!(!store.is_verified("never-seen").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemoryVerificationStore::new();
        store.set_verified("a", true).await;
        assert!(store.is_verified("a").await);
        assert!(!store.is_verified("b").await);

        store.reset("a").await;
        assert!(!store.is_verified("a").await);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let store = Arc::new(InMemoryVerificationStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("session-{i}");
                store.set_verified(&id, i % 2 == 0).await;
                store.is_verified(&id).await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), i % 2 == 0);
        }
        assert_eq!(store.len(), 32);
    }

    #[tokio::test]
    async fn test_builtin_seed_lookups() {
        let store = SeedRecordStore::new(SeedData::builtin().unwrap());
        assert_eq!(store.customer_count(), 7);
        assert_eq!(store.document_count(), 6);

        let customer = store.find_customer("MARIA92@example.com").await.unwrap();
        assert_eq!(customer.unwrap().full_name, "Heather Gray");

        let policies = store
            .list_policies_for_customer("maria92@example.com")
            .await
            .unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].policy_number, "AUTO-2024-847291");

        assert!(
            store
                .list_policies_for_customer("m.chen@example.org")
                .await
                .unwrap()
                .is_empty()
        );

        let doc = store.get_policy_by_topic(" Claims_Process ").await.unwrap();
        assert_eq!(doc.unwrap().section, "Claims");
        assert!(store.get_policy_by_topic("flood").await.unwrap().is_none());
    }
}
