//! Seed data loading.
//!
//! Seed files are YAML with three lists: `customers`, `customer_policies` and
//! `policies`. Keys are normalized on load, later duplicates replace earlier
//! ones, and missing `updated_at` values are stamped with the load time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::records::{Customer, CustomerPolicy, PolicyRecord};
use super::{StoreError, StoreResult};

/// Seed file compiled into the binary.
pub const BUILTIN_SEED: &str = include_str!("../../../data/seed.yaml");

/// Lowercase and trim a lookup key (email or topic).
pub(crate) fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub customers: Vec<Customer>,
    pub customer_policies: Vec<CustomerPolicy>,
    pub policies: Vec<PolicyRecord>,
}

impl SeedData {
    /// The built-in seed set.
    pub fn builtin() -> StoreResult<Self> {
        Self::from_yaml_str(BUILTIN_SEED)
    }

    /// Load a seed file from disk.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Seed(format!("Failed to read seed file {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse, validate and normalize seed YAML.
    pub fn from_yaml_str(contents: &str) -> StoreResult<Self> {
        let raw: SeedData = serde_yaml::from_str(contents)
            .map_err(|e| StoreError::Seed(format!("Failed to parse seed YAML: {e}")))?;
        raw.normalized()
    }

    fn normalized(self) -> StoreResult<Self> {
        let loaded_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| StoreError::Seed(format!("Failed to format timestamp: {e}")))?;

        let mut customers: Vec<Customer> = Vec::with_capacity(self.customers.len());
        for mut customer in self.customers {
            customer.email = normalize_key(&customer.email);
            if customer.email.is_empty() {
                return Err(StoreError::InvalidRecord(format!(
                    "customer '{}' has no email",
                    customer.full_name
                )));
            }
            upsert(&mut customers, customer, |a, b| a.email == b.email);
        }

        let mut customer_policies: Vec<CustomerPolicy> =
            Vec::with_capacity(self.customer_policies.len());
        for mut policy in self.customer_policies {
            policy.customer_email = normalize_key(&policy.customer_email);
            if policy.policy_number.trim().is_empty() {
                return Err(StoreError::InvalidRecord(format!(
                    "policy for '{}' has no policy_number",
                    policy.customer_email
                )));
            }
            upsert(&mut customer_policies, policy, |a, b| {
                a.policy_number == b.policy_number
            });
        }

        let mut policies: Vec<PolicyRecord> = Vec::with_capacity(self.policies.len());
        for mut record in self.policies {
            record.topic = normalize_key(&record.topic);
            if record.topic.is_empty() {
                return Err(StoreError::InvalidRecord(format!(
                    "policy document in section '{}' has no topic",
                    record.section
                )));
            }
            if record.updated_at.is_empty() {
                record.updated_at = loaded_at.clone();
            }
            upsert(&mut policies, record, |a, b| a.topic == b.topic);
        }

        Ok(Self {
            customers,
            customer_policies,
            policies,
        })
    }
}

/// Replace the first element matching `same` in place, or append.
fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}
