//! Record types served to the tool dispatcher.

use serde::{Deserialize, Serialize};

/// Customer identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub last4: String,
    #[serde(default)]
    pub order_id: String,
}

impl Customer {
    /// Whether the supplied identity fields agree with this record.
    ///
    /// The email lookup has already matched. Name is compared trimmed and
    /// case-insensitively. `last4` and `order_id` must match exactly and are
    /// only checked when supplied.
    pub fn matches(&self, full_name: &str, last4: &str, order_id: &str) -> bool {
        let ok_name = full_name.is_empty()
            || full_name.trim().to_lowercase() == self.full_name.to_lowercase();
        let ok_last4 = last4.is_empty() || last4 == self.last4;
        let ok_order = order_id.is_empty() || order_id == self.order_id;
        ok_name && ok_last4 && ok_order
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    #[default]
    Active,
    Inactive,
}

/// A policy held by a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPolicy {
    pub customer_email: String,
    pub policy_number: String,
    pub first_name: String,
    pub last_name: String,
    pub premium: f64,
    pub coverage_type: String,
    pub next_due_date: String,
    pub payment_method: String,
    #[serde(default)]
    pub status: PolicyStatus,
}

/// Visibility label on reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Public,
    Internal,
    Restricted,
}

impl Classification {
    /// Internal and restricted records are only shown to verified sessions.
    #[inline]
    pub fn requires_verification(&self) -> bool {
        !matches!(self, Self::Public)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Restricted => "restricted",
        }
    }
}

/// Coverage reference document keyed by topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub topic: String,
    pub section: String,
    pub classification: Classification,
    pub text: String,
    /// RFC 3339 timestamp; filled at load time when absent from the source
    #[serde(default)]
    pub updated_at: String,
}
