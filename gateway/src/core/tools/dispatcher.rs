//! Tool dispatcher.
//!
//! Executes one function call requested by the upstream model and always
//! produces exactly one [`ToolOutcome`] for it. Authorization denials, missing
//! records, bad arguments, unknown tools and store failures are all outcomes
//! with a structured error payload; none of them escape as errors.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::catalog::ToolName;
use super::coverage::resolve_topic;
use crate::core::realtime::openai::ClientEvent;
use crate::core::store::{AuditEvent, AuditLog, RecordStore, StoreError, VerificationStore};

/// A function call with a correlation id, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub name: String,
    /// JSON-encoded arguments; empty means `{}`
    pub arguments: String,
    pub call_id: String,
}

impl InvocationRequest {
    pub fn new(
        name: impl Into<String>,
        arguments: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            call_id: call_id.into(),
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Completed,
    /// Verification required
    Denied,
    NotFound,
    /// Tool name is not in the catalog
    Unsupported,
    InvalidArguments,
    /// Store failure
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Denied => "denied",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::InvalidArguments => "invalid_arguments",
            Self::Failed => "failed",
        }
    }
}

/// Result of one invocation, carrying the original correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub call_id: String,
    pub status: OutcomeStatus,
    pub output: Value,
}

impl ToolOutcome {
    fn new(call_id: &str, status: OutcomeStatus, output: Value) -> Self {
        Self {
            call_id: call_id.to_string(),
            status,
            output,
        }
    }

    /// The result item followed by the continuation trigger.
    pub fn into_events(self) -> [ClientEvent; 2] {
        [
            ClientEvent::function_call_output(self.call_id, self.output.to_string()),
            ClientEvent::response_create(),
        ]
    }
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VerifyCustomerArgs {
    email: String,
    full_name: String,
    last4: String,
    order_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CustomerPoliciesArgs {
    email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CoverageInfoArgs {
    coverage_type: String,
}

fn parse_args<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        serde_json::from_str("{}")
    } else {
        serde_json::from_str(raw)
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Runs catalog tools against the verification and record stores.
#[derive(Clone)]
pub struct ToolDispatcher {
    verification: Arc<dyn VerificationStore>,
    records: Arc<dyn RecordStore>,
    audit: Arc<AuditLog>,
}

impl ToolDispatcher {
    pub fn new(
        verification: Arc<dyn VerificationStore>,
        records: Arc<dyn RecordStore>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            verification,
            records,
            audit,
        }
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Execute one invocation for a session.
    pub async fn dispatch(&self, session_id: &str, request: &InvocationRequest) -> ToolOutcome {
        let call_id = request.call_id.as_str();

        let Some(tool) = ToolName::from_name(&request.name) else {
            warn!(session_id = %session_id, tool = %request.name, call_id = %call_id, "Unknown tool requested");
            self.audit.record(
                session_id,
                AuditEvent::UnsupportedCapability,
                format!("tool={}", request.name),
            );
            return ToolOutcome::new(
                call_id,
                OutcomeStatus::Unsupported,
                json!({
                    "error": "unsupported_capability",
                    "message": format!("Unknown tool: {}", request.name),
                }),
            );
        };

        let result = match tool {
            ToolName::VerifyCustomer => match parse_args(&request.arguments) {
                Ok(args) => self.verify_customer(session_id, call_id, args).await,
                Err(e) => Ok(invalid_arguments(call_id, tool, &e)),
            },
            ToolName::GetCustomerPolicies => match parse_args(&request.arguments) {
                Ok(args) => self.customer_policies(session_id, call_id, args).await,
                Err(e) => Ok(invalid_arguments(call_id, tool, &e)),
            },
            ToolName::GetCoverageInfo => match parse_args(&request.arguments) {
                Ok(args) => self.coverage_info(session_id, call_id, args).await,
                Err(e) => Ok(invalid_arguments(call_id, tool, &e)),
            },
        };

        let outcome = result.unwrap_or_else(|e| {
            warn!(session_id = %session_id, tool = %tool, call_id = %call_id, error = %e, "Tool failed");
            ToolOutcome::new(
                call_id,
                OutcomeStatus::Failed,
                json!({"error": "internal_error", "message": e.to_string()}),
            )
        });

        info!(
            session_id = %session_id,
            tool = %tool,
            call_id = %call_id,
            status = outcome.status.as_str(),
            "Tool dispatched"
        );
        outcome
    }

    async fn verify_customer(
        &self,
        session_id: &str,
        call_id: &str,
        args: VerifyCustomerArgs,
    ) -> Result<ToolOutcome, StoreError> {
        let verified = match self.records.find_customer(&args.email).await? {
            Some(customer) => customer.matches(&args.full_name, &args.last4, &args.order_id),
            None => false,
        };

        // A failed attempt never clears an earlier success.
        if verified {
            self.verification.set_verified(session_id, true).await;
            self.audit.record(
                session_id,
                AuditEvent::VerificationSuccess,
                format!("email={}", args.email.trim().to_lowercase()),
            );
        } else {
            self.audit.record(
                session_id,
                AuditEvent::VerificationFailed,
                format!("email={}", args.email.trim().to_lowercase()),
            );
        }

        Ok(ToolOutcome::new(
            call_id,
            OutcomeStatus::Completed,
            json!({"verified": verified}),
        ))
    }

    async fn customer_policies(
        &self,
        session_id: &str,
        call_id: &str,
        args: CustomerPoliciesArgs,
    ) -> Result<ToolOutcome, StoreError> {
        if !self.verification.is_verified(session_id).await {
            self.audit.record(
                session_id,
                AuditEvent::CustomerPoliciesDenied,
                format!("email={}", args.email.trim().to_lowercase()),
            );
            return Ok(ToolOutcome::new(
                call_id,
                OutcomeStatus::Denied,
                json!({
                    "error": "verification_required",
                    "message": "Customer must be verified to access P&C policy details",
                }),
            ));
        }

        let policies = self.records.list_policies_for_customer(&args.email).await?;
        let count = policies.len();
        let policies =
            serde_json::to_value(&policies).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        self.audit.record(
            session_id,
            AuditEvent::CustomerPoliciesAccessed,
            format!("email={} count={count}", args.email.trim().to_lowercase()),
        );

        Ok(ToolOutcome::new(
            call_id,
            OutcomeStatus::Completed,
            json!({"policies": policies, "count": count}),
        ))
    }

    async fn coverage_info(
        &self,
        session_id: &str,
        call_id: &str,
        args: CoverageInfoArgs,
    ) -> Result<ToolOutcome, StoreError> {
        let topic = resolve_topic(&args.coverage_type);

        let Some(record) = self.records.get_policy_by_topic(&topic).await? else {
            self.audit
                .record(session_id, AuditEvent::PolicyNotFound, format!("topic={topic}"));
            return Ok(ToolOutcome::new(
                call_id,
                OutcomeStatus::NotFound,
                json!({"error": "Coverage information not found"}),
            ));
        };

        if record.classification.requires_verification()
            && !self.verification.is_verified(session_id).await
        {
            self.audit.record(
                session_id,
                AuditEvent::PolicyAccessDenied,
                format!("topic={topic} classification={}", record.classification.as_str()),
            );
            return Ok(ToolOutcome::new(
                call_id,
                OutcomeStatus::Denied,
                json!({
                    "error": "verification_required",
                    "message": "Verification required for detailed coverage information",
                }),
            ));
        }

        self.audit.record(
            session_id,
            AuditEvent::PolicyAccessGranted,
            format!("topic={topic} classification={}", record.classification.as_str()),
        );
        let output =
            serde_json::to_value(&record).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        Ok(ToolOutcome::new(call_id, OutcomeStatus::Completed, output))
    }
}

fn invalid_arguments(call_id: &str, tool: ToolName, err: &serde_json::Error) -> ToolOutcome {
    warn!(tool = %tool, call_id = %call_id, error = %err, "Invalid tool arguments");
    ToolOutcome::new(
        call_id,
        OutcomeStatus::InvalidArguments,
        json!({
            "error": "invalid_arguments",
            "message": format!("Invalid arguments for {tool}: {err}"),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{
        Customer, CustomerPolicy, InMemoryVerificationStore, PolicyRecord, SeedData,
        SeedRecordStore, StoreResult,
    };
    use async_trait::async_trait;

    fn dispatcher() -> (ToolDispatcher, Arc<InMemoryVerificationStore>, Arc<AuditLog>) {
        let verification = Arc::new(InMemoryVerificationStore::new());
        let records = Arc::new(SeedRecordStore::new(SeedData::builtin().unwrap()));
        let audit = Arc::new(AuditLog::new(100));
        (
            ToolDispatcher::new(verification.clone(), records, audit.clone()),
            verification,
            audit,
        )
    }

    fn call(name: &str, args: &str) -> InvocationRequest {
        InvocationRequest::new(name, args, "call_1")
    }

    #[tokio::test]
    async fn test_verify_matching_customer() {
        let (dispatcher, verification, audit) = dispatcher();
        let outcome = dispatcher
            .dispatch(
                "s1",
                &call(
                    "verify_customer",
                    r#"{"email":"maria92@example.com","full_name":"Heather Gray","last4":"1234"}"#,
                ),
            )
            .await;
        assert_eq!(outcome.call_id, "call_1");
        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.output, json!({"verified": true}));
        assert!(verification.is_verified("s1").await);
        assert_eq!(audit.recent(1)[0].event, AuditEvent::VerificationSuccess);
    }

    #[tokio::test]
    async fn test_verify_non_matching_email() {
        let (dispatcher, verification, _) = dispatcher();
        let outcome = dispatcher
            .dispatch(
                "s1",
                &call("verify_customer", r#"{"email":"nobody@example.com"}"#),
            )
            .await;
        assert_eq!(outcome.output, json!({"verified": false}));
        assert!(!verification.is_verified("s1").await);
    }

    #[tokio::test]
    async fn test_failed_verify_does_not_downgrade() {
        let (dispatcher, verification, _) = dispatcher();
        verification.set_verified("s1", true).await;
        let outcome = dispatcher
            .dispatch(
                "s1",
                &call(
                    "verify_customer",
                    r#"{"email":"maria92@example.com","last4":"0000"}"#,
                ),
            )
            .await;
        assert_eq!(outcome.output, json!({"verified": false}));
        assert!(verification.is_verified("s1").await);
    }

    #[tokio::test]
    async fn test_verify_retry_after_failure() {
        let (dispatcher, verification, _) = dispatcher();
        let bad = call(
            "verify_customer",
            r#"{"email":"maria92@example.com","last4":"9999"}"#,
        );
        let good = call(
            "verify_customer",
            r#"{"email":"maria92@example.com","last4":"1234"}"#,
        );
        assert_eq!(dispatcher.dispatch("s1", &bad).await.output["verified"], false);
        assert_eq!(dispatcher.dispatch("s1", &bad).await.output["verified"], false);
        assert_eq!(dispatcher.dispatch("s1", &good).await.output["verified"], true);
        assert!(verification.is_verified("s1").await);
    }

    #[tokio::test]
    async fn test_policies_require_verification() {
        let (dispatcher, verification, _) = dispatcher();
        let request = call("get_customer_policies", r#"{"email":"maria92@example.com"}"#);

        let denied = dispatcher.dispatch("s1", &request).await;
        assert_eq!(denied.status, OutcomeStatus::Denied);
        assert_eq!(denied.output["error"], "verification_required");
        assert!(denied.output.get("policies").is_none());

        verification.set_verified("s1", true).await;
        let granted = dispatcher.dispatch("s1", &request).await;
        assert_eq!(granted.status, OutcomeStatus::Completed);
        assert_eq!(granted.output["count"], 1);
        assert_eq!(
            granted.output["policies"][0]["policy_number"],
            "AUTO-2024-847291"
        );
    }

    #[tokio::test]
    async fn test_claims_denied_when_unverified() {
        let (dispatcher, _, _) = dispatcher();
        let outcome = dispatcher
            .dispatch("s1", &call("get_pc_coverage_info", r#"{"coverage_type":"claims"}"#))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Denied);
        assert_eq!(outcome.output["error"], "verification_required");
        assert!(outcome.output.get("text").is_none());
    }

    #[tokio::test]
    async fn test_public_coverage_visible_to_all() {
        let (dispatcher, verification, _) = dispatcher();
        let request = call("get_pc_coverage_info", r#"{"coverage_type":"auto"}"#);

        let unverified = dispatcher.dispatch("s1", &request).await;
        assert_eq!(unverified.status, OutcomeStatus::Completed);
        assert_eq!(unverified.output["topic"], "auto_coverage_limits");
        assert_eq!(unverified.output["classification"], "public");

        verification.set_verified("s1", true).await;
        let verified = dispatcher.dispatch("s1", &request).await;
        assert_eq!(verified.output, unverified.output);
    }

    #[tokio::test]
    async fn test_restricted_visible_after_verification() {
        let (dispatcher, verification, _) = dispatcher();
        let request = call(
            "get_pc_coverage_info",
            r#"{"coverage_type":"premium_calculation"}"#,
        );
        assert_eq!(
            dispatcher.dispatch("s1", &request).await.status,
            OutcomeStatus::Denied
        );
        verification.set_verified("s1", true).await;
        let outcome = dispatcher.dispatch("s1", &request).await;
        assert_eq!(outcome.output["classification"], "restricted");
    }

    #[tokio::test]
    async fn test_coverage_not_found() {
        let (dispatcher, _, audit) = dispatcher();
        let outcome = dispatcher
            .dispatch("s1", &call("get_pc_coverage_info", r#"{"coverage_type":"flood"}"#))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::NotFound);
        assert_eq!(outcome.output, json!({"error": "Coverage information not found"}));
        assert_eq!(audit.recent(1)[0].event, AuditEvent::PolicyNotFound);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_answered() {
        let (dispatcher, _, audit) = dispatcher();
        let outcome = dispatcher
            .dispatch("s1", &InvocationRequest::new("transfer_funds", "{}", "call_9"))
            .await;
        assert_eq!(outcome.call_id, "call_9");
        assert_eq!(outcome.status, OutcomeStatus::Unsupported);
        assert_eq!(outcome.output["error"], "unsupported_capability");
        assert_eq!(audit.recent(1)[0].event, AuditEvent::UnsupportedCapability);
    }

    #[tokio::test]
    async fn test_invalid_and_empty_arguments() {
        let (dispatcher, _, _) = dispatcher();
        let outcome = dispatcher
            .dispatch("s1", &call("verify_customer", "{not json"))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::InvalidArguments);
        assert_eq!(outcome.output["error"], "invalid_arguments");

        let outcome = dispatcher
            .dispatch("s1", &call("get_pc_coverage_info", r#"{"coverage_type":42}"#))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::InvalidArguments);

        let outcome = dispatcher.dispatch("s1", &call("verify_customer", "")).await;
        assert_eq!(outcome.output, json!({"verified": false}));
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_verification() {
        let (dispatcher, _, _) = dispatcher();
        dispatcher
            .dispatch(
                "a",
                &call("verify_customer", r#"{"email":"maria92@example.com"}"#),
            )
            .await;
        let outcome = dispatcher
            .dispatch("b", &call("get_customer_policies", r#"{"email":"maria92@example.com"}"#))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Denied);
    }

    struct FailingRecords;

    #[async_trait]
    impl RecordStore for FailingRecords {
        async fn find_customer(&self, _email: &str) -> StoreResult<Option<Customer>> {
            Err(StoreError::Unavailable("connection reset".into()))
        }
        async fn list_policies_for_customer(
            &self,
            _email: &str,
        ) -> StoreResult<Vec<CustomerPolicy>> {
            Err(StoreError::Unavailable("connection reset".into()))
        }
        async fn get_policy_by_topic(&self, _topic: &str) -> StoreResult<Option<PolicyRecord>> {
            Err(StoreError::Unavailable("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_answered() {
        let dispatcher = ToolDispatcher::new(
            Arc::new(InMemoryVerificationStore::new()),
            Arc::new(FailingRecords),
            Arc::new(AuditLog::default()),
        );
        let outcome = dispatcher
            .dispatch("s1", &call("verify_customer", r#"{"email":"a@b.c"}"#))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.output["error"], "internal_error");
        assert_eq!(outcome.call_id, "call_1");
    }

    #[test]
    fn test_outcome_into_events() {
        let outcome = ToolOutcome::new("call_7", OutcomeStatus::Completed, json!({"verified": true}));
        let [item, trigger] = outcome.into_events();
        let item = serde_json::to_value(&item).unwrap();
        assert_eq!(item["item"]["call_id"], "call_7");
        assert_eq!(item["item"]["output"], r#"{"verified":true}"#);
        assert_eq!(trigger.event_type(), "response.create");
    }
}
