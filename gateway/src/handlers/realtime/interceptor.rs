//! Upstream tool-call interception.
//!
//! Every upstream text frame passes through [`ToolCallInterceptor::intercept`]
//! before it reaches the client. Frames that report function calls are
//! answered here and, except for `response.done`, never forwarded.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::core::realtime::openai::messages::{FunctionCall, ServerEvent};
use crate::core::realtime::{ClientEvent, UpstreamEventKind};
use crate::core::tools::{InvocationRequest, ToolDispatcher};

/// What to do with one upstream frame.
#[derive(Debug, Default)]
pub struct Interception {
    /// Events to send upstream, in order, before the next upstream read
    pub replies: Vec<ClientEvent>,
    /// Whether the original frame goes to the client
    pub forward: bool,
}

impl Interception {
    fn forward() -> Self {
        Self {
            replies: Vec::new(),
            forward: true,
        }
    }

    fn drop_frame() -> Self {
        Self::default()
    }
}

/// Per-session interceptor that answers each call id exactly once.
pub struct ToolCallInterceptor {
    dispatcher: ToolDispatcher,
    session_id: String,
    answered: HashSet<String>,
}

impl ToolCallInterceptor {
    pub fn new(dispatcher: ToolDispatcher, session_id: impl Into<String>) -> Self {
        Self {
            dispatcher,
            session_id: session_id.into(),
            answered: HashSet::new(),
        }
    }

    pub fn answered_count(&self) -> usize {
        self.answered.len()
    }

    pub async fn intercept(&mut self, text: &str) -> Interception {
        let kind = match UpstreamEventKind::classify(text) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(session_id = %self.session_id, "Skipping non-JSON upstream frame: {}", e);
                return Interception::drop_frame();
            }
        };

        match kind {
            UpstreamEventKind::PassThrough => Interception::forward(),
            UpstreamEventKind::Error => {
                match serde_json::from_str::<ServerEvent>(text) {
                    Ok(ServerEvent::Error { error }) => warn!(
                        session_id = %self.session_id,
                        error_type = error.error_type.as_deref().unwrap_or("unknown"),
                        code = error.code.as_deref().unwrap_or(""),
                        "Upstream error: {}",
                        error.message.as_deref().unwrap_or("no message")
                    ),
                    _ => warn!(session_id = %self.session_id, "Upstream error: {}", text),
                }
                Interception::forward()
            }
            UpstreamEventKind::ResponseDone
            | UpstreamEventKind::FunctionCallArgumentsDone
            | UpstreamEventKind::ToolCalls => {
                let forward = kind == UpstreamEventKind::ResponseDone;
                let calls = match serde_json::from_str::<ServerEvent>(text) {
                    Ok(event) => event.into_function_calls(),
                    Err(e) => {
                        warn!(
                            session_id = %self.session_id,
                            "Failed to parse upstream tool-call event: {}", e
                        );
                        Vec::new()
                    }
                };
                Interception {
                    replies: self.answer(calls).await,
                    forward,
                }
            }
        }
    }

    async fn answer(&mut self, calls: Vec<FunctionCall>) -> Vec<ClientEvent> {
        let mut replies = Vec::with_capacity(calls.len() * 2);
        for call in calls {
            let Some(call_id) = call.call_id.filter(|id| !id.is_empty()) else {
                warn!(
                    session_id = %self.session_id,
                    tool = %call.name,
                    "Function call without call_id; cannot answer"
                );
                continue;
            };
            if !self.answered.insert(call_id.clone()) {
                debug!(session_id = %self.session_id, call_id = %call_id, "Call already answered");
                continue;
            }

            info!(session_id = %self.session_id, tool = %call.name, call_id = %call_id, "Dispatching tool call");
            let request = InvocationRequest::new(call.name, call.arguments, call_id);
            let outcome = self.dispatcher.dispatch(&self.session_id, &request).await;
            replies.extend(outcome.into_events());
        }
        replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{Value, json};

    use crate::core::store::{
        AuditLog, InMemoryVerificationStore, SeedData, SeedRecordStore, VerificationStore,
    };

    fn interceptor() -> (ToolCallInterceptor, Arc<InMemoryVerificationStore>) {
        let verification = Arc::new(InMemoryVerificationStore::new());
        let records = Arc::new(SeedRecordStore::new(SeedData::builtin().unwrap()));
        let dispatcher =
            ToolDispatcher::new(verification.clone(), records, Arc::new(AuditLog::new(50)));
        (ToolCallInterceptor::new(dispatcher, "session-1"), verification)
    }

    fn to_json(event: &ClientEvent) -> Value {
        serde_json::to_value(event).unwrap()
    }

    fn arguments_done(call_id: &str) -> String {
        json!({
            "type": "response.function_call_arguments.done",
            "response_id": "resp_1",
            "item_id": "item_1",
            "call_id": call_id,
            "name": "verify_customer",
            "arguments": "{\"email\":\"maria92@example.com\",\"last4\":\"1234\"}"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_pass_through_frames_are_forwarded() {
        let (mut interceptor, _) = interceptor();
        let result = interceptor
            .intercept(r#"{"type":"response.audio.delta","delta":"AAAA"}"#)
            .await;
        assert!(result.forward);
        assert!(result.replies.is_empty());
    }

    #[tokio::test]
    async fn test_error_events_are_forwarded() {
        let (mut interceptor, _) = interceptor();
        let result = interceptor
            .intercept(r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#)
            .await;
        assert!(result.forward);
        assert!(result.replies.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_is_dropped() {
        let (mut interceptor, _) = interceptor();
        let result = interceptor.intercept("not json").await;
        assert!(!result.forward);
        assert!(result.replies.is_empty());
    }

    #[tokio::test]
    async fn test_arguments_done_is_answered_not_forwarded() {
        let (mut interceptor, verification) = interceptor();
        let result = interceptor.intercept(&arguments_done("call_a")).await;

        assert!(!result.forward);
        assert_eq!(result.replies.len(), 2);
        let item = to_json(&result.replies[0]);
        assert_eq!(item["type"], "conversation.item.create");
        assert_eq!(item["item"]["type"], "function_call_output");
        assert_eq!(item["item"]["call_id"], "call_a");
        let output: Value =
            serde_json::from_str(item["item"]["output"].as_str().unwrap()).unwrap();
        assert_eq!(output, json!({"verified": true}));
        assert_eq!(to_json(&result.replies[1])["type"], "response.create");
        assert!(verification.is_verified("session-1").await);
    }

    #[tokio::test]
    async fn test_response_done_answered_then_forwarded() {
        let (mut interceptor, _) = interceptor();
        let frame = json!({
            "type": "response.done",
            "response": {
                "id": "resp_2",
                "status": "completed",
                "output": [
                    {"type": "message", "id": "msg_1"},
                    {
                        "type": "function_call",
                        "id": "item_2",
                        "call_id": "call_b",
                        "name": "get_pc_coverage_info",
                        "arguments": "{\"coverage_type\":\"auto\"}"
                    }
                ]
            }
        })
        .to_string();

        let result = interceptor.intercept(&frame).await;
        assert!(result.forward);
        assert_eq!(result.replies.len(), 2);
        assert_eq!(to_json(&result.replies[0])["item"]["call_id"], "call_b");
    }

    #[tokio::test]
    async fn test_malformed_output_item_does_not_block_other_calls() {
        let (mut interceptor, _) = interceptor();
        let frame = json!({
            "type": "response.done",
            "response": {"id": "resp_4", "output": [
                {"type": "function_call", "call_id": "call_x", "name": "verify_customer", "arguments": {"email": 1}},
                {
                    "type": "function_call",
                    "call_id": "call_y",
                    "name": "get_pc_coverage_info",
                    "arguments": "{\"coverage_type\":\"auto\"}"
                }
            ]}
        })
        .to_string();

        let result = interceptor.intercept(&frame).await;
        assert!(result.forward);
        assert_eq!(result.replies.len(), 2);
        assert_eq!(to_json(&result.replies[0])["item"]["call_id"], "call_y");
        assert_eq!(interceptor.answered_count(), 1);
    }

    #[tokio::test]
    async fn test_non_string_type_is_forwarded() {
        let (mut interceptor, _) = interceptor();
        let result = interceptor.intercept(r#"{"type":5,"x":1}"#).await;
        assert!(result.forward);
        assert!(result.replies.is_empty());
    }

    #[tokio::test]
    async fn test_same_call_reported_twice_is_answered_once() {
        let (mut interceptor, _) = interceptor();
        let first = interceptor.intercept(&arguments_done("call_c")).await;
        assert_eq!(first.replies.len(), 2);

        let done = json!({
            "type": "response.done",
            "response": {"id": "resp_1", "output": [{
                "type": "function_call",
                "call_id": "call_c",
                "name": "verify_customer",
                "arguments": "{}"
            }]}
        })
        .to_string();
        let second = interceptor.intercept(&done).await;
        assert!(second.forward);
        assert!(second.replies.is_empty());
        assert_eq!(interceptor.answered_count(), 1);
    }

    #[tokio::test]
    async fn test_legacy_tool_calls_list() {
        let (mut interceptor, _) = interceptor();
        let frame = json!({
            "type": "response.tool_calls",
            "tool_calls": [
                {"call_id": "call_d", "function": {"name": "get_pc_coverage_info", "arguments": "{\"coverage_type\":\"home\"}"}},
                {"id": "call_e", "function": {"name": "unknown_tool", "arguments": "{}"}}
            ]
        })
        .to_string();

        let result = interceptor.intercept(&frame).await;
        assert!(!result.forward);
        assert_eq!(result.replies.len(), 4);
        assert_eq!(to_json(&result.replies[0])["item"]["call_id"], "call_d");
        assert_eq!(to_json(&result.replies[2])["item"]["call_id"], "call_e");
        let output: Value = serde_json::from_str(
            to_json(&result.replies[2])["item"]["output"].as_str().unwrap(),
        )
        .unwrap();
        assert_eq!(output["error"], "unsupported_capability");
    }

    #[tokio::test]
    async fn test_call_without_call_id_is_skipped() {
        let (mut interceptor, _) = interceptor();
        let frame = json!({
            "type": "response.done",
            "response": {"id": "resp_3", "output": [{
                "type": "function_call",
                "name": "verify_customer",
                "arguments": "{}"
            }]}
        })
        .to_string();

        let result = interceptor.intercept(&frame).await;
        assert!(result.forward);
        assert!(result.replies.is_empty());
        assert_eq!(interceptor.answered_count(), 0);
    }
}
