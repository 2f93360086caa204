//! Locally executed tools.
//!
//! The catalog declares the tools to the upstream model; the dispatcher runs
//! them under the verification and classification policy.

mod catalog;
mod coverage;
mod dispatcher;

pub use catalog::{ToolName, tool_definitions};
pub use coverage::resolve_topic;
pub use dispatcher::{InvocationRequest, OutcomeStatus, ToolDispatcher, ToolOutcome};
