//! Tool catalog: the closed set of capabilities the assistant may call.

use serde_json::json;

use crate::core::realtime::openai::ToolDef;

/// Capabilities the gateway answers locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// Identity verification against customer records
    VerifyCustomer,
    /// All policies held by a verified customer
    GetCustomerPolicies,
    /// Coverage reference text by coverage keyword
    GetCoverageInfo,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::VerifyCustomer,
        ToolName::GetCustomerPolicies,
        ToolName::GetCoverageInfo,
    ];

    /// Resolve a wire name. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "verify_customer" => Some(Self::VerifyCustomer),
            "get_customer_policies" => Some(Self::GetCustomerPolicies),
            "get_pc_coverage_info" => Some(Self::GetCoverageInfo),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerifyCustomer => "verify_customer",
            Self::GetCustomerPolicies => "get_customer_policies",
            Self::GetCoverageInfo => "get_pc_coverage_info",
        }
    }

    /// Function definition declared to the upstream model.
    pub fn definition(&self) -> ToolDef {
        let (description, parameters) = match self {
            Self::VerifyCustomer => (
                "Verify P&C insurance customer identity",
                json!({
                    "type": "object",
                    "properties": {
                        "email": {"type": "string"},
                        "full_name": {"type": "string"},
                        "last4": {"type": "string"},
                        "order_id": {"type": "string"}
                    },
                    "required": ["email"]
                }),
            ),
            Self::GetCustomerPolicies => (
                "Get all P&C policies (auto, home, commercial, umbrella) for verified customer",
                json!({
                    "type": "object",
                    "properties": {"email": {"type": "string"}},
                    "required": ["email"]
                }),
            ),
            Self::GetCoverageInfo => (
                "Get P&C coverage information by type (auto, homeowners, commercial, liability, claims)",
                json!({
                    "type": "object",
                    "properties": {
                        "coverage_type": {
                            "type": "string",
                            "enum": ["auto", "homeowners", "commercial", "liability", "claims"]
                        }
                    },
                    "required": ["coverage_type"]
                }),
            ),
        };

        ToolDef {
            tool_type: "function".to_string(),
            name: self.as_str().to_string(),
            description: Some(description.to_string()),
            parameters: Some(parameters),
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definitions for every catalog entry, in declaration order.
pub fn tool_definitions() -> Vec<ToolDef> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}
