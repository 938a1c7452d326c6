use serde::{Deserialize, Serialize};

/// Name of the lead-capture function the assistant calls once it has
/// learned the user's name.
pub const LEAD_TOOL_NAME: &str = "lead";

/// Function tool definition as registered on the remote assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// Wire form of a function tool (`{"type": "function", "function": {...}}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolDefinition,
}

impl From<ToolDefinition> for FunctionTool {
    fn from(function: ToolDefinition) -> Self {
        Self {
            kind: "function".into(),
            function,
        }
    }
}

/// The `lead` function: one required string parameter, `name`.
pub fn lead_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: LEAD_TOOL_NAME.into(),
        description: "Register a new lead with the customer's name once it is known.".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Customer's full name" }
            },
            "required": ["name"]
        }),
    }
}
