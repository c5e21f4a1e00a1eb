// Tool definitions for Messages API tool use.
//
// A tool is described to the model by name, description and a JSON schema
// generated from a Rust type. Callable tools implement `Tool`; the structured
// output of a flow is also offered as a tool (see `flows`).

use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    Unknown(String),

    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    #[error("tool failed: {0}")]
    Failed(String),
}

/// What the API needs to know about a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Build a definition whose input schema is generated from `T`.
    pub fn for_input<T: JsonSchema>(name: &str, description: &str) -> Self {
        ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: schema_to_json_value::<T>(),
        }
    }
}

/// How the model may pick tools on a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    /// The model must call some tool.
    Any,
    Tool { name: String },
}

/// Generate a JSON schema for `T` in the shape the API accepts: an object
/// schema without the `$schema` meta key.
pub fn schema_to_json_value<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| {
        serde_json::json!({ "type": "object" })
    });
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.entry("type").or_insert_with(|| Value::String("object".into()));
    }
    value
}

/// A function the model can call during a flow.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn call(&self, input: Value) -> Result<Value, ToolError>;
}

/// The callable tools offered to one flow.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.definition().name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn call(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.definition().name == name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;
        tool.call(input)
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.tools.iter().map(|t| t.definition().name).collect();
        f.debug_struct("ToolSet").field("tools", &names).finish()
    }
}
