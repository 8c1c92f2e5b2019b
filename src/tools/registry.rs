//! Tool registry — maps tool names to implementations and schemas
//!
//! Registration happens once at startup; afterwards the registry is shared
//! read-only behind `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{Error, Result};

/// Declared type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// JSON string
    String,
    /// JSON integer
    Integer,
    /// JSON number (integer or float)
    Number,
    /// JSON boolean
    Boolean,
}

impl ParamKind {
    /// JSON Schema type name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Whether a JSON value satisfies this kind
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// One declared tool parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name
    pub name: &'static str,
    /// Expected JSON type
    pub kind: ParamKind,
    /// Whether the model must supply this parameter
    pub required: bool,
    /// Model-facing description
    pub description: &'static str,
}

impl ParamSpec {
    /// A required parameter
    #[must_use]
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    /// An optional parameter
    #[must_use]
    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

/// An external capability the model may invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique registry key
    fn name(&self) -> &str;
    /// Model-facing description
    fn description(&self) -> &str;
    /// Declared argument schema, used for validation and the model-facing
    /// tool list; empty for parameterless tools
    fn parameters(&self) -> Vec<ParamSpec>;
    /// Execute with validated arguments, returning result text.
    ///
    /// # Errors
    ///
    /// Implementation faults are recovered by the executor as failed
    /// `ToolResult`s; they never become process faults.
    async fn call(&self, arguments: &Value) -> Result<String>;

    /// OpenAI-style function schema built from the declared parameters
    fn schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in self.parameters() {
            properties.insert(
                param.name.to_string(),
                json!({"type": param.kind.as_str(), "description": param.description}),
            );
            if param.required {
                required.push(param.name);
            }
        }
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

/// Closed mapping from tool name to implementation
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateTool` if the name is already taken; the
    /// existing registration wins. Name collisions are a startup-time
    /// fatal condition for callers.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Look up a tool by name
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownTool` if no tool is registered under `name`
    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i]))
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Model-facing tool schemas in registration order
    #[must_use]
    pub fn specs(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether any tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl std::fmt::Debug for dyn Tool {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Tool").field("name", &self.name()).finish()
        }
    }

    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::required(
                "text",
                ParamKind::String,
                "Text to echo",
            )]
        }

        async fn call(&self, arguments: &Value) -> Result<String> {
            Ok(arguments["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[test]
    fn get_returns_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "echo" })).unwrap();

        let tool = registry.get("echo").unwrap();
        assert_eq!(tool.name(), "echo");
    }

    #[test]
    fn duplicate_registration_fails_deterministically() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "echo" })).unwrap();

        let err = registry.register(Arc::new(EchoTool { name: "echo" })).unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_tool_lookup_fails() {
        let registry = ToolRegistry::new();
        let err = registry.get("bogus_tool").unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "bogus_tool"));
    }

    #[test]
    fn specs_preserve_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "b_tool" })).unwrap();
        registry.register(Arc::new(EchoTool { name: "a_tool" })).unwrap();

        let names: Vec<String> = registry
            .specs()
            .iter()
            .map(|s| s.pointer("/function/name").unwrap().as_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["b_tool", "a_tool"]);
    }

    #[test]
    fn schema_includes_required_parameters() {
        let tool = EchoTool { name: "echo" };
        let schema = tool.schema();
        assert_eq!(schema["function"]["name"], "echo");
        assert_eq!(schema["function"]["parameters"]["required"][0], "text");
        assert_eq!(
            schema["function"]["parameters"]["properties"]["text"]["type"],
            "string"
        );
    }
}
