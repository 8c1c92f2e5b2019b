//! Tool executor — validates and dispatches model-requested tool calls
//!
//! Tool failures are data, not exceptions: every fault (unknown name,
//! schema violation, timeout, implementation error) is normalized into a
//! failed `ToolResult` and fed back to the model.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::ToolCall;
use crate::tools::ToolRegistry;

/// Marker appended when tool output exceeds the configured cap
const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Execution limits for a single tool call
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Wall-time budget per call; a timed-out call is abandoned, its
    /// side effects are not rolled back
    pub timeout: Duration,
    /// Cap on result text length, protecting the next prompt's budget
    pub max_output_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_output_chars: 4000,
        }
    }
}

/// Normalized outcome of one tool call
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Whether the call completed without fault
    pub success: bool,
    /// Result text on success, error description otherwise
    pub output: String,
    /// Wall time spent in the call
    pub elapsed: Duration,
}

/// Dispatches tool calls against the registry under a time budget
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl ToolExecutor {
    /// Create a new executor over a shared registry
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Execute a tool call. Never returns an error: all faults become a
    /// `ToolResult` with `success == false`.
    pub async fn execute(&self, request: &ToolCall) -> ToolResult {
        let start = Instant::now();

        let tool = match self.registry.get(&request.name) {
            Ok(tool) => tool,
            Err(e) => {
                tracing::warn!(tool = %request.name, "tool call to unregistered tool");
                return Self::failure(e.to_string(), start);
            }
        };

        if let Err(reason) = validate_arguments(tool.as_ref(), &request.arguments) {
            tracing::warn!(tool = %request.name, %reason, "tool argument validation failed");
            return Self::failure(format!("validation: {reason}"), start);
        }

        match tokio::time::timeout(self.config.timeout, tool.call(&request.arguments)).await {
            Err(_) => {
                tracing::warn!(
                    tool = %request.name,
                    timeout_secs = self.config.timeout.as_secs(),
                    "tool call timed out"
                );
                Self::failure(
                    format!("timeout: tool did not finish within {:?}", self.config.timeout),
                    start,
                )
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %request.name, error = %e, "tool call failed");
                Self::failure(e.to_string(), start)
            }
            Ok(Ok(output)) => {
                let elapsed = start.elapsed();
                tracing::debug!(
                    tool = %request.name,
                    chars = output.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "tool call complete"
                );
                ToolResult {
                    success: true,
                    output: truncate(output, self.config.max_output_chars),
                    elapsed,
                }
            }
        }
    }

    fn failure(output: String, start: Instant) -> ToolResult {
        ToolResult {
            success: false,
            output,
            elapsed: start.elapsed(),
        }
    }
}

/// Check an argument mapping against the tool's declared parameters
fn validate_arguments(
    tool: &dyn crate::tools::Tool,
    arguments: &serde_json::Value,
) -> std::result::Result<(), String> {
    let Some(map) = arguments.as_object() else {
        return Err("arguments must be an object".to_string());
    };

    let params = tool.parameters();

    for param in &params {
        match map.get(param.name) {
            None if param.required => {
                return Err(format!("missing required parameter '{}'", param.name));
            }
            Some(value) if !param.kind.matches(value) => {
                return Err(format!(
                    "parameter '{}' must be of type {}",
                    param.name,
                    param.kind.as_str()
                ));
            }
            _ => {}
        }
    }

    for key in map.keys() {
        if !params.iter().any(|p| p.name == key) {
            return Err(format!("unexpected parameter '{key}'"));
        }
    }

    Ok(())
}

/// Truncate output to the cap, appending a marker on a char boundary
fn truncate(mut text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(i, _)| i);
    text.truncate(cut);
    text.push_str(TRUNCATION_MARKER);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamKind, ParamSpec, Tool};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct GreetTool;

    #[async_trait]
    impl Tool for GreetTool {
        fn name(&self) -> &str {
            "greet"
        }

        fn description(&self) -> &str {
            "Greet someone by name"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::required("name", ParamKind::String, "Who to greet"),
                ParamSpec::optional("times", ParamKind::Integer, "Repetitions"),
            ]
        }

        async fn call(&self, arguments: &Value) -> crate::Result<String> {
            Ok(format!("hello {}", arguments["name"].as_str().unwrap_or("?")))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Sleeps"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        async fn call(&self, _arguments: &Value) -> crate::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("done".to_string())
        }
    }

    struct FaultyTool;

    #[async_trait]
    impl Tool for FaultyTool {
        fn name(&self) -> &str {
            "faulty"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        async fn call(&self, _arguments: &Value) -> crate::Result<String> {
            Err(crate::Error::Tool("disk on fire".to_string()))
        }
    }

    struct VerboseTool;

    #[async_trait]
    impl Tool for VerboseTool {
        fn name(&self) -> &str {
            "verbose"
        }

        fn description(&self) -> &str {
            "Returns a lot of text"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        async fn call(&self, _arguments: &Value) -> crate::Result<String> {
            Ok("x".repeat(10_000))
        }
    }

    fn executor_with(tools: Vec<Arc<dyn Tool>>, config: ExecutorConfig) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool).unwrap();
        }
        ToolExecutor::new(Arc::new(registry), config)
    }

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            arguments: args,
        }
    }

    #[tokio::test]
    async fn successful_call_returns_output() {
        let executor = executor_with(vec![Arc::new(GreetTool)], ExecutorConfig::default());
        let result = executor.execute(&call("greet", json!({"name": "ada"}))).await;
        assert!(result.success);
        assert_eq!(result.output, "hello ada");
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failed_result() {
        let executor = executor_with(vec![], ExecutorConfig::default());
        let result = executor.execute(&call("bogus_tool", json!({}))).await;
        assert!(!result.success);
        assert!(result.output.contains("unknown tool"));
        assert!(result.output.contains("bogus_tool"));
    }

    #[tokio::test]
    async fn missing_required_argument_fails_validation() {
        let executor = executor_with(vec![Arc::new(GreetTool)], ExecutorConfig::default());
        let result = executor.execute(&call("greet", json!({}))).await;
        assert!(!result.success);
        assert!(result.output.starts_with("validation:"));
        assert!(result.output.contains("name"));
    }

    #[tokio::test]
    async fn mistyped_argument_fails_validation() {
        let executor = executor_with(vec![Arc::new(GreetTool)], ExecutorConfig::default());
        let result = executor
            .execute(&call("greet", json!({"name": "ada", "times": "three"})))
            .await;
        assert!(!result.success);
        assert!(result.output.contains("integer"));
    }

    #[tokio::test]
    async fn extra_argument_fails_validation() {
        let executor = executor_with(vec![Arc::new(GreetTool)], ExecutorConfig::default());
        let result = executor
            .execute(&call("greet", json!({"name": "ada", "volume": 11})))
            .await;
        assert!(!result.success);
        assert!(result.output.contains("unexpected parameter 'volume'"));
    }

    #[tokio::test]
    async fn hung_tool_times_out() {
        let config = ExecutorConfig {
            timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let executor = executor_with(vec![Arc::new(SlowTool)], config);
        let result = executor.execute(&call("slow", json!({}))).await;
        assert!(!result.success);
        assert!(result.output.contains("timeout"));
    }

    #[tokio::test]
    async fn implementation_fault_is_recovered() {
        let executor = executor_with(vec![Arc::new(FaultyTool)], ExecutorConfig::default());
        let result = executor.execute(&call("faulty", json!({}))).await;
        assert!(!result.success);
        assert!(result.output.contains("disk on fire"));
    }

    #[tokio::test]
    async fn long_output_is_truncated_with_marker() {
        let config = ExecutorConfig {
            max_output_chars: 100,
            ..Default::default()
        };
        let executor = executor_with(vec![Arc::new(VerboseTool)], config);
        let result = executor.execute(&call("verbose", json!({}))).await;
        assert!(result.success);
        assert!(result.output.ends_with(TRUNCATION_MARKER));
        assert!(result.output.len() < 200);
    }
}
