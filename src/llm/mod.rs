//! Language model collaborator interface
//!
//! The orchestrator only sees `TurnOutput`: every completion is classified
//! as either a final answer or a tool-call request before it crosses this
//! boundary. Classification is fail-open — text that does not parse as a
//! tool call is a final answer, never an error.

mod openai;

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;

use crate::context::ToolCall;
use crate::Result;

pub use openai::CompletionClient;

/// One message in the model-facing prompt
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// A system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// A user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// An assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Classified model output: always exactly one of the two shapes
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutput {
    /// Terminal answer text for this turn
    Final(String),
    /// Request to invoke a registered tool
    ToolCall(ToolCall),
}

/// Turn-completion collaborator
///
/// Implementations must return a classified `TurnOutput`; transport or
/// decoding failures map to `Error::Model` and abort the current turn.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete the conversation; `tool_schemas` lists the tools the model
    /// may request (empty for plain completions such as summarization).
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tool_schemas: &[serde_json::Value],
    ) -> Result<TurnOutput>;
}

/// Matches the tool-call convention the system prompt asks for:
/// `{"tool": "name", "args": {...}}` anywhere in the output.
fn tool_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\s*"tool"\s*:\s*"[^"]+"\s*,\s*"args"\s*:\s*\{[^{}]*\}\s*\}"#)
            .expect("tool call regex is valid")
    })
}

/// Classify raw model text into a `TurnOutput`.
///
/// Fail-open: anything that does not contain a well-formed tool-call JSON
/// object is treated as a final answer, including malformed near-misses.
#[must_use]
pub fn classify_output(raw: &str) -> TurnOutput {
    #[derive(serde::Deserialize)]
    struct WireToolCall {
        tool: String,
        #[serde(default)]
        args: serde_json::Value,
    }

    let Some(matched) = tool_call_regex().find(raw) else {
        return TurnOutput::Final(raw.to_string());
    };

    match serde_json::from_str::<WireToolCall>(matched.as_str()) {
        Ok(call) => {
            let arguments = if call.args.is_object() {
                call.args
            } else {
                serde_json::Value::Object(serde_json::Map::new())
            };
            TurnOutput::ToolCall(ToolCall {
                name: call.tool,
                arguments,
            })
        }
        Err(e) => {
            tracing::debug!(error = %e, "tool-call shaped output failed to parse, treating as final");
            TurnOutput::Final(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_final() {
        let out = classify_output("The capital of France is Paris.");
        assert_eq!(
            out,
            TurnOutput::Final("The capital of France is Paris.".to_string())
        );
    }

    #[test]
    fn tool_call_json_is_extracted() {
        let out = classify_output(r#"{"tool": "system_info", "args": {}}"#);
        let TurnOutput::ToolCall(call) = out else {
            panic!("expected tool call");
        };
        assert_eq!(call.name, "system_info");
        assert!(call.arguments.as_object().unwrap().is_empty());
    }

    #[test]
    fn tool_call_embedded_in_prose_is_extracted() {
        let out = classify_output(
            r#"Let me check that. {"tool": "web_search", "args": {"query": "weather paris"}} done"#,
        );
        let TurnOutput::ToolCall(call) = out else {
            panic!("expected tool call");
        };
        assert_eq!(call.name, "web_search");
        assert_eq!(call.arguments["query"], "weather paris");
    }

    #[test]
    fn malformed_tool_call_fails_open() {
        // Looks tool-ish but has no args object; must not crash or error
        let raw = r#"{"tool": "oops""#;
        assert_eq!(classify_output(raw), TurnOutput::Final(raw.to_string()));
    }

    #[test]
    fn speak_tagged_answer_is_final() {
        let raw = "<speak>It's 3 PM.</speak>";
        assert_eq!(classify_output(raw), TurnOutput::Final(raw.to_string()));
    }
}
