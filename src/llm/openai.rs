//! OpenAI-compatible chat completions client
//!
//! Talks to any server implementing the chat completions API format —
//! a local llama.cpp / LM Studio instance by default, a hosted endpoint
//! when a base URL and key are configured. Tool schemas are embedded in
//! the system prompt and the reply is classified by `classify_output`,
//! so the server needs no native tool-calling support.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{classify_output, ChatMessage, LanguageModel, TurnOutput};
use crate::{Error, Result};

/// Chat completions request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

/// Chat completions response body (only the fields we read)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// HTTP language model collaborator
pub struct CompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionClient {
    /// Create a client for an OpenAI-compatible endpoint.
    ///
    /// `base_url` is the API root (e.g. `http://localhost:8080/v1`);
    /// `api_key` may be `None` for local servers that skip auth.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Format tool schemas into the system-prompt section the model is
    /// instructed to answer with.
    fn format_tools(tool_schemas: &[serde_json::Value]) -> String {
        let mut out = String::new();
        for schema in tool_schemas {
            let Some(func) = schema.get("function") else {
                continue;
            };
            let name = func.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let desc = func
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            out.push_str(&format!("  - {name}: {desc}\n"));
            if let Some(props) = func
                .pointer("/parameters/properties")
                .and_then(|v| v.as_object())
            {
                for (pname, pinfo) in props {
                    let ptype = pinfo.get("type").and_then(|v| v.as_str()).unwrap_or("string");
                    let pdesc = pinfo
                        .get("description")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    out.push_str(&format!("      - {pname} ({ptype}): {pdesc}\n"));
                }
            }
        }
        out
    }

    /// Raw completion call, returning the assistant message text
    async fn complete_text(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Model(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("completion error {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("malformed completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| Error::Model("completion response had no choices".to_string()))
    }
}

#[async_trait]
impl LanguageModel for CompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tool_schemas: &[serde_json::Value],
    ) -> Result<TurnOutput> {
        let mut prompt = messages.to_vec();
        if !tool_schemas.is_empty() {
            // Tools ride on the system prompt; prepend a section listing them
            let tools_text = Self::format_tools(tool_schemas);
            let header = format!(
                "For any action or lookup, answer with ONLY the JSON tool call \
                 {{\"tool\": \"tool_name\", \"args\": {{}}}}. Available tools:\n{tools_text}"
            );
            match prompt.first_mut() {
                Some(first) if first.role == "system" => {
                    first.content = format!("{}\n\n{header}", first.content);
                }
                _ => prompt.insert(0, ChatMessage::system(header)),
            }
        }

        let text = self.complete_text(&prompt).await?;
        tracing::debug!(chars = text.len(), "model completion received");
        Ok(classify_output(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_tools_lists_names_and_parameters() {
        let schema = serde_json::json!({
            "type": "function",
            "function": {
                "name": "find_files",
                "description": "Search for files by name",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "pattern": {"type": "string", "description": "Glob pattern"}
                    },
                    "required": ["pattern"]
                }
            }
        });

        let text = CompletionClient::format_tools(&[schema]);
        assert!(text.contains("find_files: Search for files by name"));
        assert!(text.contains("pattern (string): Glob pattern"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = CompletionClient::new("http://localhost:8080/v1/", None, "local", 256, 0.3);
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
