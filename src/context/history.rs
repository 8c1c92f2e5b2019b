//! Ordered conversation log
//!
//! One `ConversationMemory` per session, owned by the orchestrator
//! (single writer). Turns are immutable once appended.

use serde::{Deserialize, Serialize};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Summary turn inserted by compaction
    System,
    /// Transcribed user speech
    User,
    /// Model output (final answer or tool-call request)
    Assistant,
    /// Result of a tool invocation
    Tool,
}

impl Role {
    /// Wire/display name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A model-requested tool invocation recorded on an assistant turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Registered tool name
    pub name: String,
    /// Argument mapping as supplied by the model
    pub arguments: serde_json::Value,
}

/// One role-tagged unit of conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub role: Role,
    /// Turn text (tool output for `Role::Tool`)
    pub content: String,
    /// Present when an assistant turn requests a tool call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    /// Name of the tool that produced a `Role::Tool` turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Turn {
    /// A user turn from a transcript
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call: None,
            tool_name: None,
        }
    }

    /// A final assistant answer
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call: None,
            tool_name: None,
        }
    }

    /// An assistant turn requesting a tool invocation
    #[must_use]
    pub fn tool_request(call: ToolCall) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_call: Some(call),
            tool_name: None,
        }
    }

    /// A tool result turn
    #[must_use]
    pub fn tool_result(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: output.into(),
            tool_call: None,
            tool_name: Some(tool_name.into()),
        }
    }

    /// A compaction summary turn
    #[must_use]
    pub fn summary(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call: None,
            tool_name: None,
        }
    }

    /// Rough token cost of this turn (chars / 4 heuristic)
    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        let call_chars = self
            .tool_call
            .as_ref()
            .map_or(0, |c| c.name.len() + c.arguments.to_string().len());
        (self.content.len() + call_chars) / 4 + 4
    }
}

/// Ordered log of turns with a running size estimate
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
    estimated_tokens: usize,
}

impl ConversationMemory {
    /// Create an empty conversation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and recompute the size estimate
    pub fn append(&mut self, turn: Turn) {
        self.estimated_tokens += turn.estimated_tokens();
        self.turns.push(turn);
    }

    /// Read-only view of the turns, oldest first
    #[must_use]
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turn, if any
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Current token estimate
    #[must_use]
    pub const fn estimated_tokens(&self) -> usize {
        self.estimated_tokens
    }

    /// Replace the prefix `[0, count)` with a single summary turn.
    ///
    /// Used only by compaction; the caller guarantees `count` leaves the
    /// protected tail untouched. Recomputes the size estimate from scratch.
    pub(crate) fn replace_prefix_with_summary(&mut self, count: usize, summary: Turn) {
        debug_assert!(count <= self.turns.len());
        self.turns.splice(..count, std::iter::once(summary));
        self.estimated_tokens = self.turns.iter().map(Turn::estimated_tokens).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_updates_estimate() {
        let mut memory = ConversationMemory::new();
        assert_eq!(memory.estimated_tokens(), 0);

        memory.append(Turn::user("what's the CPU usage"));
        let after_one = memory.estimated_tokens();
        assert!(after_one > 0);

        memory.append(Turn::assistant("CPU usage is 12%."));
        assert!(memory.estimated_tokens() > after_one);
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn snapshot_preserves_order() {
        let mut memory = ConversationMemory::new();
        memory.append(Turn::user("one"));
        memory.append(Turn::assistant("two"));
        memory.append(Turn::tool_result("system_info", "three"));

        let roles: Vec<Role> = memory.snapshot().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool]);
    }

    #[test]
    fn replace_prefix_recomputes_estimate() {
        let mut memory = ConversationMemory::new();
        for i in 0..6 {
            memory.append(Turn::user(format!("message number {i} with some length")));
        }
        let before = memory.estimated_tokens();

        memory.replace_prefix_with_summary(4, Turn::summary("short"));
        assert_eq!(memory.len(), 3);
        assert!(memory.estimated_tokens() < before);
        assert_eq!(memory.snapshot()[0].role, Role::System);
    }

    #[test]
    fn tool_request_carries_call() {
        let turn = Turn::tool_request(ToolCall {
            name: "web_search".to_string(),
            arguments: serde_json::json!({"query": "weather"}),
        });
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.tool_call.as_ref().unwrap().name, "web_search");
    }
}
