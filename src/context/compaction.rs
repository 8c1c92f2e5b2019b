//! History compaction
//!
//! When the conversation's token estimate exceeds a threshold, the oldest
//! turns outside a protected tail window are summarized via the language
//! model and replaced with a single system summary turn. The summary is
//! best-effort: it preserves referenced facts approximately, not exactly.

use std::sync::Arc;
use std::time::Duration;

use crate::context::{ConversationMemory, Turn};
use crate::llm::{ChatMessage, LanguageModel, TurnOutput};
use crate::{Error, Result};

const SUMMARIZE_INSTRUCTION: &str = "Summarize the following conversation concisely, \
     preserving key facts, decisions, and user preferences. Keep it under 200 words.";

/// Configuration for history compaction
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Trigger compaction when the token estimate exceeds this
    pub max_tokens: usize,
    /// Number of most recent turns compaction never touches
    pub protected_tail: usize,
    /// Fraction of eligible turns summarized per pass (0.0–1.0)
    pub compact_fraction: f64,
    /// Timeout for the LLM summarization call
    pub summarize_timeout: Duration,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            max_tokens: 3072,
            // Covers a full exchange including one tool round-trip
            protected_tail: 4,
            compact_fraction: 0.5,
            summarize_timeout: Duration::from_secs(60),
        }
    }
}

impl CompactionConfig {
    /// Build from environment variables with fallback to defaults
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SOTTO_COMPACT_MAX_TOKENS") {
            if let Ok(n) = val.parse() {
                config.max_tokens = n;
            }
        }

        if let Ok(val) = std::env::var("SOTTO_COMPACT_PROTECTED_TAIL") {
            if let Ok(n) = val.parse() {
                config.protected_tail = n;
            }
        }

        config
    }
}

/// Result of a compaction invocation
#[derive(Debug, Default)]
pub struct CompactionResult {
    /// Net number of turns removed across all passes
    pub turns_removed: usize,
    /// Number of summarization passes that ran
    pub passes: usize,
}

/// Summarizes old turns to keep the conversation within its budget
pub struct Compactor {
    config: CompactionConfig,
    model: Arc<dyn LanguageModel>,
}

impl Compactor {
    /// Create a new compactor
    #[must_use]
    pub fn new(config: CompactionConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self { config, model }
    }

    /// Whether the memory is currently over its budget
    #[must_use]
    pub fn over_budget(&self, memory: &ConversationMemory) -> bool {
        memory.estimated_tokens() > self.config.max_tokens
    }

    /// Compact the memory if it is over budget.
    ///
    /// Repeats while still over the threshold and at least two turns remain
    /// outside the protected tail; stopping while still over budget is not
    /// an error. The protected tail is never modified or reordered.
    ///
    /// # Errors
    ///
    /// Returns `Error::Compaction` if summarization fails or times out.
    /// Callers should treat this as non-fatal and continue uncompacted.
    pub async fn maybe_compact(
        &self,
        memory: &mut ConversationMemory,
    ) -> Result<CompactionResult> {
        let mut result = CompactionResult::default();

        while self.over_budget(memory) {
            let eligible = memory.len().saturating_sub(self.config.protected_tail);
            if eligible < 2 {
                break;
            }

            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let count = ((eligible as f64 * self.config.compact_fraction).ceil() as usize)
                .clamp(2, eligible);

            let summary_text = self.summarize(&memory.snapshot()[..count]).await?;
            let summary = Turn::summary(format!("[Conversation summary]\n{summary_text}"));
            memory.replace_prefix_with_summary(count, summary);

            result.turns_removed += count - 1;
            result.passes += 1;

            tracing::info!(
                summarized = count,
                remaining = memory.len(),
                tokens = memory.estimated_tokens(),
                "conversation compacted"
            );
        }

        Ok(result)
    }

    /// Summarize a block of turns via the model with a fixed instruction
    async fn summarize(&self, turns: &[Turn]) -> Result<String> {
        let conversation_text = turns
            .iter()
            .map(|t| match &t.tool_call {
                Some(call) => format!("{}: [called tool {}]", t.role.as_str(), call.name),
                None => format!("{}: {}", t.role.as_str(), t.content),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!("{SUMMARIZE_INSTRUCTION}\n\n{conversation_text}");
        let messages = [ChatMessage::user(prompt)];

        let output = tokio::time::timeout(
            self.config.summarize_timeout,
            self.model.complete(&messages, &[]),
        )
        .await
        .map_err(|_| Error::Compaction("summarization timed out".to_string()))?
        .map_err(|e| Error::Compaction(format!("summarization failed: {e}")))?;

        match output {
            TurnOutput::Final(text) => Ok(text),
            TurnOutput::ToolCall(call) => Err(Error::Compaction(format!(
                "summarizer requested tool {} instead of text",
                call.name
            ))),
        }
    }
}
