//! Per-utterance turn orchestrator
//!
//! Drives one transcribed utterance through: build prompt → call model →
//! dispatch tool or finalize → compact memory → speak. The orchestrator is
//! the only writer of its `ConversationMemory`.

use std::sync::Arc;

use crate::agent::SpeechSink;
use crate::context::{Compactor, ConversationMemory, Role, Turn};
use crate::llm::{ChatMessage, LanguageModel, TurnOutput};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::Result;

/// Phase of the per-turn state machine, for trace output
#[derive(Debug, Clone, Copy)]
enum TurnPhase {
    BuildingPrompt,
    CallingModel,
    DispatchingTool,
    Finalizing,
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum tool-call rounds per utterance before the fallback answer
    pub max_tool_iterations: usize,
    /// System prompt prepended to every model call
    pub system_prompt: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 5,
            system_prompt: "You are a locally running voice assistant. Be helpful, \
                concise, and accurate. Never guess system facts; call a tool instead. \
                Wrap spoken responses in <speak>...</speak> tags."
                .to_string(),
        }
    }
}

/// Drives user utterances to a terminal assistant turn
pub struct Orchestrator {
    memory: ConversationMemory,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    model: Arc<dyn LanguageModel>,
    compactor: Compactor,
    sink: Arc<dyn SpeechSink>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Assemble an orchestrator over its collaborators
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        executor: ToolExecutor,
        model: Arc<dyn LanguageModel>,
        compactor: Compactor,
        sink: Arc<dyn SpeechSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            memory: ConversationMemory::new(),
            registry,
            executor,
            model,
            compactor,
            sink,
            config,
        }
    }

    /// Read-only view of the conversation
    #[must_use]
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Run one full turn for a transcribed utterance and return the answer.
    ///
    /// On success the conversation always ends with a non-empty assistant
    /// turn, even when the iteration cap forces a fallback answer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Model` if a completion call fails. The user turn
    /// (and any completed tool rounds) stay in memory; no partial
    /// assistant turn is left behind.
    pub async fn run_turn(&mut self, transcript: &str) -> Result<String> {
        self.memory.append(Turn::user(transcript));
        let tool_schemas = self.registry.specs();

        let mut final_text = None;

        for iteration in 0..self.config.max_tool_iterations {
            tracing::trace!(phase = ?TurnPhase::BuildingPrompt, iteration);
            let messages = self.build_messages();

            tracing::trace!(phase = ?TurnPhase::CallingModel, iteration);
            let output = self.model.complete(&messages, &tool_schemas).await?;

            match output {
                TurnOutput::ToolCall(call) => {
                    tracing::trace!(phase = ?TurnPhase::DispatchingTool, iteration);
                    tracing::info!(tool = %call.name, iteration, "model requested tool");

                    self.memory.append(Turn::tool_request(call.clone()));
                    let result = self.executor.execute(&call).await;
                    let text = if result.success {
                        result.output
                    } else {
                        format!("Error: {}", result.output)
                    };
                    self.memory.append(Turn::tool_result(call.name, text));
                }
                TurnOutput::Final(text) => {
                    tracing::trace!(phase = ?TurnPhase::Finalizing, iteration);
                    let text = if text.trim().is_empty() {
                        // The closing assistant turn must be non-empty
                        "I don't have anything to say about that.".to_string()
                    } else {
                        text
                    };
                    self.memory.append(Turn::assistant(text.clone()));
                    final_text = Some(text);
                    break;
                }
            }
        }

        let answer = match final_text {
            Some(text) => text,
            None => {
                let fallback = format!(
                    "I wasn't able to complete that after {} tool calls.",
                    self.config.max_tool_iterations
                );
                tracing::warn!(
                    cap = self.config.max_tool_iterations,
                    "iteration cap reached, closing turn with fallback answer"
                );
                self.memory.append(Turn::assistant(fallback.clone()));
                fallback
            }
        };

        if let Err(e) = self.compactor.maybe_compact(&mut self.memory).await {
            tracing::warn!(error = %e, "compaction skipped, continuing uncompacted");
        }

        if let Err(e) = self.sink.speak(&answer).await {
            tracing::warn!(error = %e, "playback failed; answer is already committed");
        }

        Ok(answer)
    }

    /// Map the turn log onto the model-facing message list.
    ///
    /// Tool-request turns are rendered back as the tool-call JSON the model
    /// emitted; tool results ride on user messages, matching the wire
    /// convention the system prompt establishes.
    fn build_messages(&self) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(&self.config.system_prompt)];

        for turn in self.memory.snapshot() {
            match turn.role {
                Role::System => messages.push(ChatMessage::system(&turn.content)),
                Role::User => messages.push(ChatMessage::user(&turn.content)),
                Role::Assistant => match &turn.tool_call {
                    Some(call) => messages.push(ChatMessage::assistant(format!(
                        r#"{{"tool": "{}", "args": {}}}"#,
                        call.name, call.arguments
                    ))),
                    None => messages.push(ChatMessage::assistant(&turn.content)),
                },
                Role::Tool => messages.push(ChatMessage::user(format!(
                    "Tool result: {}\n\nAnswer the user briefly for voice output. \
                     Wrap the spoken response in <speak>...</speak> tags.",
                    turn.content
                ))),
            }
        }

        messages
    }
}
