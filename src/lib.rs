//! sotto - a local, turn-based voice assistant
//!
//! Press Enter, speak, and hear an answer. One utterance flows through a
//! fixed pipeline: capture → transcription → a tool-calling model loop →
//! speech synthesis and playback. The model, transcriber, and synthesizer
//! are collaborators behind traits; the defaults speak OpenAI-compatible
//! HTTP so local llama.cpp / whisper.cpp servers drop in unchanged.
//!
//! # Architecture
//!
//! - [`agent`]: per-utterance orchestrator and the speech sink seam
//! - [`context`]: conversation memory and summarizing compaction
//! - [`llm`]: language model trait, output classification, HTTP client
//! - [`tools`]: tool trait, registry, fault-isolating executor, builtins
//! - [`voice`]: capture, transcription, synthesis, streaming playback
//! - [`config`]: defaults, TOML overlay file, `SOTTO_*` env overrides

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod tools;
pub mod voice;

pub use agent::{Orchestrator, OrchestratorConfig, SpeechSink};
pub use config::Config;
pub use context::{CompactionConfig, Compactor, ConversationMemory, Turn};
pub use error::{Error, Result};
pub use llm::{CompletionClient, LanguageModel, TurnOutput};
pub use tools::{Tool, ToolExecutor, ToolRegistry};
