//! Turn orchestration: one user utterance through the tool-calling loop

mod orchestrator;

use async_trait::async_trait;

use crate::Result;

pub use orchestrator::{Orchestrator, OrchestratorConfig};

/// Consumer of finalized answer text, normally the speech output
/// coordinator. `speak` returns once the text is fully queued/played so
/// the next capture cycle cannot record the assistant's own voice.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    /// Deliver the answer; errors are playback failures, never fatal to
    /// orchestration
    async fn speak(&self, text: &str) -> Result<()>;
}
