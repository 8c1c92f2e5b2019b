//! Error types for sotto

use thiserror::Error;

/// Result type alias for sotto operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sotto
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error; aborts the current turn before any memory append
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Text-to-speech or playback error; non-fatal to orchestration
    #[error("playback error: {0}")]
    Playback(String),

    /// Language model completion error; fatal to the current turn only
    #[error("model error: {0}")]
    Model(String),

    /// History compaction error; non-fatal, the pass is skipped
    #[error("compaction error: {0}")]
    Compaction(String),

    /// Tool name registered twice; startup-time fatal
    #[error("duplicate tool: {0}")]
    DuplicateTool(String),

    /// Tool name not present in the registry
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool execution fault (validation, runtime, timeout)
    #[error("tool error: {0}")]
    Tool(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
