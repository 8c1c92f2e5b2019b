//! Streaming speech output coordinator
//!
//! Splits the finalized answer into sentence chunks and synthesizes the
//! next chunk while the current one plays, so audio starts before the
//! whole answer is rendered. Chunks are queued strictly in read order and
//! `speak` returns only after the last chunk has finished playing.

use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::Mutex;

use crate::agent::SpeechSink;
use crate::voice::{AudioPlayback, SpeechSynthesizer};
use crate::{Error, Result};

/// Chunks shorter than this are merged with the following sentence;
/// very short synthesis calls sound choppy
const MIN_CHUNK_CHARS: usize = 40;

fn speak_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<speak>(.*?)</speak>").expect("speak tag regex is valid"))
}

/// Extract the spoken portion of an answer.
///
/// The model is instructed to wrap speech in `<speak>` tags; when present
/// the tagged content is spoken, otherwise the whole answer with any
/// stray tags removed.
#[must_use]
pub fn extract_speech_text(text: &str) -> String {
    if let Some(captures) = speak_tag_regex().captures(text) {
        let inner = captures[1].trim();
        if !inner.is_empty() {
            return inner.to_string();
        }
    }
    text.replace("<speak>", "").replace("</speak>", "").trim().to_string()
}

/// Split text into sentence chunks for incremental synthesis.
///
/// Boundaries fall after sentence terminators followed by whitespace, so
/// a chunk never ends mid-word. Short sentences are merged forward to
/// keep synthesis calls worthwhile.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?')
            && chars.peek().is_none_or(|next| next.is_whitespace())
            && current.trim().len() >= MIN_CHUNK_CHARS
        {
            chunks.push(current.trim().to_string());
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }
    chunks
}

/// Coordinates synthesis and playback of finalized answers
pub struct SpeechOutput {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: Mutex<AudioPlayback>,
}

impl SpeechOutput {
    /// Create a coordinator over a synthesizer and the default output device
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, playback: AudioPlayback) -> Self {
        Self {
            synthesizer,
            playback: Mutex::new(playback),
        }
    }
}

#[async_trait]
impl SpeechSink for SpeechOutput {
    async fn speak(&self, text: &str) -> Result<()> {
        let speech = extract_speech_text(text);
        if speech.is_empty() {
            return Ok(());
        }

        let chunks = split_sentences(&speech);
        tracing::debug!(chunks = chunks.len(), "speaking answer");

        let mut playback = self.playback.lock().await;

        // Synthesize chunk i+1 while chunk i plays; play order is the
        // chunk order, so read order is preserved.
        let mut pending = {
            let synth = Arc::clone(&self.synthesizer);
            let chunk = chunks[0].clone();
            tokio::spawn(async move { synth.synthesize(&chunk).await })
        };

        for next in chunks.into_iter().skip(1) {
            let audio = pending
                .await
                .map_err(|e| Error::Playback(format!("synthesis task failed: {e}")))??;
            pending = {
                let synth = Arc::clone(&self.synthesizer);
                tokio::spawn(async move { synth.synthesize(&next).await })
            };
            playback.play_mp3(&audio).await?;
        }

        let audio = pending
            .await
            .map_err(|e| Error::Playback(format!("synthesis task failed: {e}")))??;
        playback.play_mp3(&audio).await
    }
}
