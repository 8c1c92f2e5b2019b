//! Speech-to-text collaborator

use async_trait::async_trait;

use crate::voice::samples_to_wav;
use crate::{Error, Result};

/// Transcription collaborator: audio samples in, text out.
///
/// A transcription failure aborts the current turn before any memory
/// append (`Error::Transcription`).
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe mono f32 samples at the given rate
    async fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String>;
}

/// Response from a Whisper-compatible transcription endpoint
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// HTTP client for any Whisper-compatible `/audio/transcriptions` endpoint
/// (OpenAI, or a local whisper.cpp / faster-whisper server)
pub struct WhisperClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl WhisperClient {
    /// Create a transcription client; `api_key` may be `None` for local
    /// servers that skip auth
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String> {
        let wav = samples_to_wav(samples, sample_rate)
            .map_err(|e| Error::Transcription(e.to_string()))?;
        tracing::debug!(audio_bytes = wav.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let url = format!("{}/audio/transcriptions", self.base_url);
        let mut builder = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transcription(format!("transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transcription(format!(
                "transcription error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("malformed transcription response: {e}")))?;

        let transcript = result.text.trim().to_string();
        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}
