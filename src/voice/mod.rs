//! Voice pipeline: capture, transcription, synthesis, and playback

mod capture;
mod output;
mod playback;
mod stt;
mod tts;

pub use capture::{samples_to_wav, AudioCapture, SAMPLE_RATE};
pub use output::{extract_speech_text, split_sentences, SpeechOutput};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE};
pub use stt::{Transcriber, WhisperClient};
pub use tts::{SpeechClient, SpeechSynthesizer};
