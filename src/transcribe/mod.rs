//! Speech-to-text transcription module
//!
//! Provides transcription via:
//! - Local whisper.cpp inference (whisper-rs crate)
//! - A whisper-cli subprocess fallback for systems where the FFI bindings
//!   don't build (e.g. newer glibc)
//! - Remote OpenAI-compatible Whisper API (whisper.cpp server, OpenAI, etc.)

pub mod cli;
pub mod remote;
pub mod whisper;

use crate::config::{WhisperConfig, WhisperMode};
use crate::error::TranscribeError;

/// A contiguous portion of the decoded window, as emitted by the ASR
/// model. `start < end`, both measured from the beginning of the sample
/// window passed into `transcribe_segments`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionSegment {
    pub start: f32,
    pub end: f32,
    pub text: String,
}

/// The full result of one decode pass: the ordered segments, their
/// concatenation, a detected language tag, and a confidence scalar in
/// `[0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionResult {
    pub segments: Vec<TranscriptionSegment>,
    pub text: String,
    pub language: String,
    pub confidence: f32,
}

impl TranscriptionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.text.trim().is_empty()
    }
}

/// A small curated set of stock phrases whisper.cpp hallucinates on
/// near-silent or noise-only input. Matched case-insensitively against
/// the full (trimmed) result text.
const HALLUCINATION_PHRASES: &[&str] = &[
    "thank you",
    "thanks for watching",
    "thank you for watching",
    "please subscribe",
    "subscribe",
    "music",
    "applause",
    "...",
    "you",
];

/// Whether a decoded text is one of the curated hallucination phrases, or
/// too short to be meaningful dictation.
pub fn is_hallucination(text: &str) -> bool {
    let cleaned = text.trim().to_lowercase();
    let cleaned = cleaned.trim_matches(|c: char| !c.is_alphanumeric() && c != ' ');
    cleaned.chars().count() < 3 || HALLUCINATION_PHRASES.contains(&cleaned)
}

/// Trait for speech-to-text implementations.
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples to text. Input: f32 samples, mono, 16kHz.
    fn transcribe(&self, samples: &[f32]) -> Result<String, TranscribeError>;

    /// Transcribe audio samples into a full [`TranscriptionResult`]
    /// (segments with timestamps, language, confidence). The default
    /// implementation wraps [`Transcriber::transcribe`]'s plain text into
    /// a single segment spanning the whole window; backends that expose
    /// real segment boundaries (whisper.cpp) override this directly.
    fn transcribe_segments(&self, samples: &[f32]) -> Result<TranscriptionResult, TranscribeError> {
        let text = self.transcribe(samples)?;
        if text.trim().is_empty() || is_hallucination(&text) {
            return Ok(TranscriptionResult::empty());
        }
        let duration = samples.len() as f32 / crate::audio::SAMPLE_RATE as f32;
        Ok(TranscriptionResult {
            segments: vec![TranscriptionSegment {
                start: 0.0,
                end: duration,
                text: text.clone(),
            }],
            text,
            language: "en".to_string(),
            confidence: 1.0,
        })
    }

    /// React to a settings-store change touching `model`, `device`, or
    /// `language`. The local whisper.cpp backend swaps in the new model
    /// path/GPU flag/language on the next decode; the CLI and remote
    /// backends are built once from `config.toml` and don't currently
    /// support this kind of hot swap, so they leave this as a no-op.
    fn reload_settings(&self, _settings: &crate::settings::SettingsStore) {}
}

/// Factory function to create a transcriber for the configured execution
/// mode (`local` FFI, `cli` subprocess fallback, or `remote` HTTP API).
///
/// Returns an `Arc` rather than a `Box` so the local backend can hand a
/// clone of its own handle to its background idle-unload monitor (see
/// [`whisper::WhisperTranscriber::spawn_idle_monitor`]) before the concrete
/// type is erased behind the trait object.
pub fn create_transcriber(
    config: &WhisperConfig,
) -> Result<std::sync::Arc<dyn Transcriber>, TranscribeError> {
    match config.effective_mode() {
        WhisperMode::Local => {
            tracing::info!("Using local whisper.cpp transcription backend");
            let transcriber = std::sync::Arc::new(whisper::WhisperTranscriber::new(config)?);
            transcriber.spawn_idle_monitor();
            Ok(transcriber)
        }
        WhisperMode::Cli => {
            tracing::info!("Using whisper-cli subprocess transcription backend");
            Ok(std::sync::Arc::new(cli::CliTranscriber::new(config)?))
        }
        WhisperMode::Remote => {
            tracing::info!("Using remote whisper transcription backend");
            Ok(std::sync::Arc::new(remote::RemoteTranscriber::new(config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hallucination_filter_catches_curated_phrases() {
        assert!(is_hallucination("Thank you."));
        assert!(is_hallucination("  subscribe  "));
        assert!(is_hallucination("ok"));
        assert!(!is_hallucination("turn off the lights in the kitchen"));
    }
}
