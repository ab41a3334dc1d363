//! Whisper-based speech-to-text transcription
//!
//! Uses whisper.cpp via the whisper-rs crate for fast, local transcription.
//! The model handle is loaded lazily on first use and released by a
//! background monitor after [`MODEL_IDLE_TIMEOUT`] of inactivity, so a
//! resident daemon doesn't hold GPU/CPU memory between dictation sessions.

use super::{Transcriber, TranscriptionResult, TranscriptionSegment};
use crate::config::{Config, WhisperConfig};
use crate::error::TranscribeError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Represents a single word segment with its metadata
#[derive(Debug, Clone)]
pub struct WordSegment {
    pub text: String,
    pub t0_cs: i64, // start time in centiseconds
    pub t1_cs: i64, // end time in centiseconds
    pub probability: f32,
    pub label: ConfidenceLabel,
}

/// Confidence label for a word segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLabel {
    Red,
    Yellow,
    Green,
}

/// Detailed transcription result with word-level confidence
#[derive(Debug)]
pub struct TranscriptionDetails {
    pub text: String,
    pub segments: Vec<WordSegment>,
}

/// How long the model may sit idle before the background monitor unloads
/// it and releases device memory.
pub const MODEL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// How often the background monitor checks for idleness.
const MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// RMS-equivalent peak amplitude below which a buffer is treated as
/// silence and skipped without running the model.
const MIN_PEAK_AMPLITUDE: f32 = 0.02;

struct ModelState {
    ctx: Option<WhisperContext>,
    model_path: PathBuf,
    language: String,
    use_gpu: bool,
}

/// Whisper-based transcriber. Thread-safe: `transcribe`/`transcribe_segments`
/// serialize on an internal mutex, so only one decode runs at a time per
/// process.
///
/// `language` and `use_gpu` live inside the mutex alongside `ctx` so that
/// [`WhisperTranscriber::reload_settings`] can hot-swap them (from a
/// settings-store `model`/`device`/`language` change) without a second lock
/// or a race against an in-flight `transcribe_segments` call.
pub struct WhisperTranscriber {
    state: Mutex<ModelState>,
    last_use_epoch_secs: AtomicU64,
    start_epoch: Instant,
    translate: bool,
    threads: usize,
}

impl WhisperTranscriber {
    /// Create a new whisper transcriber. The model itself is not loaded
    /// until the first call to `transcribe`/`transcribe_segments` (or a
    /// caller-driven preload).
    pub fn new(config: &WhisperConfig) -> Result<Self, TranscribeError> {
        let model_path = resolve_model_path(&config.model)?;

        let threads = config.threads.unwrap_or_else(|| num_cpus::get().min(4));

        let transcriber = Self {
            state: Mutex::new(ModelState {
                ctx: None,
                model_path,
                language: config.language.primary().to_string(),
                use_gpu: config.device.use_gpu(),
            }),
            last_use_epoch_secs: AtomicU64::new(0),
            start_epoch: Instant::now(),
            translate: config.translate,
            threads,
        };

        if !config.on_demand_loading {
            transcriber.load_model()?;
        }

        Ok(transcriber)
    }

    /// Apply a settings-store change for `model`, `device`, or `language`.
    /// A `model`/`device` change drops the loaded context so the next
    /// `transcribe` call reloads with the new path/GPU flag; a `language`
    /// change alone takes effect on the next decode without a reload.
    pub fn reload_settings(&self, settings: &crate::settings::SettingsStore) {
        let mut state = self.state.lock().unwrap();

        if let Some(model) = settings.get_string("model") {
            match resolve_model_path(&model) {
                Ok(path) if path != state.model_path => {
                    tracing::info!("Settings changed: model -> {:?}", path);
                    state.model_path = path;
                    state.ctx = None;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Ignoring model change to '{}': {}", model, e),
            }
        }

        if let Some(device) = settings.get_string("device") {
            let use_gpu = match device.as_str() {
                "cpu" => false,
                "auto" | "cuda" => true,
                other => {
                    tracing::warn!("Ignoring unknown device setting '{}'", other);
                    state.use_gpu
                }
            };
            if use_gpu != state.use_gpu {
                tracing::info!("Settings changed: device -> {} (use_gpu={})", device, use_gpu);
                state.use_gpu = use_gpu;
                state.ctx = None;
            }
        }

        if let Some(language) = settings.get_string("language") {
            if language != state.language {
                tracing::info!("Settings changed: language -> {}", language);
                state.language = language;
            }
        }
    }

    /// Idempotent model load: loading while already loaded is a no-op.
    pub fn load_model(&self) -> Result<(), TranscribeError> {
        let mut state = self.state.lock().unwrap();
        if state.ctx.is_some() {
            return Ok(());
        }

        tracing::info!(
            "Loading whisper model from {:?} (use_gpu={})",
            state.model_path,
            state.use_gpu
        );
        let start = std::time::Instant::now();

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu = state.use_gpu;

        let ctx = WhisperContext::new_with_params(
            state
                .model_path
                .to_str()
                .ok_or_else(|| TranscribeError::ModelNotFound("Invalid path".to_string()))?,
            ctx_params,
        )
        .map_err(|e| TranscribeError::InitFailed(e.to_string()))?;

        tracing::info!("Model loaded in {:.2}s", start.elapsed().as_secs_f32());
        state.ctx = Some(ctx);
        Ok(())
    }

    /// Release the model handle and any device caches. Safe to call when
    /// already unloaded.
    pub fn unload_model(&self) {
        let mut state = self.state.lock().unwrap();
        if state.ctx.take().is_some() {
            tracing::info!("Unloaded idle whisper model");
        }
    }

    fn mark_used(&self) {
        self.last_use_epoch_secs
            .store(self.start_epoch.elapsed().as_secs(), Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last_use = self.last_use_epoch_secs.load(Ordering::Relaxed);
        let now = self.start_epoch.elapsed().as_secs();
        Duration::from_secs(now.saturating_sub(last_use))
    }

    /// Spawn the background idle-unload monitor. Wakes every
    /// [`MONITOR_INTERVAL`]; unloads the model once it has sat idle past
    /// [`MODEL_IDLE_TIMEOUT`]. The next `transcribe` call transparently
    /// reloads it.
    pub fn spawn_idle_monitor(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        std::thread::spawn(move || loop {
            std::thread::sleep(MONITOR_INTERVAL);
            let Some(transcriber) = weak.upgrade() else {
                return;
            };
            let loaded = transcriber.state.lock().unwrap().ctx.is_some();
            if loaded && transcriber.idle_for() > MODEL_IDLE_TIMEOUT {
                transcriber.unload_model();
            }
        });
    }

    /// Rescale a buffer whose peak exceeds unit amplitude, and signal
    /// near-silent buffers so the caller can skip decoding entirely.
    fn normalize(samples: &[f32]) -> Option<Vec<f32>> {
        let peak = samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        if peak < MIN_PEAK_AMPLITUDE {
            return None;
        }
        if peak > 1.0 {
            Some(samples.iter().map(|s| s / peak).collect())
        } else {
            Some(samples.to_vec())
        }
    }

    /// Decoder parameters are deterministic (temperature 0, no context
    /// carried across ticks) with a beam search wide enough to avoid
    /// mid-word truncation, and a slightly lenient log-prob threshold so a
    /// borderline decode isn't thrown away entirely — tightened back up by
    /// the no-speech threshold, which still drops genuine silence.
    fn build_params<'a>(
        &self,
        state: &'a ModelState,
        duration_secs: f32,
        single_segment: bool,
    ) -> FullParams<'a, 'a> {
        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: 5,
            patience: -1.0,
        });

        if state.language == "auto" {
            params.set_language(None);
        } else {
            params.set_language(Some(&state.language));
        }

        params.set_translate(self.translate);
        params.set_n_threads(self.threads as i32);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);
        params.set_suppress_nst(true);
        params.set_temperature(0.0);
        params.set_no_speech_thold(0.6);
        params.set_logprob_thold(-1.0);
        // condition_on_previous_text = false: each tick re-decodes the whole
        // rolling buffer from scratch, so no prior-segment text should bias it.
        params.set_no_context(true);

        if single_segment && duration_secs < 30.0 {
            params.set_single_segment(true);
        }

        if let Some(audio_ctx) = calculate_audio_ctx(duration_secs) {
            params.set_audio_ctx(audio_ctx);
        }

        params
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, samples: &[f32]) -> Result<String, TranscribeError> {
        Ok(self.transcribe_segments(samples)?.text)
    }

    fn transcribe_segments(&self, samples: &[f32]) -> Result<TranscriptionResult, TranscribeError> {
        if samples.is_empty() {
            return Err(TranscribeError::AudioFormat(
                "Empty audio buffer".to_string(),
            ));
        }

        let Some(normalized) = Self::normalize(samples) else {
            return Ok(TranscriptionResult::empty());
        };

        self.load_model()?;
        self.mark_used();

        let duration_secs = normalized.len() as f32 / 16000.0;
        let start = std::time::Instant::now();

        let state = self.state.lock().unwrap();
        let ctx = state
            .ctx
            .as_ref()
            .ok_or_else(|| TranscribeError::InitFailed("model not loaded".to_string()))?;

        let mut whisper_state = ctx
            .create_state()
            .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?;

        let params = self.build_params(&state, duration_secs, false);

        whisper_state
            .full(params, &normalized)
            .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?;

        let mut segments = Vec::new();
        let mut text = String::new();
        for segment in whisper_state.as_iter() {
            let segment_text = segment
                .to_str()
                .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?
                .trim();
            if segment_text.is_empty() {
                continue;
            }
            let start_s = segment.start_timestamp() as f32 / 100.0;
            let end_s = segment.end_timestamp() as f32 / 100.0;
            segments.push(TranscriptionSegment {
                start: start_s,
                end: end_s,
                text: segment_text.to_string(),
            });
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(segment_text);
        }

        tracing::debug!(
            "Transcribed {:.2}s of audio in {:.2}s: {} segment(s)",
            duration_secs,
            start.elapsed().as_secs_f32(),
            segments.len()
        );

        if super::is_hallucination(&text) {
            return Ok(TranscriptionResult::empty());
        }

        Ok(TranscriptionResult {
            segments,
            text,
            language: state.language.clone(),
            confidence: 1.0,
        })
    }

    fn reload_settings(&self, settings: &crate::settings::SettingsStore) {
        WhisperTranscriber::reload_settings(self, settings);
    }
}

impl WhisperTranscriber {
    /// Transcribe audio samples with word-level confidence information.
    /// Used by `voxtype transcribe --confidence`, not by the streaming
    /// session loop.
    pub fn transcribe_with_confidence(
        &self,
        samples: &[f32],
    ) -> Result<TranscriptionDetails, TranscribeError> {
        if samples.is_empty() {
            return Err(TranscribeError::AudioFormat(
                "Empty audio buffer".to_string(),
            ));
        }

        self.load_model()?;
        self.mark_used();

        let duration_secs = samples.len() as f32 / 16000.0;

        let state = self.state.lock().unwrap();
        let ctx = state
            .ctx
            .as_ref()
            .ok_or_else(|| TranscribeError::InitFailed("model not loaded".to_string()))?;

        let mut whisper_state = ctx
            .create_state()
            .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?;

        let mut params = self.build_params(&state, duration_secs, true);
        params.set_token_timestamps(true);
        params.set_max_len(1);
        params.set_split_on_word(true);

        whisper_state
            .full(params, samples)
            .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?;

        let mut segments = Vec::new();
        let mut text = String::new();

        for segment in whisper_state.as_iter() {
            let segment_text = segment
                .to_str()
                .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?;
            if segment_text.trim().is_empty() {
                continue;
            }

            let t0_cs = segment.start_timestamp();
            let t1_cs = segment.end_timestamp();

            let n_tokens = segment.n_tokens();
            let mut token_probs = Vec::with_capacity(n_tokens as usize);
            for i in 0..n_tokens {
                if let Some(token) = segment.get_token(i) {
                    token_probs.push(token.token_probability());
                }
            }

            let probability = if token_probs.is_empty() {
                f32::NAN
            } else {
                geometric_mean(&token_probs)
            };

            segments.push(WordSegment {
                text: segment_text.to_string(),
                t0_cs,
                t1_cs,
                probability,
                label: probability_to_label(probability),
            });

            text.push_str(segment_text);
        }

        Ok(TranscriptionDetails {
            text: text.trim().to_string(),
            segments,
        })
    }
}

/// Resolve model name to file path
fn resolve_model_path(model: &str) -> Result<PathBuf, TranscribeError> {
    let path = PathBuf::from(model);
    if path.is_absolute() && path.exists() {
        return Ok(path);
    }

    let model_filename = match model {
        "tiny" => "ggml-tiny.bin",
        "tiny.en" => "ggml-tiny.en.bin",
        "base" => "ggml-base.bin",
        "base.en" => "ggml-base.en.bin",
        "small" => "ggml-small.bin",
        "small.en" => "ggml-small.en.bin",
        "medium" => "ggml-medium.bin",
        "medium.en" => "ggml-medium.en.bin",
        "large" | "large-v1" => "ggml-large-v1.bin",
        "large-v2" => "ggml-large-v2.bin",
        "large-v3" => "ggml-large-v3.bin",
        "large-v3-turbo" | "turbo" => "ggml-large-v3-turbo.bin",
        other if other.ends_with(".bin") => other,
        other => {
            return Err(TranscribeError::ModelNotFound(format!(
                "Unknown model: '{}'. Valid models: tiny, base, small, medium, large-v3, turbo",
                other
            )));
        }
    };

    let models_dir = Config::models_dir();
    let model_path = models_dir.join(model_filename);
    if model_path.exists() {
        return Ok(model_path);
    }

    let cwd_path = PathBuf::from(model_filename);
    if cwd_path.exists() {
        return Ok(cwd_path);
    }

    let local_models_path = PathBuf::from("models").join(model_filename);
    if local_models_path.exists() {
        return Ok(local_models_path);
    }

    Err(TranscribeError::ModelNotFound(format!(
        "Model '{}' not found. Looked in:\n  - {}\n  - {}\n  - {}\n\nDownload from: https://huggingface.co/ggerganov/whisper.cpp/tree/main",
        model,
        model_path.display(),
        cwd_path.display(),
        local_models_path.display()
    )))
}

/// Calculate audio_ctx parameter for short clips (<=22.5s).
/// Formula: duration_seconds * 50 + 64
fn calculate_audio_ctx(duration_secs: f32) -> Option<i32> {
    if duration_secs <= 22.5 {
        Some((duration_secs * 50.0) as i32 + 64)
    } else {
        None
    }
}

/// Get the filename for a model
pub fn get_model_filename(model: &str) -> String {
    match model {
        "tiny" => "ggml-tiny.bin",
        "tiny.en" => "ggml-tiny.en.bin",
        "base" => "ggml-base.bin",
        "base.en" => "ggml-base.en.bin",
        "small" => "ggml-small.bin",
        "small.en" => "ggml-small.en.bin",
        "medium" => "ggml-medium.bin",
        "medium.en" => "ggml-medium.en.bin",
        "large-v3" => "ggml-large-v3.bin",
        "large-v3-turbo" | "turbo" => "ggml-large-v3-turbo.bin",
        other => other,
    }
    .to_string()
}

/// Get the download URL for a model
pub fn get_model_url(model: &str) -> String {
    let filename = get_model_filename(model);
    format!(
        "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/{}",
        filename
    )
}

fn probability_to_label(probability: f32) -> ConfidenceLabel {
    if probability.is_nan() {
        return ConfidenceLabel::Yellow;
    }
    if probability < 0.33 {
        ConfidenceLabel::Red
    } else if probability < 0.66 {
        ConfidenceLabel::Yellow
    } else {
        ConfidenceLabel::Green
    }
}

fn geometric_mean(probabilities: &[f32]) -> f32 {
    if probabilities.is_empty() {
        return f32::NAN;
    }
    let product: f32 = probabilities.iter().product();
    product.powf(1.0 / probabilities.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_url() {
        let url = get_model_url("base.en");
        assert!(url.contains("ggml-base.en.bin"));
        assert!(url.contains("huggingface.co"));
    }

    #[test]
    fn normalize_rescales_clipped_peaks() {
        let loud = vec![2.0f32; 100];
        let normalized = WhisperTranscriber::normalize(&loud).unwrap();
        assert!(normalized.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn normalize_rejects_near_silence() {
        let quiet = vec![0.001f32; 100];
        assert!(WhisperTranscriber::normalize(&quiet).is_none());
    }
}
