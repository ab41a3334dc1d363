//! Audio capture module
//!
//! Provides audio recording capabilities using cpal, which works with
//! PipeWire, PulseAudio, and ALSA backends. Audio is delivered as a lazy
//! sequence of fixed-duration PCM chunks (mono, 16kHz, f32) alongside a
//! rolling RMS level suitable for driving a live input meter.

pub mod cpal_capture;

use crate::config::AudioConfig;
use crate::error::AudioError;
use tokio::sync::mpsc;

/// Target sample rate for capture and transcription.
pub const SAMPLE_RATE: u32 = 16_000;

/// Duration of each delivered audio chunk, in seconds.
pub const CHUNK_DURATION: f32 = 0.5;

/// Size, in samples, of a single chunk at [`SAMPLE_RATE`].
pub const CHUNK_SAMPLES: usize = (SAMPLE_RATE as f32 * CHUNK_DURATION) as usize;

/// Rolling buffer ceiling kept available as a capture-side capability,
/// even though the session controller drives its own commit window.
pub const BUFFER_DURATION: f32 = 5.0;

/// RMS level below which a chunk is considered silence.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Trait for audio capture implementations
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Start capturing audio
    /// Returns a channel receiver for audio chunks (f32 samples, mono, 16kHz)
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, AudioError>;

    /// Stop capturing and return all recorded samples
    async fn stop(&mut self) -> Result<Vec<f32>, AudioError>;

    /// Get current samples without stopping (for continuous recording modes)
    /// This drains the internal buffer and returns samples collected since the last call.
    /// Returns an empty Vec if not yet started or already stopped.
    async fn get_samples(&mut self) -> Vec<f32>;
}

/// Factory function to create audio capture
pub fn create_capture(config: &AudioConfig) -> Result<Box<dyn AudioCapture>, AudioError> {
    Ok(Box::new(cpal_capture::CpalCapture::new(config)?))
}

/// Root-mean-square level of a chunk of samples, used for level metering
/// and silence detection.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Whether a chunk's RMS level falls below [`SILENCE_THRESHOLD`].
pub fn is_silence(samples: &[f32]) -> bool {
    calculate_rms(samples) < SILENCE_THRESHOLD
}

/// A rolling buffer of captured samples, capped at [`BUFFER_DURATION`]
/// seconds. Retained as a capture-side capability; the core session flow
/// does not depend on it, but downstream tooling (level meters, future
/// scrollback) can use it without touching the capture thread.
#[derive(Default)]
pub struct RollingBuffer {
    samples: Vec<f32>,
    max_samples: usize,
}

impl RollingBuffer {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            max_samples: (SAMPLE_RATE as f32 * BUFFER_DURATION) as usize,
        }
    }

    pub fn push(&mut self, chunk: &[f32]) {
        self.samples.extend_from_slice(chunk);
        if self.samples.len() > self.max_samples {
            let excess = self.samples.len() - self.max_samples;
            self.samples.drain(0..excess);
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn clear_buffer(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_is_zero() {
        let samples = vec![0.0f32; 100];
        assert_eq!(calculate_rms(&samples), 0.0);
    }

    #[test]
    fn rms_of_constant_signal() {
        let samples = vec![0.5f32; 100];
        assert!((calculate_rms(&samples) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn is_silence_detects_low_level_noise() {
        let quiet = vec![0.001f32; 100];
        let loud = vec![0.5f32; 100];
        assert!(is_silence(&quiet));
        assert!(!is_silence(&loud));
    }

    #[test]
    fn rolling_buffer_caps_at_buffer_duration() {
        let mut buf = RollingBuffer::new();
        let chunk = vec![0.1f32; CHUNK_SAMPLES];
        for _ in 0..(BUFFER_DURATION / CHUNK_DURATION) as usize + 5 {
            buf.push(&chunk);
        }
        assert!(buf.samples().len() <= (SAMPLE_RATE as f32 * BUFFER_DURATION) as usize);
    }

    #[test]
    fn clear_buffer_empties_samples() {
        let mut buf = RollingBuffer::new();
        buf.push(&vec![0.1f32; 10]);
        buf.clear_buffer();
        assert!(buf.samples().is_empty());
    }
}
