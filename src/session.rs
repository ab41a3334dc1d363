//! Session controller: the single-session `Idle -> Recording -> Finalizing`
//! state machine that owns a dictation pass end to end.
//!
//! Only one session runs at a time; `recording_lock` below is the mutex
//! mentioned in the concurrency model that makes entering `Recording`
//! while already recording a no-op. The actual per-tick work (rolling
//! buffer growth, periodic re-transcription, safe-commit) runs on a
//! dedicated worker task spawned by `start_recording` and joined by
//! `stop_recording`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};

use crate::audio::{self, AudioCapture};
use crate::command::CommandEngine;
use crate::config::AudioConfig;
use crate::error::Result;
use crate::keysynth;
use crate::overlay::Overlay;
use crate::settings::SettingsStore;
use crate::transcribe::{Transcriber, TranscriptionResult};

/// Buffer duration, in seconds, past which the safe-commit protocol may
/// freeze a prefix of the transcript into `confirmed`.
const SAFE_COMMIT_CEILING_SECS: f32 = 20.0;

/// Trailing guard kept un-committed so an in-flight command phrase can't
/// be split across a commit boundary.
const SAFE_COMMIT_TRAILING_GUARD_SECS: f32 = 5.0;

/// How often the rolling buffer is re-transcribed in full while recording.
const TRANSCRIBE_TICK: Duration = Duration::from_secs_f32(audio::CHUNK_DURATION);

/// Cadence of the chunk-queue poll. Matches the FIFO-with-timeout
/// described for the transcription worker.
const POLL_TICK: Duration = Duration::from_millis(100);

/// Scales raw RMS (roughly 0..0.3 for speech) into the overlay's 0..1
/// level meter range.
const LEVEL_GAIN: f32 = 3.0;

/// Bounded wait for the worker to drain on stop.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Minimum buffer duration, in seconds, required before a stop-time
/// fallback re-transcription is attempted.
const FINAL_FALLBACK_MIN_SECS: f32 = 0.3;

/// Settle time given to the newly (or still-) focused window before the
/// key synthesizer starts typing.
const FOCUS_STABILITY_DELAY: Duration = Duration::from_millis(300);

/// How long the overlay stays visible after a session finishes before
/// being hidden automatically.
const RESULT_DISPLAY_DELAY: Duration = Duration::from_secs(1);

struct ActiveSession {
    stop_tx: mpsc::Sender<()>,
    worker: tokio::task::JoinHandle<String>,
}

/// Owns the dictation session state machine: start/stop transitions,
/// the rolling-buffer transcription loop, command dispatch, and the
/// final key-synthesis step.
pub struct SessionController {
    settings: SettingsStore,
    overlay: Overlay,
    commands: Mutex<CommandEngine>,
    transcriber: Arc<dyn Transcriber>,
    audio_config: AudioConfig,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionController {
    pub fn new(
        settings: SettingsStore,
        overlay: Overlay,
        transcriber: Arc<dyn Transcriber>,
        audio_config: AudioConfig,
    ) -> Self {
        let commands = Mutex::new(CommandEngine::new(&settings));
        Self {
            settings,
            overlay,
            commands,
            transcriber,
            audio_config,
            active: Mutex::new(None),
        }
    }

    /// Rebuild the command registry, e.g. after the settings store
    /// reports a change to `custom_commands`/`disabled_commands`.
    pub async fn reload_commands(&self) {
        self.commands.lock().await.reload(&self.settings);
    }

    pub async fn is_recording(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Toggle: start a session if idle, stop it if recording.
    pub async fn toggle(&self) -> Result<()> {
        if self.is_recording().await {
            self.stop_recording().await
        } else {
            self.start_recording().await
        }
    }

    /// `Idle -> Recording`. A no-op if a session is already active.
    pub async fn start_recording(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Ok(());
        }

        self.commands.lock().await.reset();

        let window_name = current_window_name().unwrap_or_default();
        self.overlay.set_window_name(&window_name)?;
        self.overlay.set_status("recording")?;
        self.overlay.set_recording(true)?;
        self.overlay.show()?;

        let mut capture = match audio::create_capture(&self.audio_config) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("failed to open audio device: {}", e);
                notify_best_effort("Voxtype", "No audio input device available");
                self.overlay.set_status("idle")?;
                self.overlay.set_recording(false)?;
                return Err(e.into());
            }
        };
        let audio_rx = capture.start().await?;

        let (stop_tx, stop_rx) = mpsc::channel(1);
        let transcriber = self.transcriber.clone();
        let overlay = self.overlay.clone();
        let silence_duration = self
            .settings
            .get_f64("silence_duration")
            .unwrap_or(1.5);

        let worker = tokio::spawn(async move {
            let final_text = transcription_loop(
                audio_rx,
                stop_rx,
                transcriber,
                overlay,
                silence_duration,
            )
            .await;
            let _ = capture.stop().await;
            final_text
        });

        *active = Some(ActiveSession { stop_tx, worker });
        Ok(())
    }

    /// `Recording -> Finalizing -> Idle`. A no-op if already idle.
    pub async fn stop_recording(&self) -> Result<()> {
        let session = self.active.lock().await.take();
        let Some(session) = session else {
            return Ok(());
        };

        let _ = session.stop_tx.send(()).await;
        let final_text = match tokio::time::timeout(WORKER_JOIN_TIMEOUT, session.worker).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!("transcription worker panicked: {}", e);
                String::new()
            }
            Err(_) => {
                tracing::warn!("transcription worker did not drain within 2s");
                String::new()
            }
        };

        self.overlay.set_status("finalizing")?;

        let (cleaned, matches) = {
            let mut engine = self.commands.lock().await;
            engine.scan_text(&final_text, &self.settings)
        };
        {
            let engine = self.commands.lock().await;
            engine.execute(&matches).await;
        }

        let text_to_type = if cleaned != final_text {
            cleaned
        } else {
            final_text
        };

        if !text_to_type.trim().is_empty() {
            tokio::time::sleep(FOCUS_STABILITY_DELAY).await;
            if let Err(e) = keysynth::type_text(&text_to_type).await {
                tracing::warn!("key synthesis failed: {}", e);
                notify_best_effort("Voxtype", "Type failed");
            }
        }

        self.overlay.set_transcription(&text_to_type)?;
        self.overlay.set_status("idle")?;
        self.overlay.set_recording(false)?;

        let overlay = self.overlay.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RESULT_DISPLAY_DELAY).await;
            let _ = overlay.hide();
        });

        Ok(())
    }

    /// Abort the current session without typing anything, e.g. on an
    /// overlay cancel event.
    pub async fn cancel(&self) -> Result<()> {
        let session = self.active.lock().await.take();
        let Some(session) = session else {
            return Ok(());
        };
        let _ = session.stop_tx.send(()).await;
        session.worker.abort();
        self.overlay.hide()?;
        Ok(())
    }
}

/// The per-recording worker: grows the rolling buffer from arriving
/// chunks, periodically re-transcribes the whole buffer, safe-commits a
/// segment-aligned prefix once the buffer grows past the ceiling, and
/// auto-stops on sustained silence. Returns the finalized transcript.
async fn transcription_loop(
    mut audio_rx: mpsc::Receiver<Vec<f32>>,
    mut stop_rx: mpsc::Receiver<()>,
    transcriber: Arc<dyn Transcriber>,
    overlay: Overlay,
    silence_duration: f64,
) -> String {
    let mut buffer: Vec<f32> = Vec::new();
    let mut confirmed = String::new();
    let mut pending = String::new();

    let mut last_speech_time = Instant::now();
    let mut last_transcribe_tick = Instant::now();
    let mut ticker = tokio::time::interval(POLL_TICK);
    let mut channel_closed = false;

    loop {
        ticker.tick().await;

        if stop_rx.try_recv().is_ok() {
            break;
        }

        loop {
            match audio_rx.try_recv() {
                Ok(chunk) => {
                    let rms = audio::calculate_rms(&chunk);
                    let _ = overlay.set_audio_level(rms * LEVEL_GAIN);
                    if !audio::is_silence(&chunk) {
                        last_speech_time = Instant::now();
                    }
                    buffer.extend_from_slice(&chunk);
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    channel_closed = true;
                    break;
                }
            }
        }

        let buffer_duration = buffer.len() as f32 / audio::SAMPLE_RATE as f32;

        if last_transcribe_tick.elapsed() >= TRANSCRIBE_TICK && buffer_duration >= 0.5 {
            last_transcribe_tick = Instant::now();
            match transcriber.transcribe_segments(&buffer) {
                Ok(result) => {
                    pending = result.text.clone();

                    if buffer_duration > SAFE_COMMIT_CEILING_SECS {
                        safe_commit(
                            &result,
                            buffer_duration,
                            &mut buffer,
                            &mut confirmed,
                            &mut pending,
                        );
                    }

                    let visible = join_trim(&confirmed, &pending);
                    let _ = overlay.set_transcription(&visible);
                }
                Err(e) => {
                    tracing::warn!("streaming transcription tick failed: {}", e);
                }
            }
        }

        if channel_closed {
            break;
        }

        let silent_for = last_speech_time.elapsed().as_secs_f64();
        if silent_for > silence_duration {
            break;
        }
    }

    let mut final_text = join_trim(&confirmed, &pending);

    if final_text.is_empty() {
        let buffer_duration = buffer.len() as f32 / audio::SAMPLE_RATE as f32;
        if buffer_duration >= FINAL_FALLBACK_MIN_SECS {
            match transcriber.transcribe_segments(&buffer) {
                Ok(result) => final_text = result.text.trim().to_string(),
                Err(e) => tracing::warn!("final fallback transcription failed: {}", e),
            }
        }
    }

    final_text
}

/// Promote the maximal prefix of `result.segments` ending before
/// `buffer_duration - trailing_guard` into `confirmed`, dropping the
/// matching prefix of `buffer`'s audio and leaving the rest in `pending`.
fn safe_commit(
    result: &TranscriptionResult,
    buffer_duration: f32,
    buffer: &mut Vec<f32>,
    confirmed: &mut String,
    pending: &mut String,
) {
    let cutoff = buffer_duration - SAFE_COMMIT_TRAILING_GUARD_SECS;
    let split = result
        .segments
        .iter()
        .position(|s| s.end >= cutoff)
        .unwrap_or(result.segments.len());

    if split == 0 {
        return;
    }

    let committed: Vec<&str> = result.segments[..split]
        .iter()
        .map(|s| s.text.as_str())
        .collect();
    let remaining: Vec<&str> = result.segments[split..]
        .iter()
        .map(|s| s.text.as_str())
        .collect();

    let commit_text = committed.join(" ");
    *confirmed = join_trim(confirmed, &commit_text);
    *pending = remaining.join(" ").trim().to_string();

    let safe_point_secs = result.segments[split - 1].end;
    let safe_point_samples = (safe_point_secs * audio::SAMPLE_RATE as f32) as usize;
    let drop_samples = safe_point_samples.min(buffer.len());
    buffer.drain(0..drop_samples);
}

/// Spawn a desktop notification without blocking the caller. Environmental
/// and fatal failures (§7 error taxonomy) are user-visible this way; they
/// never interrupt the session state machine.
fn notify_best_effort(title: &'static str, body: &'static str) {
    tokio::spawn(async move {
        crate::notification::send(title, body).await;
    });
}

fn join_trim(a: &str, b: &str) -> String {
    let a = a.trim();
    let b = b.trim();
    match (a.is_empty(), b.is_empty()) {
        (true, true) => String::new(),
        (true, false) => b.to_string(),
        (false, true) => a.to_string(),
        (false, false) => format!("{} {}", a, b),
    }
}

/// Best-effort active-window title lookup across common Wayland
/// compositors and X11, for the overlay's `set_window_name`. Returns
/// `None` (never an error) if no tool is available or the call fails;
/// the session proceeds without a window title either way.
fn current_window_name() -> Option<String> {
    if let Ok(output) = std::process::Command::new("hyprctl")
        .args(["activewindow", "-j"])
        .output()
    {
        if output.status.success() {
            if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&output.stdout) {
                if let Some(title) = json.get("title").and_then(|v| v.as_str()) {
                    return Some(title.to_string());
                }
            }
        }
    }

    if let Ok(output) = std::process::Command::new("swaymsg")
        .args(["-t", "get_tree"])
        .output()
    {
        if output.status.success() {
            if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&output.stdout) {
                if let Some(title) = find_focused_name(&json) {
                    return Some(title);
                }
            }
        }
    }

    if let Ok(output) = std::process::Command::new("xdotool")
        .args(["getactivewindow", "getwindowname"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }

    None
}

fn find_focused_name(node: &serde_json::Value) -> Option<String> {
    if node.get("focused").and_then(|v| v.as_bool()) == Some(true) {
        return node
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
    }
    node.get("nodes")?
        .as_array()?
        .iter()
        .find_map(find_focused_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::TranscriptionSegment;

    fn seg(start: f32, end: f32, text: &str) -> TranscriptionSegment {
        TranscriptionSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn safe_commit_freezes_segments_before_trailing_guard() {
        let result = TranscriptionResult {
            segments: vec![
                seg(0.0, 5.0, "one"),
                seg(5.0, 12.0, "two"),
                seg(12.0, 19.0, "three"),
                seg(19.0, 26.0, "four"),
            ],
            text: "one two three four".to_string(),
            language: "en".to_string(),
            confidence: 1.0,
        };

        let mut buffer = vec![0.0f32; 30 * 16000];
        let mut confirmed = String::new();
        let mut pending = "one two three four".to_string();

        safe_commit(&result, 30.0, &mut buffer, &mut confirmed, &mut pending);

        assert_eq!(confirmed, "one two three");
        assert_eq!(pending, "four");
        assert_eq!(buffer.len(), 30 * 16000 - 19 * 16000);
    }

    #[test]
    fn safe_commit_is_noop_when_nothing_clears_the_guard() {
        let result = TranscriptionResult {
            segments: vec![seg(0.0, 2.0, "hi")],
            text: "hi".to_string(),
            language: "en".to_string(),
            confidence: 1.0,
        };
        let mut buffer = vec![0.0f32; 21 * 16000];
        let mut confirmed = String::new();
        let mut pending = "hi".to_string();

        safe_commit(&result, 21.0, &mut buffer, &mut confirmed, &mut pending);

        assert_eq!(confirmed, "");
        assert_eq!(pending, "hi");
    }

    #[test]
    fn join_trim_handles_empty_sides() {
        assert_eq!(join_trim("", ""), "");
        assert_eq!(join_trim("a", ""), "a");
        assert_eq!(join_trim("", "b"), "b");
        assert_eq!(join_trim("a", "b"), "a b");
    }
}
