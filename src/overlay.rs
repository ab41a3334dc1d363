//! Overlay adapter: a thread-safe façade over the external status widget.
//!
//! Several incompatible overlay front-ends exist in the wild for a daemon
//! like this (status bar modules, native popups, tray menus); rather than
//! commit to one, this module exposes a single narrow contract and backs
//! it with two side-effects any desktop can consume: an atomically
//! written JSON status file (for Waybar/polybar-style status-bar modules)
//! and best-effort desktop notifications. A GUI overlay can be swapped in
//! later behind the same `Overlay` handle without touching the session
//! controller.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::watch;

use crate::error::OverlayError;

/// Snapshot of everything the overlay displays.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayState {
    pub status: String,
    pub recording: bool,
    pub audio_level: f32,
    pub window_name: String,
    pub transcription: String,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            status: "idle".to_string(),
            recording: false,
            audio_level: 0.0,
            window_name: String::new(),
            transcription: String::new(),
        }
    }
}

/// Thread-safe handle to the overlay. Cloning shares the same underlying
/// state and cancel channel; cheap to pass into the audio callback,
/// transcription worker, and hotkey listener alike.
#[derive(Clone)]
pub struct Overlay {
    state: std::sync::Arc<Mutex<OverlayState>>,
    status_path: PathBuf,
    visible: std::sync::Arc<std::sync::atomic::AtomicBool>,
    cancel_tx: watch::Sender<u64>,
    cancel_rx: watch::Receiver<u64>,
}

impl Overlay {
    /// Create an overlay backed by a status file at `status_path` (atomic
    /// temp+rename writes, mirroring the settings store's durability
    /// style).
    pub fn new(status_path: PathBuf) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(0);
        Self {
            state: std::sync::Arc::new(Mutex::new(OverlayState::default())),
            status_path,
            visible: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
            cancel_tx,
            cancel_rx,
        }
    }

    /// Show the overlay. Safe to call from any thread.
    pub fn show(&self) -> Result<(), OverlayError> {
        self.visible
            .store(true, std::sync::atomic::Ordering::SeqCst);
        self.flush()
    }

    /// Hide the overlay and reset its transient fields.
    pub fn hide(&self) -> Result<(), OverlayError> {
        self.visible
            .store(false, std::sync::atomic::Ordering::SeqCst);
        {
            let mut state = self.state.lock().unwrap();
            state.recording = false;
            state.audio_level = 0.0;
            state.transcription.clear();
            state.status = "idle".to_string();
        }
        self.flush()
    }

    pub fn set_recording(&self, recording: bool) -> Result<(), OverlayError> {
        self.state.lock().unwrap().recording = recording;
        self.flush()
    }

    /// Set the current input level, clamped to `[0, 1]`.
    pub fn set_audio_level(&self, level: f32) -> Result<(), OverlayError> {
        self.state.lock().unwrap().audio_level = level.clamp(0.0, 1.0);
        self.flush()
    }

    pub fn set_window_name(&self, name: &str) -> Result<(), OverlayError> {
        self.state.lock().unwrap().window_name = name.to_string();
        self.flush()
    }

    /// Set the live (in-progress) transcription text shown while recording.
    pub fn set_transcription(&self, text: &str) -> Result<(), OverlayError> {
        self.state.lock().unwrap().transcription = text.to_string();
        self.flush()
    }

    pub fn set_status(&self, status: &str) -> Result<(), OverlayError> {
        self.state.lock().unwrap().status = status.to_string();
        self.flush()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Signal that the user cancelled the in-progress session (e.g. an
    /// overlay close button or a dedicated cancel hotkey). The session
    /// controller observes this via [`Overlay::subscribe_cancel`].
    pub fn signal_cancel(&self) {
        self.cancel_tx.send_modify(|n| *n = n.wrapping_add(1));
    }

    /// A receiver the session controller polls/awaits for cancel events.
    /// Each clone tracks its own "last seen" position, so multiple
    /// subscribers never steal each other's notification.
    pub fn subscribe_cancel(&self) -> watch::Receiver<u64> {
        self.cancel_rx.clone()
    }

    fn flush(&self) -> Result<(), OverlayError> {
        let snapshot = self.state.lock().unwrap().clone();
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| OverlayError::WriteFailed(e.to_string()))?;

        if let Some(parent) = self.status_path.parent() {
            fs::create_dir_all(parent).map_err(|e| OverlayError::WriteFailed(e.to_string()))?;
        }
        let tmp_path = self.status_path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| OverlayError::WriteFailed(e.to_string()))?;
        fs::rename(&tmp_path, &self.status_path)
            .map_err(|e| OverlayError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn show_and_hide_flush_status_file() {
        let dir = tempdir().unwrap();
        let overlay = Overlay::new(dir.path().join("status.json"));
        overlay.show().unwrap();
        overlay.set_recording(true).unwrap();
        overlay.set_audio_level(1.5).unwrap();

        let contents = fs::read_to_string(dir.path().join("status.json")).unwrap();
        let parsed: OverlayState = serde_json::from_str(&contents).unwrap();
        assert!(parsed.recording);
        assert_eq!(parsed.audio_level, 1.0);

        overlay.hide().unwrap();
        let contents = fs::read_to_string(dir.path().join("status.json")).unwrap();
        let parsed: OverlayState = serde_json::from_str(&contents).unwrap();
        assert!(!parsed.recording);
        assert_eq!(parsed.status, "idle");
    }

    #[test]
    fn cancel_is_observable_by_subscribers() {
        let dir = tempdir().unwrap();
        let overlay = Overlay::new(dir.path().join("status.json"));
        let mut rx = overlay.subscribe_cancel();
        assert_eq!(*rx.borrow(), 0);
        overlay.signal_cancel();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
