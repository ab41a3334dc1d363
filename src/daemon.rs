//! Daemon entry point: wires the hotkey listener to the session controller
//! and keeps the process alive under `tokio::select!` until a shutdown
//! signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use pidlock::Pidlock;
use tokio::signal::unix::{signal, SignalKind};

use crate::config::Config;
use crate::error::{Result, VoxtypeError};
use crate::hotkey::{self, HotkeyEvent};
use crate::overlay::Overlay;
use crate::session::SessionController;
use crate::settings::SettingsStore;
use crate::transcribe;

/// How often the main loop polls the cancel-trigger file while idle.
const CANCEL_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

/// Write the daemon's PID to the runtime directory so external tools
/// (`voxtype status`, shell scripts) can find the process.
fn write_pid_file() -> Option<PathBuf> {
    let pid_path = Config::runtime_dir().join("pid");
    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }
    let pid = std::process::id();
    if let Err(e) = std::fs::write(&pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }
    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path)
}

fn cleanup_pid_file(path: &PathBuf) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove PID file: {}", e);
        }
    }
}

/// Check whether an external script or the overlay's cancel button left a
/// trigger file behind, consuming it if present.
fn check_cancel_requested() -> bool {
    let cancel_file = Config::runtime_dir().join("cancel");
    if cancel_file.exists() {
        let _ = std::fs::remove_file(&cancel_file);
        true
    } else {
        false
    }
}

fn cleanup_cancel_file() {
    let cancel_file = Config::runtime_dir().join("cancel");
    let _ = std::fs::remove_file(&cancel_file);
}

/// Owns process-level orchestration: single-instance guard, signal
/// handling, and the event loop binding the hotkey listener to the
/// session controller. The actual recording/transcription/command/output
/// state machine lives in [`SessionController`].
pub struct Daemon {
    config: Config,
    config_path: Option<PathBuf>,
    pid_file_path: Option<PathBuf>,
}

impl Daemon {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            pid_file_path: None,
        }
    }

    /// Run the daemon until a shutdown signal (SIGINT/SIGTERM) arrives.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting voxtype daemon");

        cleanup_cancel_file();
        self.pid_file_path = write_pid_file();

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            VoxtypeError::Config(format!("Failed to set up SIGTERM handler: {}", e))
        })?;
        let mut sighup = signal(SignalKind::hangup()).map_err(|e| {
            VoxtypeError::Config(format!("Failed to set up SIGHUP handler: {}", e))
        })?;

        Config::ensure_directories()
            .map_err(|e| VoxtypeError::Config(format!("Failed to create directories: {}", e)))?;

        let lock_path = Config::runtime_dir().join("voxtype.lock");
        let lock_path_str = lock_path.to_string_lossy().to_string();
        let mut pidlock = Pidlock::new(&lock_path_str);
        if let Err(e) = pidlock.acquire() {
            tracing::error!("Failed to acquire lock: another voxtype instance is already running");
            return Err(VoxtypeError::Config(format!(
                "Another voxtype instance is already running (lock error: {:?})",
                e
            )));
        }
        tracing::debug!("Acquired PID lock at {:?}", lock_path);

        let settings_path = self
            .config_path
            .as_ref()
            .map(|p| p.with_file_name("settings.json"))
            .unwrap_or_else(SettingsStore::default_path);
        let settings = SettingsStore::load(settings_path)?;
        let _settings_watcher = settings.watch().ok();

        if let Err(e) =
            crate::setup::sync_autostart(settings.get_bool("auto_start").unwrap_or(false))
        {
            tracing::warn!("Failed to sync autostart descriptor: {}", e);
        }

        let overlay = Overlay::new(Config::runtime_dir().join("status.json"));

        tracing::info!("Loading transcription model: {}", self.config.whisper.model);
        let transcriber: Arc<dyn transcribe::Transcriber> =
            transcribe::create_transcriber(&self.config.whisper)?;

        let controller = Arc::new(SessionController::new(
            settings.clone(),
            overlay.clone(),
            transcriber.clone(),
            self.config.audio.clone(),
        ));

        for key in ["model", "device", "language"] {
            let transcriber = transcriber.clone();
            let settings_handle = settings.clone();
            settings.on_change(
                key,
                Box::new(move |_old, _new| {
                    transcriber.reload_settings(&settings_handle);
                }),
            );
        }

        {
            let controller = controller.clone();
            settings.on_change(
                "custom_commands",
                Box::new(move |_old, _new| {
                    let controller = controller.clone();
                    tokio::spawn(async move { controller.reload_commands().await });
                }),
            );
        }
        {
            let controller = controller.clone();
            settings.on_change(
                "disabled_commands",
                Box::new(move |_old, _new| {
                    let controller = controller.clone();
                    tokio::spawn(async move { controller.reload_commands().await });
                }),
            );
        }
        {
            let controller = controller.clone();
            settings.on_change(
                "builtin_overrides",
                Box::new(move |_old, _new| {
                    let controller = controller.clone();
                    tokio::spawn(async move { controller.reload_commands().await });
                }),
            );
        }

        let initial_hotkey = settings.get_string("hotkey").unwrap_or_default();
        tracing::info!("Hotkey: {}", initial_hotkey);
        let mut listener = hotkey::create_listener(&initial_hotkey)?;
        let mut hotkey_rx = listener.start().await?;
        let listener: Arc<dyn hotkey::HotkeyListener> = Arc::from(listener);

        {
            let listener = listener.clone();
            settings.on_change(
                "hotkey",
                Box::new(move |new, _old| {
                    if let Some(spec) = new.as_str() {
                        if let Err(e) = listener.update_hotkey(spec) {
                            tracing::warn!("Failed to apply new hotkey {:?}: {}", spec, e);
                        }
                    }
                }),
            );
        }

        tracing::info!("Ready for voice input");

        loop {
            tokio::select! {
                event = hotkey_rx.recv() => {
                    match event {
                        Some(HotkeyEvent::Toggle) => {
                            if let Err(e) = controller.toggle().await {
                                tracing::error!("Session toggle failed: {}", e);
                            }
                        }
                        None => {
                            tracing::warn!("Hotkey listener channel closed");
                            break;
                        }
                    }
                }

                _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                    if check_cancel_requested() && controller.is_recording().await {
                        tracing::info!("Session cancelled via trigger file");
                        if let Err(e) = controller.cancel().await {
                            tracing::warn!("Cancel failed: {}", e);
                        }
                    }
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                    break;
                }

                _ = sighup.recv() => {
                    tracing::debug!("Received SIGHUP, reloading settings from disk");
                    if let Err(e) = settings.reload() {
                        tracing::warn!("Failed to reload settings: {}", e);
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl-C, shutting down");
                    break;
                }
            }
        }

        if let Some(ref path) = self.pid_file_path {
            cleanup_pid_file(path);
        }
        cleanup_cancel_file();
        let _ = pidlock.release();
        Ok(())
    }
}
