//! Error types
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the daemon
#[derive(Error, Debug)]
pub enum VoxtypeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("AI query service error: {0}")]
    AiService(#[from] AiServiceError),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to the hot-reloadable settings store
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to write settings file: {0}")]
    Write(String),

    #[error("Unknown settings key: '{0}'")]
    UnknownKey(String),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Invalid hotkey specification: '{0}'")]
    InvalidSpec(String),

    #[error("evdev error: {0}")]
    Evdev(String),

    #[error("X11 connection error: {0}")]
    X11(String),

    #[error("hotkey detection not supported: {0}")]
    NotSupported(String),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio device not found: '{0}'. List devices with: pactl list sources short")]
    DeviceNotFound(String),

    #[error("Audio device not found: '{requested}'. {available}")]
    DeviceNotFoundWithList { requested: String, available: String },

    #[error("Recording timeout: exceeded {0} seconds")]
    Timeout(u32),

    #[error("No audio was captured. Check your microphone.")]
    EmptyRecording,

    #[error("Audio stream error: {0}")]
    StreamError(String),
}

/// Errors related to speech-to-text transcription
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Model not found: {0}\n  Place a ggml whisper model in the models directory.")]
    ModelNotFound(String),

    #[error("Whisper initialization failed: {0}")]
    InitFailed(String),

    #[error("Transcription failed: {0}")]
    InferenceFailed(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Remote server error: {0}")]
    RemoteError(String),
}

/// Errors related to text output / key synthesis
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool\n  Enable at boot: systemctl --user enable ydotool")]
    YdotoolNotRunning,

    #[error("ydotool not found in PATH. Install via your package manager.")]
    YdotoolNotFound,

    #[error("wtype not found in PATH. Install via your package manager.")]
    WtypeNotFound,

    #[error("dotool not found in PATH. Install via your package manager.")]
    DotoolNotFound,

    #[error("wl-copy not found in PATH. Install wl-clipboard via your package manager.")]
    WlCopyNotFound,

    #[error("xclip not found in PATH. Install via your package manager.")]
    XclipNotFound,

    #[error("Unknown key specification: '{0}'")]
    UnknownKeySpec(String),

    #[error("Text injection failed: {0}")]
    InjectionFailed(String),

    #[error("Clipboard read failed: {0}")]
    ClipboardReadFailed(String),

    #[error("Ctrl+V simulation failed: {0}")]
    CtrlVFailed(String),

    #[error("All output methods failed. Ensure wtype, ydotool, or wl-copy is available.")]
    AllMethodsFailed,
}

/// Errors related to command parsing and execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid macro expression: {0}")]
    InvalidMacro(String),

    #[error("Unknown command reference: '@{0}'")]
    UnknownCommandRef(String),

    #[error("Output error during command execution: {0}")]
    Output(#[from] OutputError),

    #[error("AI query failed during command execution: {0}")]
    AiService(#[from] AiServiceError),

    #[error("Macro execution failed: {0}")]
    Macro(#[from] crate::command::MacroError),
}

/// Errors related to the local AI query service (Ollama-compatible)
#[derive(Error, Debug)]
pub enum AiServiceError {
    #[error("AI service unavailable at {0}")]
    Unavailable(String),

    #[error("AI service request failed: {0}")]
    RequestFailed(String),

    #[error("AI service returned an unexpected response: {0}")]
    BadResponse(String),

    #[error("No model configured or available")]
    NoModel,
}

/// Errors related to the overlay adapter
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Failed to write overlay state: {0}")]
    WriteFailed(String),
}

/// Result type alias using VoxtypeError
pub type Result<T> = std::result::Result<T, VoxtypeError>;

impl From<evdev::Error> for HotkeyError {
    fn from(e: evdev::Error) -> Self {
        HotkeyError::Evdev(e.to_string())
    }
}
