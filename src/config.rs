//! Configuration loading and types for voxtype
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/voxtype/config.toml)
//! 3. Environment variables (VOXTYPE_*)
//!
//! Settings that change at runtime (hotkey, custom commands, Ollama
//! options) live in `settings.json` instead, managed by [`crate::settings`].
//! This file only covers things fixed for the life of the process: audio
//! device selection, the transcription backend, and status-icon theming.

use crate::error::VoxtypeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Voxtype Configuration
#
# Location: ~/.config/voxtype/config.toml
#
# Hotkey, custom voice commands, and Ollama settings are hot-reloadable
# and live in settings.json instead (see `voxtype config path`).

[audio]
# Audio input device ("default" uses system default)
# List devices with: pactl list sources short
device = "default"

# Sample rate in Hz (whisper expects 16000)
sample_rate = 16000

# Maximum recording duration in seconds (safety limit)
max_duration_secs = 60

[whisper]
# Transcription backend: "local", "remote", or "cli"
# - local: Use whisper.cpp locally via FFI (default)
# - remote: Send audio to a remote whisper.cpp server or OpenAI-compatible API
# - cli: Shell out to a whisper-cli binary (fallback when the FFI bundling breaks)
# mode = "local"

# Model to use for transcription (local/cli backend)
# Options: tiny, tiny.en, base, base.en, small, small.en, medium, medium.en, large-v3, large-v3-turbo
# Or provide an absolute path to a custom .bin model file
model = "base.en"

# Language for transcription
# Options:
#   - Single language: "en", "fr", "de", etc.
#   - Auto-detect all: "auto"
#   - Constrained auto-detect: ["en", "fr"] (detects from allowed set only)
language = "en"

# Compute device for the local backend: "auto", "cpu", or "cuda".
# "auto" uses a GPU backend compiled in via the gpu-* cargo features if one
# is detected at runtime, otherwise falls back to CPU.
# device = "auto"

# Translate non-English speech to English
translate = false

# Number of CPU threads for inference (omit for auto-detection)
# threads = 4

# Initial prompt to provide context for transcription
# Use this to hint at terminology, proper nouns, or formatting conventions.
# initial_prompt = ""

# --- Remote backend settings (used when mode = "remote") ---
#
# remote_endpoint = "http://192.168.1.100:8080"
# remote_model = "whisper-1"
# remote_api_key = ""  # or set VOXTYPE_WHISPER_API_KEY
# remote_timeout_secs = 30

# --- CLI backend settings (used when mode = "cli") ---
#
# whisper_cli_path = "/usr/local/bin/whisper-cli"

# [status]
# Status display icons for Waybar/tray integrations
#
# Icon theme (or path to custom theme file):
#   Font-based (require specific fonts):
#     - "emoji"     - Default emoji icons
#     - "nerd-font" - Nerd Font icons
#     - "material"  - Material Design Icons
#     - "phosphor"  - Phosphor Icons
#     - "codicons"  - VS Code icons
#     - "omarchy"   - Omarchy distro icons
#   Universal (no special fonts needed):
#     - "minimal"   - Simple Unicode
#     - "dots"      - Geometric shapes
#     - "arrows"    - Media player style
#     - "text"      - Plain text labels
# icon_theme = "emoji"
#
# Per-state icon overrides (optional, takes precedence over theme)
# [status.icons]
# idle = ""
# recording = ""
# transcribing = ""
# stopped = ""
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub audio: AudioConfig,

    #[serde(default)]
    pub whisper: WhisperConfig,

    /// Status display configuration (icons for Waybar/tray integrations)
    #[serde(default)]
    pub status: StatusConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// PipeWire/PulseAudio device name, or "default"
    pub device: String,

    /// Sample rate in Hz (whisper expects 16000)
    pub sample_rate: u32,

    /// Maximum recording duration in seconds (safety limit)
    pub max_duration_secs: u32,
}

fn default_on_demand_loading() -> bool {
    false
}

fn default_whisper_model() -> String {
    "base.en".to_string()
}

/// Status display configuration for Waybar/tray integrations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusConfig {
    /// Icon theme: "emoji", "nerd-font", "omarchy", "minimal", or path to custom theme
    #[serde(default = "default_icon_theme")]
    pub icon_theme: String,

    /// Per-state icon overrides (optional, takes precedence over theme)
    #[serde(default)]
    pub icons: StatusIconOverrides,
}

fn default_icon_theme() -> String {
    "emoji".to_string()
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            icon_theme: default_icon_theme(),
            icons: StatusIconOverrides::default(),
        }
    }
}

/// Per-state icon overrides for status display
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusIconOverrides {
    pub idle: Option<String>,
    pub recording: Option<String>,
    pub transcribing: Option<String>,
    pub stopped: Option<String>,
}

/// Resolved icons for each state (after applying theme + overrides)
#[derive(Debug, Clone)]
pub struct ResolvedIcons {
    pub idle: String,
    pub recording: String,
    pub transcribing: String,
    pub stopped: String,
}

impl StatusConfig {
    /// Resolve icons by loading theme and applying any overrides
    pub fn resolve_icons(&self) -> ResolvedIcons {
        let mut icons = load_icon_theme(&self.icon_theme);

        if let Some(ref icon) = self.icons.idle {
            icons.idle = icon.clone();
        }
        if let Some(ref icon) = self.icons.recording {
            icons.recording = icon.clone();
        }
        if let Some(ref icon) = self.icons.transcribing {
            icons.transcribing = icon.clone();
        }
        if let Some(ref icon) = self.icons.stopped {
            icons.stopped = icon.clone();
        }

        icons
    }
}

/// Load an icon theme by name or from a custom file path
fn load_icon_theme(theme: &str) -> ResolvedIcons {
    match theme {
        "emoji" => ResolvedIcons {
            idle: "🎙️".to_string(),
            recording: "🔴".to_string(),
            transcribing: "⏳".to_string(),
            stopped: "".to_string(),
        },
        "nerd-font" => ResolvedIcons {
            idle: "\u{f130}".to_string(),
            recording: "\u{f111}".to_string(),
            transcribing: "\u{f110}".to_string(),
            stopped: "\u{f131}".to_string(),
        },
        "omarchy" => ResolvedIcons {
            idle: "\u{ec12}".to_string(),
            recording: "\u{f036c}".to_string(),
            transcribing: "\u{f051f}".to_string(),
            stopped: "\u{ec12}".to_string(),
        },
        "minimal" => ResolvedIcons {
            idle: "○".to_string(),
            recording: "●".to_string(),
            transcribing: "◐".to_string(),
            stopped: "×".to_string(),
        },
        "material" => ResolvedIcons {
            idle: "\u{f036c}".to_string(),
            recording: "\u{f040a}".to_string(),
            transcribing: "\u{f04ce}".to_string(),
            stopped: "\u{f036d}".to_string(),
        },
        "phosphor" => ResolvedIcons {
            idle: "\u{e43a}".to_string(),
            recording: "\u{e438}".to_string(),
            transcribing: "\u{e225}".to_string(),
            stopped: "\u{e43b}".to_string(),
        },
        "codicons" => ResolvedIcons {
            idle: "\u{eb51}".to_string(),
            recording: "\u{ebfc}".to_string(),
            transcribing: "\u{eb4c}".to_string(),
            stopped: "\u{eb52}".to_string(),
        },
        "text" => ResolvedIcons {
            idle: "[MIC]".to_string(),
            recording: "[REC]".to_string(),
            transcribing: "[...]".to_string(),
            stopped: "[OFF]".to_string(),
        },
        "dots" => ResolvedIcons {
            idle: "◯".to_string(),
            recording: "⬤".to_string(),
            transcribing: "◔".to_string(),
            stopped: "◌".to_string(),
        },
        "arrows" => ResolvedIcons {
            idle: "▶".to_string(),
            recording: "●".to_string(),
            transcribing: "↻".to_string(),
            stopped: "■".to_string(),
        },
        path => load_custom_icon_theme(path).unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to load custom icon theme '{}': {}, using emoji",
                path,
                e
            );
            load_icon_theme("emoji")
        }),
    }
}

/// Load a custom icon theme from a TOML file
fn load_custom_icon_theme(path: &str) -> Result<ResolvedIcons, String> {
    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(format!("Theme file not found: {}", path.display()));
    }

    let contents =
        std::fs::read_to_string(&path).map_err(|e| format!("Failed to read theme file: {}", e))?;

    #[derive(Deserialize)]
    struct ThemeFile {
        idle: Option<String>,
        recording: Option<String>,
        transcribing: Option<String>,
        stopped: Option<String>,
    }

    let theme: ThemeFile =
        toml::from_str(&contents).map_err(|e| format!("Invalid theme file: {}", e))?;

    let base = load_icon_theme("emoji");
    Ok(ResolvedIcons {
        idle: theme.idle.unwrap_or(base.idle),
        recording: theme.recording.unwrap_or(base.recording),
        transcribing: theme.transcribing.unwrap_or(base.transcribing),
        stopped: theme.stopped.unwrap_or(base.stopped),
    })
}

/// Whisper execution mode (how whisper runs)
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WhisperMode {
    /// Local transcription using whisper.cpp FFI
    #[default]
    Local,
    /// Remote transcription via OpenAI-compatible API
    Remote,
    /// CLI transcription using whisper-cli subprocess
    /// Fallback for systems where whisper-rs FFI doesn't work (e.g., glibc 2.42+)
    Cli,
}

/// Compute device selection for the local whisper.cpp backend.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceConfig {
    /// Use a GPU backend if this binary was built with one and whisper.cpp
    /// detects a compatible device at runtime; fall back to CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl DeviceConfig {
    /// Whether whisper.cpp should attempt to use the compiled-in GPU
    /// backend at all. `Cpu` disables it outright; `Auto`/`Cuda` both let
    /// whisper.cpp's own device probing decide, since the Vulkan/CUDA/
    /// hipBLAS backends already fall back to CPU when no device is found.
    pub fn use_gpu(self) -> bool {
        !matches!(self, DeviceConfig::Cpu)
    }
}

/// Language configuration supporting single language or array of allowed languages
///
/// Supports three modes:
/// - Single language: `language = "en"` - use this specific language
/// - Auto-detect: `language = "auto"` - let Whisper detect from all languages
/// - Constrained auto-detect: `language = ["en", "fr"]` - detect from allowed set
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LanguageConfig {
    /// Single language code (e.g., "en", "fr", "auto")
    Single(String),
    /// Array of allowed language codes for constrained auto-detection
    Multiple(Vec<String>),
}

impl Default for LanguageConfig {
    fn default() -> Self {
        LanguageConfig::Single("en".to_string())
    }
}

impl LanguageConfig {
    /// Convert to a vector of language codes
    pub fn as_vec(&self) -> Vec<String> {
        match self {
            LanguageConfig::Single(s) => vec![s.clone()],
            LanguageConfig::Multiple(v) => v.clone(),
        }
    }

    /// Check if this is the "auto" setting (unconstrained auto-detection)
    pub fn is_auto(&self) -> bool {
        matches!(self, LanguageConfig::Single(s) if s == "auto")
    }

    /// Check if multiple languages are configured (constrained auto-detection)
    pub fn is_multiple(&self) -> bool {
        matches!(self, LanguageConfig::Multiple(v) if v.len() > 1)
    }

    /// Get the first/primary language (used for fallback or single-language mode)
    pub fn primary(&self) -> &str {
        match self {
            LanguageConfig::Single(s) => s,
            LanguageConfig::Multiple(v) => v.first().map(|s| s.as_str()).unwrap_or("en"),
        }
    }

    /// Parse from a comma-separated string (used for CLI argument passing)
    ///
    /// Examples:
    /// - "en" -> Single("en")
    /// - "auto" -> Single("auto")
    /// - "en,fr,de" -> Multiple(["en", "fr", "de"])
    pub fn from_comma_separated(s: &str) -> Self {
        let parts: Vec<String> = s.split(',').map(|p| p.trim().to_string()).collect();
        if parts.len() == 1 {
            LanguageConfig::Single(parts.into_iter().next().unwrap())
        } else {
            LanguageConfig::Multiple(parts)
        }
    }
}

/// Whisper speech-to-text configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperConfig {
    /// Execution mode: "local", "remote", or "cli" (preferred field name)
    #[serde(default)]
    pub mode: Option<WhisperMode>,

    /// DEPRECATED: Use `mode` instead. Kept for backwards compatibility.
    #[serde(default)]
    pub backend: Option<WhisperMode>,

    /// Model name: tiny, base, small, medium, large-v3, large-v3-turbo
    /// Can also be an absolute path to a .bin file
    #[serde(default = "default_whisper_model")]
    pub model: String,

    /// Language configuration: single code, "auto", or array of allowed languages
    #[serde(default)]
    pub language: LanguageConfig,

    /// Compute device for the local backend: "auto", "cpu", or "cuda".
    #[serde(default)]
    pub device: DeviceConfig,

    /// Translate to English if source language is not English
    #[serde(default)]
    pub translate: bool,

    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,

    /// Load model on-demand when recording starts (true) or keep loaded (false)
    #[serde(default = "default_on_demand_loading")]
    pub on_demand_loading: bool,

    /// Initial prompt to provide context for transcription
    #[serde(default)]
    pub initial_prompt: Option<String>,

    // --- Remote backend settings ---
    /// Remote server endpoint URL (e.g., "http://192.168.1.100:8080")
    /// Required when mode = "remote"
    #[serde(default)]
    pub remote_endpoint: Option<String>,

    /// Model name to send to remote server (default: "whisper-1")
    #[serde(default)]
    pub remote_model: Option<String>,

    /// API key for remote server (optional, can also use VOXTYPE_WHISPER_API_KEY env var)
    #[serde(default)]
    pub remote_api_key: Option<String>,

    /// Timeout for remote requests in seconds (default: 30)
    #[serde(default)]
    pub remote_timeout_secs: Option<u64>,

    // --- CLI backend settings ---
    /// Path to whisper-cli binary (optional, searches PATH if not set)
    /// Used when mode = "cli"
    #[serde(default)]
    pub whisper_cli_path: Option<String>,
}

impl WhisperConfig {
    /// Get the effective execution mode, preferring `mode` over deprecated `backend`
    pub fn effective_mode(&self) -> WhisperMode {
        if let Some(mode) = self.mode {
            return mode;
        }
        if let Some(backend) = self.backend {
            tracing::warn!("DEPRECATED: [whisper] backend is deprecated, use 'mode' instead");
            return backend;
        }
        WhisperMode::default()
    }
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            mode: None,
            backend: None,
            model: default_whisper_model(),
            language: LanguageConfig::default(),
            device: DeviceConfig::default(),
            translate: false,
            threads: None,
            on_demand_loading: default_on_demand_loading(),
            initial_prompt: None,
            remote_endpoint: None,
            remote_model: None,
            remote_api_key: None,
            remote_timeout_secs: None,
            whisper_cli_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig {
                device: "default".to_string(),
                sample_rate: 16000,
                max_duration_secs: 60,
            },
            whisper: WhisperConfig::default(),
            status: StatusConfig::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "voxtype")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (PID lock, overlay status)
    pub fn runtime_dir() -> PathBuf {
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("voxtype")
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "voxtype")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the data directory path (for models)
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "voxtype")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the models directory path
    pub fn models_dir() -> PathBuf {
        Self::data_dir().join("models")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories() -> std::io::Result<()> {
        if let Some(config_dir) = Self::config_dir() {
            std::fs::create_dir_all(&config_dir)?;
            tracing::debug!("Ensured config directory exists: {:?}", config_dir);
        }

        let models_dir = Self::models_dir();
        std::fs::create_dir_all(&models_dir)?;
        tracing::debug!("Ensured models directory exists: {:?}", models_dir);

        Ok(())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, VoxtypeError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| VoxtypeError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| VoxtypeError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    if let Ok(model) = std::env::var("VOXTYPE_MODEL") {
        config.whisper.model = model;
    }

    Ok(config)
}

/// Save configuration to file
#[allow(dead_code)]
pub fn save_config(config: &Config, path: &Path) -> Result<(), VoxtypeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| VoxtypeError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| VoxtypeError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, contents)
        .map_err(|e| VoxtypeError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.whisper.model, "base.en");
        assert_eq!(config.whisper.effective_mode(), WhisperMode::Local);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
            [audio]
            device = "default"
            sample_rate = 16000
            max_duration_secs = 30

            [whisper]
            model = "small.en"
            language = "en"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.whisper.model, "small.en");
        assert_eq!(config.audio.max_duration_secs, 30);
    }

    #[test]
    fn test_parse_remote_mode() {
        let toml_str = r#"
            [audio]
            device = "default"
            sample_rate = 16000
            max_duration_secs = 60

            [whisper]
            mode = "remote"
            model = "base.en"
            language = "en"
            remote_endpoint = "http://localhost:8080"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.whisper.effective_mode(), WhisperMode::Remote);
        assert_eq!(
            config.whisper.remote_endpoint,
            Some("http://localhost:8080".to_string())
        );
    }

    #[test]
    fn test_deprecated_backend_falls_back() {
        let toml_str = r#"
            [audio]
            device = "default"
            sample_rate = 16000
            max_duration_secs = 60

            [whisper]
            backend = "cli"
            model = "base.en"
            language = "en"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.whisper.effective_mode(), WhisperMode::Cli);
    }

    #[test]
    fn test_builtin_icon_themes() {
        let themes = [
            "emoji",
            "nerd-font",
            "material",
            "phosphor",
            "codicons",
            "omarchy",
            "minimal",
            "dots",
            "arrows",
            "text",
        ];

        for theme in themes {
            let icons = load_icon_theme(theme);
            assert!(
                !icons.idle.is_empty() || theme == "emoji",
                "Theme {} should have idle icon",
                theme
            );
            assert!(
                !icons.recording.is_empty(),
                "Theme {} should have recording icon",
                theme
            );
            assert!(
                !icons.transcribing.is_empty(),
                "Theme {} should have transcribing icon",
                theme
            );
        }
    }

    #[test]
    fn test_emoji_theme_icons() {
        let icons = load_icon_theme("emoji");
        assert!(icons.idle.contains('🎙'));
        assert!(icons.recording.contains('🔴'));
        assert!(icons.transcribing.contains('⏳'));
        assert!(icons.stopped.is_empty());
    }

    #[test]
    fn test_text_theme_icons() {
        let icons = load_icon_theme("text");
        assert_eq!(icons.idle, "[MIC]");
        assert_eq!(icons.recording, "[REC]");
        assert_eq!(icons.transcribing, "[...]");
        assert_eq!(icons.stopped, "[OFF]");
    }

    #[test]
    fn test_minimal_theme_icons() {
        let icons = load_icon_theme("minimal");
        assert_eq!(icons.idle, "○");
        assert_eq!(icons.recording, "●");
        assert_eq!(icons.transcribing, "◐");
        assert_eq!(icons.stopped, "×");
    }

    #[test]
    fn test_status_config_default() {
        let status = StatusConfig::default();
        assert_eq!(status.icon_theme, "emoji");
        assert!(status.icons.idle.is_none());
        assert!(status.icons.recording.is_none());
    }

    #[test]
    fn test_status_config_resolve_icons() {
        let status = StatusConfig {
            icon_theme: "text".to_string(),
            icons: StatusIconOverrides::default(),
        };
        let icons = status.resolve_icons();
        assert_eq!(icons.idle, "[MIC]");
        assert_eq!(icons.recording, "[REC]");
    }

    #[test]
    fn test_status_config_icon_overrides() {
        let status = StatusConfig {
            icon_theme: "emoji".to_string(),
            icons: StatusIconOverrides {
                idle: None,
                recording: Some("🟢".to_string()),
                transcribing: None,
                stopped: Some("⚫".to_string()),
            },
        };
        let icons = status.resolve_icons();
        assert!(icons.idle.contains('🎙'));
        assert_eq!(icons.recording, "🟢");
        assert!(icons.transcribing.contains('⏳'));
        assert_eq!(icons.stopped, "⚫");
    }

    #[test]
    fn test_parse_status_config_from_toml() {
        let toml_str = r#"
            [audio]
            device = "default"
            sample_rate = 16000
            max_duration_secs = 60

            [whisper]
            model = "base.en"
            language = "en"

            [status]
            icon_theme = "nerd-font"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.status.icon_theme, "nerd-font");
    }

    #[test]
    fn test_parse_status_icon_overrides_from_toml() {
        let toml_str = r#"
            [audio]
            device = "default"
            sample_rate = 16000
            max_duration_secs = 60

            [whisper]
            model = "base.en"
            language = "en"

            [status]
            icon_theme = "emoji"

            [status.icons]
            recording = "🟢"
            stopped = "⚫"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.status.icon_theme, "emoji");
        assert!(config.status.icons.idle.is_none());
        assert_eq!(config.status.icons.recording, Some("🟢".to_string()));
        assert!(config.status.icons.transcribing.is_none());
        assert_eq!(config.status.icons.stopped, Some("⚫".to_string()));

        let icons = config.status.resolve_icons();
        assert_eq!(icons.recording, "🟢");
        assert_eq!(icons.stopped, "⚫");
    }
}
