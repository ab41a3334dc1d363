//! Voxtype: always-on voice dictation daemon for Linux
//!
//! This library provides the core functionality for:
//! - Detecting a toggle hotkey via evdev (kernel-level, works on all compositors)
//! - Capturing audio via cpal (supports PipeWire, PulseAudio, ALSA)
//! - Transcribing speech using whisper.cpp (fast, local, offline)
//! - Matching transcribed text against user-defined voice commands
//! - Querying a local Ollama instance for AI-assisted text transforms
//! - Synthesizing keystrokes (or clipboard paste) via a driver fallback chain
//! - Reporting live state to a status file for bar/overlay integrations
//!
//! # Architecture
//!
//! ```text
//!                            ┌─────────────────────────────────────┐
//!                            │              Daemon                 │
//!                            │   (signals, pidlock, event loop)    │
//!                            └─────────────────────────────────────┘
//!                                            │
//!                           toggle hotkey event (evdev)
//!                                            ▼
//!                            ┌─────────────────────────────────────┐
//!                            │          SessionController          │
//!                            └─────────────────────────────────────┘
//!                                            │
//!                   ┌────────────────────────┼────────────────────────┐
//!                   ▼                        ▼                        ▼
//!          ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!          │    Audio     │         │  Transcriber │         │   Overlay    │
//!          │    (cpal)    │────────▶│ (whisper-rs) │         │ (status.json)│
//!          └──────────────┘         └──────────────┘         └──────────────┘
//!                                            │ raw text
//!                                            ▼
//!                                   ┌──────────────┐
//!                                   │ CommandEngine│ (voice commands, AiQueryService)
//!                                   └──────────────┘
//!                                            │ text to type
//!                                            ▼
//!                                   ┌──────────────┐
//!                                   │  keysynth    │ (wtype/dotool/ydotool/clipboard)
//!                                   └──────────────┘
//! ```

pub mod ai;
pub mod audio;
pub mod cli;
pub mod command;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hotkey;
pub mod keysynth;
pub mod notification;
pub mod overlay;
pub mod session;
pub mod settings;
pub mod setup;
pub mod transcribe;

pub use cli::{Cli, Commands, ConfigAction, SetupAction};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Result, VoxtypeError};
