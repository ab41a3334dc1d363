//! Voxtype - always-on voice dictation daemon for Linux
//!
//! Run with `voxtype` or `voxtype daemon` to start the daemon.
//! Use `voxtype setup` to check dependencies and download models.
//! Use `voxtype transcribe <file>` to transcribe an audio file offline.

mod ai;
mod audio;
mod cli;
mod command;
mod config;
mod daemon;
mod error;
mod hotkey;
mod keysynth;
mod notification;
mod overlay;
mod session;
mod settings;
mod setup;
mod transcribe;

use clap::Parser;
use cli::{Cli, Commands, ConfigAction, SetupAction};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("voxtype={},warn", log_level))),
        )
        .with_target(false)
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut daemon = daemon::Daemon::new(config, cli.config.clone());
            daemon.run().await?;
        }

        Commands::Transcribe { file, confidence } => {
            transcribe_file(&config, &file, confidence)?;
        }

        Commands::Setup { action, download } => match action {
            Some(SetupAction::Systemd { uninstall, status }) => {
                if status {
                    setup::systemd::status().await?;
                } else if uninstall {
                    setup::systemd::uninstall().await?;
                } else {
                    setup::systemd::install().await?;
                }
            }
            Some(SetupAction::Waybar {
                json,
                css,
                install,
                uninstall,
            }) => {
                if install {
                    setup::waybar::install()?;
                } else if uninstall {
                    setup::waybar::uninstall()?;
                } else if json {
                    println!("{}", setup::waybar::get_json_config());
                } else if css {
                    println!("{}", setup::waybar::get_css_config());
                } else {
                    setup::waybar::print_config();
                }
            }
            Some(SetupAction::Model {
                list,
                set,
                restart,
            }) => {
                if let Some(model_name) = set {
                    setup::model::set_model(&model_name, restart).await?;
                } else if list {
                    setup::model::list_installed();
                } else {
                    setup::model::interactive_select().await?;
                }
            }
            None => {
                setup::run_basic_setup(&config, download).await?;
            }
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => show_config(&config)?,
            ConfigAction::Path => {
                let path = config::Config::default_path()
                    .unwrap_or_else(|| PathBuf::from("(not found)"));
                println!("{}", path.display());
            }
        },

        Commands::Status { follow, format } => {
            run_status(&config, follow, &format).await?;
        }
    }

    Ok(())
}

/// Transcribe an audio file offline (no daemon, no hotkey).
fn transcribe_file(config: &config::Config, path: &PathBuf, confidence: bool) -> anyhow::Result<()> {
    use hound::WavReader;

    println!("Loading audio file: {:?}", path);

    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    println!(
        "Audio format: {} Hz, {} channel(s), {:?}",
        spec.sample_rate, spec.channels, spec.sample_format
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .filter_map(|s| s.ok())
            .collect(),
    };

    let mono_samples: Vec<f32> = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    } else {
        samples
    };

    let final_samples = if spec.sample_rate != 16000 {
        println!("Resampling from {} Hz to 16000 Hz...", spec.sample_rate);
        resample(&mono_samples, spec.sample_rate, 16000)
    } else {
        mono_samples
    };

    println!(
        "Processing {} samples ({:.2}s)...",
        final_samples.len(),
        final_samples.len() as f32 / 16000.0
    );

    if confidence {
        if config.whisper.effective_mode() != config::WhisperMode::Local {
            anyhow::bail!("--confidence requires the local whisper.cpp backend");
        }
        let whisper = transcribe::whisper::WhisperTranscriber::new(&config.whisper)?;
        let details = whisper.transcribe_with_confidence(&final_samples)?;
        for segment in &details.segments {
            println!(
                "[{:>6.2}s-{:<6.2}s] {:?} ({:.2}) {}",
                segment.t0_cs as f32 / 100.0,
                segment.t1_cs as f32 / 100.0,
                segment.label,
                segment.probability,
                segment.text
            );
        }
        println!("\n{}", details.text);
        return Ok(());
    }

    let transcriber = transcribe::create_transcriber(&config.whisper)?;
    let text = transcriber.transcribe(&final_samples)?;

    println!("\n{}", text);
    Ok(())
}

/// Simple linear resampling
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.get(idx).copied().unwrap_or(0.0)
        };

        output.push(sample);
    }

    output
}

/// Check if the daemon is actually running by verifying the PID file
fn is_daemon_running() -> bool {
    let pid_path = config::Config::runtime_dir().join("pid");

    let pid_str = match std::fs::read_to_string(&pid_path) {
        Ok(s) => s,
        Err(_) => return false,
    };

    let pid: u32 = match pid_str.trim().parse() {
        Ok(p) => p,
        Err(_) => return false,
    };

    std::path::Path::new(&format!("/proc/{}", pid)).exists()
}

/// Read the overlay's status field, or "stopped" if the daemon isn't running.
fn read_overlay_status(status_path: &std::path::Path) -> String {
    if !is_daemon_running() {
        return "stopped".to_string();
    }

    let content = match std::fs::read_to_string(status_path) {
        Ok(c) => c,
        Err(_) => return "stopped".to_string(),
    };

    serde_json::from_str::<serde_json::Value>(&content)
        .ok()
        .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(String::from))
        .unwrap_or_else(|| "stopped".to_string())
}

/// Run the status command: print the daemon's current state, optionally
/// following changes as they happen (Waybar-style polling integration).
async fn run_status(config: &config::Config, follow: bool, format: &str) -> anyhow::Result<()> {
    let status_path = config::Config::runtime_dir().join("status.json");
    let icons = config.status.resolve_icons();

    if !follow {
        let state = read_overlay_status(&status_path);
        if format == "json" {
            println!("{}", format_state_json(&state, &icons));
        } else {
            println!("{}", state);
        }
        return Ok(());
    }

    use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    let mut last_state = read_overlay_status(&status_path);
    if format == "json" {
        println!("{}", format_state_json(&last_state, &icons));
    } else {
        println!("{}", last_state);
    }

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        NotifyConfig::default().with_poll_interval(Duration::from_millis(100)),
    )?;

    if let Some(parent) = status_path.parent() {
        std::fs::create_dir_all(parent)?;
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
    }

    loop {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(_event)) => {
                let new_state = read_overlay_status(&status_path);
                if new_state != last_state {
                    if format == "json" {
                        println!("{}", format_state_json(&new_state, &icons));
                    } else {
                        println!("{}", new_state);
                    }
                    last_state = new_state;
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Watch error: {:?}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                if !is_daemon_running() && last_state != "stopped" {
                    last_state = "stopped".to_string();
                    if format == "json" {
                        println!("{}", format_state_json(&last_state, &icons));
                    } else {
                        println!("{}", last_state);
                    }
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Format state as JSON for Waybar consumption.
/// The `alt` field enables Waybar's format-icons feature for custom icon mapping.
fn format_state_json(state: &str, icons: &config::ResolvedIcons) -> String {
    let (text, tooltip) = match state {
        "recording" => (&icons.recording, "Recording..."),
        "transcribing" => (&icons.transcribing, "Transcribing..."),
        "idle" => (&icons.idle, "Voxtype ready - press hotkey to record"),
        "stopped" => (&icons.stopped, "Voxtype not running"),
        _ => (&icons.idle, "Unknown state"),
    };

    format!(
        r#"{{"text": "{}", "alt": "{}", "class": "{}", "tooltip": "{}"}}"#,
        text, state, state, tooltip
    )
}

/// Show current configuration
fn show_config(config: &config::Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[audio]");
    println!("  device = {:?}", config.audio.device);
    println!("  sample_rate = {}", config.audio.sample_rate);
    println!("  max_duration_secs = {}", config.audio.max_duration_secs);

    println!("\n[whisper]");
    println!("  model = {:?}", config.whisper.model);
    println!("  language = {:?}", config.whisper.language);
    println!("  device = {:?}", config.whisper.device);
    println!("  translate = {}", config.whisper.translate);
    if let Some(threads) = config.whisper.threads {
        println!("  threads = {}", threads);
    }

    println!("\n[status]");
    println!("  icon_theme = {:?}", config.status.icon_theme);
    let icons = config.status.resolve_icons();
    println!(
        "  (resolved icons: idle={:?} recording={:?} transcribing={:?} stopped={:?})",
        icons.idle, icons.recording, icons.transcribing, icons.stopped
    );

    println!("\n---");
    println!(
        "Config file: {:?}",
        config::Config::default_path().unwrap_or_else(|| PathBuf::from("(not found)"))
    );
    println!("Settings file: {:?}", settings::SettingsStore::default_path());
    println!("Models dir: {:?}", config::Config::models_dir());

    Ok(())
}
