// Command-line interface definitions for voxtype
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "voxtype")]
#[command(author, version, about = "Voice dictation daemon for Linux")]
#[command(long_about = "
Voxtype is an always-on voice dictation daemon. Run it with no arguments
to start the daemon: press the configured hotkey to start recording,
press it again to stop and type the transcription into the focused window.

COMMANDS:
  voxtype                  Start the daemon (default)
  voxtype daemon           Same as above
  voxtype config show      Print the resolved configuration
  voxtype config path      Print the config file path
  voxtype status           Show daemon state (integrates with Waybar)
  voxtype setup            Check dependencies and download models
  voxtype transcribe FILE  Transcribe a WAV file and print the text
")]
pub struct Cli {
    /// Path to the config.toml file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dictation daemon (default if no subcommand given)
    Daemon,

    /// Transcribe a WAV file and print the result
    Transcribe {
        /// Path to a .wav file
        file: std::path::PathBuf,

        /// Print per-segment word-level confidence labels (local whisper.cpp
        /// backend only)
        #[arg(long)]
        confidence: bool,
    },

    /// Show or locate the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show daemon state (idle/recording/finalizing/stopped)
    Status {
        /// Keep printing state changes as they happen
        #[arg(long)]
        follow: bool,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check dependencies, manage the model, and register autostart
    Setup {
        #[command(subcommand)]
        action: Option<SetupAction>,

        /// Automatically download the configured model if missing
        #[arg(long)]
        download: bool,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Print the config file path
    Path,
}

#[derive(Subcommand)]
pub enum SetupAction {
    /// Install/uninstall/check the systemd user service
    Systemd {
        #[arg(long)]
        uninstall: bool,
        #[arg(long)]
        status: bool,
    },
    /// Generate Waybar integration config
    Waybar {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        css: bool,
        #[arg(long)]
        install: bool,
        #[arg(long)]
        uninstall: bool,
    },
    /// Interactively select and download a whisper model
    Model {
        #[arg(long)]
        list: bool,

        /// Set an already-downloaded model as the default (updates config.toml)
        #[arg(long, value_name = "MODEL")]
        set: Option<String>,

        /// With --set, also restart the running daemon to pick it up
        #[arg(long, requires = "set")]
        restart: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::parse_from(["voxtype"]);
        assert!(cli.command.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parses_verbosity_flags() {
        let cli = Cli::parse_from(["voxtype", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parses_transcribe_with_file() {
        let cli = Cli::parse_from(["voxtype", "transcribe", "sample.wav"]);
        match cli.command {
            Some(Commands::Transcribe { file, confidence }) => {
                assert_eq!(file, std::path::PathBuf::from("sample.wav"));
                assert!(!confidence);
            }
            _ => panic!("expected Transcribe command"),
        }
    }

    #[test]
    fn parses_config_show() {
        let cli = Cli::parse_from(["voxtype", "config", "show"]);
        match cli.command {
            Some(Commands::Config { action }) => assert_eq!(action, ConfigAction::Show),
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn parses_status_follow() {
        let cli = Cli::parse_from(["voxtype", "status", "--follow"]);
        match cli.command {
            Some(Commands::Status { follow, .. }) => assert!(follow),
            _ => panic!("expected Status command"),
        }
    }
}
