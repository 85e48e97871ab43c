//! CLI argument definitions using Clap

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::domain::config::AppConfig;
use crate::domain::keys::KeyBindings;
use crate::domain::recording::Codec;

/// canvas-rec - record a display or capture device with key toggles
#[derive(Parser, Debug)]
#[command(name = "canvas-rec")]
#[command(version)]
#[command(about = "Record a display or capture device to timestamped webm/mp4 files")]
#[command(long_about = None)]
pub struct Cli {
    /// Video codec
    #[arg(short = 'c', long, value_name = "CODEC")]
    pub codec: Option<CodecArg>,

    /// Surface to capture: an X11 display (:0.0) or a device path (/dev/video0)
    #[arg(short = 's', long, value_name = "SURFACE")]
    pub surface: Option<String>,

    /// Directory recordings are saved to (default: downloads directory)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Capture frame rate
    #[arg(long, value_name = "FPS")]
    pub fps: Option<u32>,

    /// Bitrate ceiling in bits per second
    #[arg(short = 'b', long, value_name = "BPS")]
    pub bitrate: Option<u64>,

    /// Give up after this many surface probes (default: wait forever)
    #[arg(long, value_name = "N")]
    pub max_probe_attempts: Option<u32>,

    /// FFmpeg executable
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Config overrides given on the command line
    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            codec: self.codec.map(|c| Codec::from(c).as_str().to_string()),
            bitrate: self.bitrate,
            frame_rate: self.fps,
            surface: self.surface.clone(),
            output_dir: self
                .output_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            ffmpeg_path: self.ffmpeg.clone(),
            max_probe_attempts: self.max_probe_attempts,
            ..Default::default()
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Send commands to a running recorder
    Control {
        #[command(subcommand)]
        action: ControlAction,
    },
}

/// Control actions sent over the control socket
#[derive(Subcommand, Debug, Clone)]
pub enum ControlAction {
    /// Press a key (a character like `r` or a key code like `82`)
    Key {
        /// Key to press
        key: String,
    },
    /// Start if inactive, stop and save webm if recording
    Toggle,
    /// Start recording
    Start,
    /// Stop and save webm
    StopWebm,
    /// Stop and save mp4
    StopMp4,
    /// Show recorder status
    Status,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Codec argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CodecArg {
    Vp9,
    H264,
}

impl From<CodecArg> for Codec {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::Vp9 => Codec::Vp9,
            CodecArg::H264 => Codec::H264,
        }
    }
}

/// Resolved options for a recording run
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub surface: String,
    pub codec: Codec,
    pub bits_per_second: u64,
    pub frame_rate: u32,
    pub output_dir: PathBuf,
    pub ffmpeg_path: String,
    pub poll_interval: Duration,
    pub max_probe_attempts: Option<u32>,
    pub transcode_timeout: Option<Duration>,
    pub key_bindings: KeyBindings,
}

impl RecordOptions {
    /// Resolve options from a merged config
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            surface: config.surface_or_default().to_string(),
            codec: config.codec_or_default(),
            bits_per_second: config.bitrate_or_default(),
            frame_rate: config.frame_rate_or_default(),
            output_dir: config.output_dir_or_default(),
            ffmpeg_path: config.ffmpeg_path_or_default().to_string(),
            poll_interval: config.poll_interval_or_default(),
            max_probe_attempts: config.max_probe_attempts.filter(|n| *n > 0),
            transcode_timeout: config.transcode_timeout(),
            key_bindings: config.key_bindings_or_default(),
        }
    }
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "codec",
    "bitrate",
    "frame_rate",
    "surface",
    "output_dir",
    "ffmpeg_path",
    "poll_interval_ms",
    "max_probe_attempts",
    "transcode_timeout_secs",
    "keys.toggle",
    "keys.start",
    "keys.stop_webm",
    "keys.stop_mp4",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["canvas-rec"]);
        assert!(cli.codec.is_none());
        assert!(cli.surface.is_none());
        assert!(cli.output_dir.is_none());
        assert!(cli.fps.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_recording_flags() {
        let cli = Cli::parse_from([
            "canvas-rec",
            "-c",
            "h264",
            "-s",
            ":1.0",
            "-o",
            "/tmp/out",
            "--fps",
            "30",
            "--max-probe-attempts",
            "5",
            "-vv",
        ]);
        assert_eq!(cli.codec, Some(CodecArg::H264));
        assert_eq!(cli.surface, Some(":1.0".to_string()));
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(cli.fps, Some(30));
        assert_eq!(cli.max_probe_attempts, Some(5));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_overrides_become_config() {
        let cli = Cli::parse_from(["canvas-rec", "-c", "h264", "--fps", "24"]);
        let config = cli.to_config();
        assert_eq!(config.codec, Some("h264".to_string()));
        assert_eq!(config.frame_rate, Some(24));
        assert!(config.surface.is_none());
    }

    #[test]
    fn cli_parses_control_actions() {
        let cli = Cli::parse_from(["canvas-rec", "control", "stop-mp4"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Control {
                action: ControlAction::StopMp4
            })
        ));

        let cli = Cli::parse_from(["canvas-rec", "control", "key", "r"]);
        if let Some(Commands::Control {
            action: ControlAction::Key { key },
        }) = cli.command
        {
            assert_eq!(key, "r");
        } else {
            panic!("Expected Control Key command");
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["canvas-rec", "config", "set", "keys.toggle", "t"]);
        if let Some(Commands::Config {
            action: ConfigAction::Set { key, value },
        }) = cli.command
        {
            assert_eq!(key, "keys.toggle");
            assert_eq!(value, "t");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn options_from_defaults() {
        let options = RecordOptions::from_config(&AppConfig::defaults());
        assert_eq!(options.surface, ":0.0");
        assert_eq!(options.codec, Codec::Vp9);
        assert_eq!(options.bits_per_second, 100_000_000);
        assert_eq!(options.frame_rate, 60);
        assert_eq!(options.poll_interval, Duration::from_millis(100));
        assert!(options.max_probe_attempts.is_none());
        assert!(options.transcode_timeout.is_none());
        assert_eq!(options.key_bindings, KeyBindings::default());
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("codec"));
        assert!(is_valid_config_key("keys.stop_mp4"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
