//! Application configuration value object

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::keys::{parse_key_code, KeyBindings};
use crate::domain::recording::{Codec, DEFAULT_BITS_PER_SECOND};

/// Default capture surface (first X11 display)
pub const DEFAULT_SURFACE: &str = ":0.0";

/// Default capture frame rate
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Default surface probe interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Key binding section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    pub toggle: Option<String>,
    pub start: Option<String>,
    pub stop_webm: Option<String>,
    pub stop_mp4: Option<String>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub codec: Option<String>,
    pub bitrate: Option<u64>,
    pub frame_rate: Option<u32>,
    pub surface: Option<String>,
    pub output_dir: Option<String>,
    pub ffmpeg_path: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_probe_attempts: Option<u32>,
    pub transcode_timeout_secs: Option<u64>,
    pub keys: Option<KeysConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            codec: Some("vp9".to_string()),
            bitrate: Some(DEFAULT_BITS_PER_SECOND),
            frame_rate: Some(DEFAULT_FRAME_RATE),
            surface: Some(DEFAULT_SURFACE.to_string()),
            output_dir: None,
            ffmpeg_path: Some("ffmpeg".to_string()),
            poll_interval_ms: Some(DEFAULT_POLL_INTERVAL_MS),
            max_probe_attempts: None,
            transcode_timeout_secs: None,
            keys: Some(KeysConfig {
                toggle: Some("r".to_string()),
                start: Some("s".to_string()),
                stop_webm: Some("w".to_string()),
                stop_mp4: Some("m".to_string()),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            codec: other.codec.or(self.codec),
            bitrate: other.bitrate.or(self.bitrate),
            frame_rate: other.frame_rate.or(self.frame_rate),
            surface: other.surface.or(self.surface),
            output_dir: other.output_dir.or(self.output_dir),
            ffmpeg_path: other.ffmpeg_path.or(self.ffmpeg_path),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            max_probe_attempts: other.max_probe_attempts.or(self.max_probe_attempts),
            transcode_timeout_secs: other.transcode_timeout_secs.or(self.transcode_timeout_secs),
            keys: Self::merge_keys_config(self.keys, other.keys),
        }
    }

    /// Merge key binding sections
    fn merge_keys_config(base: Option<KeysConfig>, other: Option<KeysConfig>) -> Option<KeysConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(KeysConfig {
                toggle: o.toggle.or(b.toggle),
                start: o.start.or(b.start),
                stop_webm: o.stop_webm.or(b.stop_webm),
                stop_mp4: o.stop_mp4.or(b.stop_mp4),
            }),
        }
    }

    /// Get codec, or vp9 if not set/invalid
    pub fn codec_or_default(&self) -> Codec {
        self.codec
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get bitrate ceiling in bits per second
    pub fn bitrate_or_default(&self) -> u64 {
        self.bitrate
            .filter(|b| *b > 0)
            .unwrap_or(DEFAULT_BITS_PER_SECOND)
    }

    /// Get capture frame rate
    pub fn frame_rate_or_default(&self) -> u32 {
        self.frame_rate
            .filter(|f| *f > 0)
            .unwrap_or(DEFAULT_FRAME_RATE)
    }

    /// Get surface target, or the first display if not set
    pub fn surface_or_default(&self) -> &str {
        self.surface.as_deref().unwrap_or(DEFAULT_SURFACE)
    }

    /// Get output directory, or the user's download directory
    pub fn output_dir_or_default(&self) -> PathBuf {
        self.output_dir
            .as_ref()
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get ffmpeg executable, or `ffmpeg` from PATH
    pub fn ffmpeg_path_or_default(&self) -> &str {
        self.ffmpeg_path.as_deref().unwrap_or("ffmpeg")
    }

    /// Get surface probe interval
    pub fn poll_interval_or_default(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    /// Get optional transcode timeout
    pub fn transcode_timeout(&self) -> Option<Duration> {
        self.transcode_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    /// Get key bindings; unset or invalid entries keep their default
    pub fn key_bindings_or_default(&self) -> KeyBindings {
        let defaults = KeyBindings::default();
        let Some(keys) = self.keys.as_ref() else {
            return defaults;
        };
        let pick = |value: &Option<String>, fallback: u32| {
            value
                .as_deref()
                .and_then(|v| parse_key_code(v).ok())
                .unwrap_or(fallback)
        };
        KeyBindings {
            toggle: pick(&keys.toggle, defaults.toggle),
            start: pick(&keys.start, defaults.start),
            stop_webm: pick(&keys.stop_webm, defaults.stop_webm),
            stop_mp4: pick(&keys.stop_mp4, defaults.stop_mp4),
        }
    }
}
