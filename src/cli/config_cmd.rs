//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, KeysConfig};
use crate::domain::error::ConfigError;
use crate::domain::keys::parse_key_code;
use crate::domain::recording::Codec;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    apply_config_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match config_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            &config_value(&config, key).unwrap_or_else(|| NOT_SET.to_string()),
        );
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }
    Ok(())
}

/// Current value of a key, formatted for display
pub fn config_value(config: &AppConfig, key: &str) -> Option<String> {
    let keys = config.keys.as_ref();
    match key {
        "codec" => config.codec.clone(),
        "bitrate" => config.bitrate.map(|v| v.to_string()),
        "frame_rate" => config.frame_rate.map(|v| v.to_string()),
        "surface" => config.surface.clone(),
        "output_dir" => config.output_dir.clone(),
        "ffmpeg_path" => config.ffmpeg_path.clone(),
        "poll_interval_ms" => config.poll_interval_ms.map(|v| v.to_string()),
        "max_probe_attempts" => config.max_probe_attempts.map(|v| v.to_string()),
        "transcode_timeout_secs" => config.transcode_timeout_secs.map(|v| v.to_string()),
        "keys.toggle" => keys.and_then(|k| k.toggle.clone()),
        "keys.start" => keys.and_then(|k| k.start.clone()),
        "keys.stop_webm" => keys.and_then(|k| k.stop_webm.clone()),
        "keys.stop_mp4" => keys.and_then(|k| k.stop_mp4.clone()),
        _ => None,
    }
}

/// Validate `value` for `key` and store it
pub fn apply_config_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "codec" => {
            let codec = value
                .parse::<Codec>()
                .map_err(|e| invalid(e.to_string()))?;
            config.codec = Some(codec.as_str().to_string());
        }
        "bitrate" => config.bitrate = Some(parse_positive(value).map_err(invalid)?),
        "poll_interval_ms" => config.poll_interval_ms = Some(parse_positive(value).map_err(invalid)?),
        "transcode_timeout_secs" => {
            config.transcode_timeout_secs = Some(parse_positive(value).map_err(invalid)?)
        }
        "frame_rate" => config.frame_rate = Some(parse_positive(value).map_err(invalid)?),
        "max_probe_attempts" => {
            config.max_probe_attempts = Some(parse_positive(value).map_err(invalid)?)
        }
        "surface" | "output_dir" | "ffmpeg_path" => {
            let value = value.trim();
            if value.is_empty() {
                return Err(invalid("Value must not be empty".to_string()));
            }
            let slot = match key {
                "surface" => &mut config.surface,
                "output_dir" => &mut config.output_dir,
                _ => &mut config.ffmpeg_path,
            };
            *slot = Some(value.to_string());
        }
        "keys.toggle" | "keys.start" | "keys.stop_webm" | "keys.stop_mp4" => {
            parse_key_code(value).map_err(|e| invalid(e.to_string()))?;
            let keys = config.keys.get_or_insert_with(KeysConfig::default);
            let slot = match key {
                "keys.toggle" => &mut keys.toggle,
                "keys.start" => &mut keys.start,
                "keys.stop_webm" => &mut keys.stop_webm,
                _ => &mut keys.stop_mp4,
            };
            *slot = Some(value.trim().to_string());
        }
        _ => {
            return Err(invalid(format!(
                "Unknown key. Valid keys: {}",
                VALID_CONFIG_KEYS.join(", ")
            )))
        }
    }
    Ok(())
}

/// Parse a number greater than zero
fn parse_positive<N>(value: &str) -> Result<N, String>
where
    N: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<N>() {
        Ok(n) if n > N::default() => Ok(n),
        _ => Err(format!("Expected a positive number, got '{}'", value)),
    }
}
