//! Domain error types

use thiserror::Error;

/// Error when an unsupported codec name is provided
#[derive(Debug, Clone, Error)]
#[error("Invalid codec: \"{input}\". Valid codecs are: vp9, h264")]
pub struct InvalidCodecError {
    pub input: String,
}

/// Error when an unsupported container name is provided
#[derive(Debug, Clone, Error)]
#[error("Invalid container: \"{input}\". Valid containers are: webm, mp4")]
pub struct InvalidContainerError {
    pub input: String,
}

/// Error when a key binding cannot be parsed
#[derive(Debug, Clone, Error)]
#[error("Invalid key: \"{input}\". Expected a single character (e.g., r) or a numeric key code (e.g., 82)")]
pub struct InvalidKeyError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
