//! Transcoder port interface

use async_trait::async_trait;
use thiserror::Error;

/// Transcoding errors
#[derive(Debug, Clone, Error)]
pub enum TranscodeError {
    #[error("Failed to load transcoder: {0}")]
    LoadFailed(String),

    #[error("Transcoder is not loaded")]
    NotLoaded,

    #[error("Invalid file name for transcoder: {0}")]
    InvalidName(String),

    #[error("Transcoder file error: {0}")]
    FileFailed(String),

    #[error("Transcoder command failed: {0}")]
    RunFailed(String),
}

/// Port for an external transcoder with its own working filesystem
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Prepare the transcoder. Safe to call more than once.
    async fn load(&self) -> Result<(), TranscodeError>;

    /// Write a file into the transcoder's filesystem
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), TranscodeError>;

    /// Read a file from the transcoder's filesystem
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, TranscodeError>;

    /// Run a command, e.g. `["-i", "in.webm", "-c", "copy", "out.mp4"]`
    async fn run(&self, args: &[&str]) -> Result<(), TranscodeError>;
}
