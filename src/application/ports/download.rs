//! Download sink port interface

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::MediaBlob;

/// Download errors
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    #[error("Failed to save {file_name}: {message}")]
    SaveFailed { file_name: String, message: String },
}

/// Port for handing a finished file to the user
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Save a blob under the suggested file name.
    ///
    /// # Returns
    /// Where the file ended up
    async fn save(&self, blob: &MediaBlob, file_name: &str) -> Result<PathBuf, DownloadError>;
}
