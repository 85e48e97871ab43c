//! File assembly: chunks in, a saved webm or mp4 out

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use thiserror::Error;
use tokio::time::timeout;

use super::ports::{DownloadError, DownloadSink, TranscodeError, Transcoder};
use crate::domain::recording::{output_file_name, Container, MediaBlob, MediaChunk};

/// Name of the webm input inside the transcoder's filesystem
pub const REMUX_INPUT: &str = "record.webm";

/// Name of the mp4 output inside the transcoder's filesystem
pub const REMUX_OUTPUT: &str = "output.mp4";

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing was recorded")]
    EmptyRecording,

    #[error("Remux to mp4 failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Remux to mp4 timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0}")]
    Download(#[from] DownloadError),
}

/// A file that was handed to the download sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Where the sink put it
    pub path: PathBuf,
    /// Container written
    pub container: Container,
    /// Size in bytes
    pub size_bytes: usize,
}

/// Builds output files from recorded chunks
pub struct FileExporter<T, D>
where
    T: Transcoder,
    D: DownloadSink,
{
    transcoder: T,
    sink: D,
    transcode_timeout: Option<Duration>,
}

impl<T, D> FileExporter<T, D>
where
    T: Transcoder,
    D: DownloadSink,
{
    /// Create a new exporter
    pub fn new(transcoder: T, sink: D) -> Self {
        Self {
            transcoder,
            sink,
            transcode_timeout: None,
        }
    }

    /// Bound how long a remux may take
    pub fn with_transcode_timeout(mut self, limit: Option<Duration>) -> Self {
        self.transcode_timeout = limit;
        self
    }

    /// Concatenate `chunks` and save them as `<stamp>.<ext>`.
    ///
    /// webm is saved as recorded; mp4 is remuxed (stream copy) first.
    pub async fn generate_file(
        &self,
        chunks: &[MediaChunk],
        container: Container,
        at: NaiveDateTime,
    ) -> Result<ExportedFile, ExportError> {
        let recorded = MediaBlob::concat(chunks, Container::Webm);
        if recorded.is_empty() {
            return Err(ExportError::EmptyRecording);
        }

        let blob = match container {
            Container::Webm => recorded,
            Container::Mp4 => {
                let remuxed = match self.transcode_timeout {
                    Some(limit) => timeout(limit, self.remux_to_mp4(&recorded))
                        .await
                        .map_err(|_| ExportError::TimedOut(limit))??,
                    None => self.remux_to_mp4(&recorded).await?,
                };
                MediaBlob::new(remuxed, Container::Mp4)
            }
        };

        let file_name = output_file_name(at, container);
        let path = self.sink.save(&blob, &file_name).await?;
        tracing::info!(path = %path.display(), size = blob.size_bytes(), "recording saved");

        Ok(ExportedFile {
            path,
            container,
            size_bytes: blob.size_bytes(),
        })
    }

    async fn remux_to_mp4(&self, recorded: &MediaBlob) -> Result<Vec<u8>, TranscodeError> {
        self.transcoder.load().await?;
        self.transcoder
            .write_file(REMUX_INPUT, recorded.data())
            .await?;
        self.transcoder
            .run(&["-i", REMUX_INPUT, "-c", "copy", REMUX_OUTPUT])
            .await?;
        let data = self.transcoder.read_file(REMUX_OUTPUT).await?;
        if data.is_empty() {
            return Err(TranscodeError::RunFailed(format!("{} is empty", REMUX_OUTPUT)));
        }
        Ok(data)
    }
}
