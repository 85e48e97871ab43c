//! Download sink that writes into a directory

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::application::ports::{DownloadError, DownloadSink};
use crate::domain::recording::MediaBlob;

/// Give up on free names after this many suffixes
const MAX_SUFFIX: u32 = 1000;

/// Saves files into a directory without overwriting existing ones
pub struct DirectoryDownloadSink {
    dir: PathBuf,
}

impl DirectoryDownloadSink {
    /// Create a sink for `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// `name.ext` for n = 0, `name (n).ext` after that
fn candidate_name(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", file_name, n),
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloadSink {
    async fn save(&self, blob: &MediaBlob, file_name: &str) -> Result<PathBuf, DownloadError> {
        let fail = |message: String| DownloadError::SaveFailed {
            file_name: file_name.to_string(),
            message,
        };

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| fail(e.to_string()))?;

        for n in 0..MAX_SUFFIX {
            let path = self.dir.join(candidate_name(file_name, n));
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(fail(e.to_string())),
            };

            file.write_all(blob.data())
                .await
                .map_err(|e| fail(e.to_string()))?;
            file.flush().await.map_err(|e| fail(e.to_string()))?;
            return Ok(path);
        }

        Err(fail(format!(
            "no free file name in {}",
            self.dir.display()
        )))
    }
}
