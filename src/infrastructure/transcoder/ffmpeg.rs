//! FFmpeg transcoder adapter

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::fs;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::application::ports::{TranscodeError, Transcoder};

/// Flags prepended to every command
const BASE_ARGS: [&str; 4] = ["-nostdin", "-y", "-loglevel", "error"];

/// Runs FFmpeg inside a private temporary directory.
///
/// The directory is created by `load` and removed when the transcoder is
/// dropped. Files are addressed by plain names relative to it.
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    workdir: OnceCell<TempDir>,
}

impl FfmpegTranscoder {
    /// Create a transcoder using the given FFmpeg binary
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            workdir: OnceCell::new(),
        }
    }

    /// Working directory, once loaded
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.get().map(TempDir::path)
    }

    fn loaded_dir(&self) -> Result<&Path, TranscodeError> {
        self.workdir().ok_or(TranscodeError::NotLoaded)
    }

    /// Resolve a plain file name inside the working directory
    fn resolve(&self, name: &str) -> Result<PathBuf, TranscodeError> {
        validate_name(name)?;
        Ok(self.loaded_dir()?.join(name))
    }

    async fn check_binary(&self) -> Result<(), TranscodeError> {
        let status = Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::LoadFailed(format!(
                        "{} not found",
                        self.ffmpeg_path.display()
                    ))
                } else {
                    TranscodeError::LoadFailed(e.to_string())
                }
            })?;

        if !status.success() {
            return Err(TranscodeError::LoadFailed(format!(
                "{} -version exited with {}",
                self.ffmpeg_path.display(),
                status
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Only plain names are allowed: no separators, no `.` or `..`
fn validate_name(name: &str) -> Result<(), TranscodeError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(TranscodeError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn load(&self) -> Result<(), TranscodeError> {
        self.workdir
            .get_or_try_init(|| async {
                self.check_binary().await?;
                let dir = tempfile::Builder::new()
                    .prefix("canvas-rec-")
                    .tempdir()
                    .map_err(|e| TranscodeError::LoadFailed(e.to_string()))?;
                tracing::debug!(workdir = %dir.path().display(), "transcoder loaded");
                Ok::<_, TranscodeError>(dir)
            })
            .await?;
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), TranscodeError> {
        let path = self.resolve(name)?;
        fs::write(&path, data)
            .await
            .map_err(|e| TranscodeError::FileFailed(format!("{}: {}", name, e)))
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, TranscodeError> {
        let path = self.resolve(name)?;
        fs::read(&path)
            .await
            .map_err(|e| TranscodeError::FileFailed(format!("{}: {}", name, e)))
    }

    async fn run(&self, args: &[&str]) -> Result<(), TranscodeError> {
        let dir = self.loaded_dir()?;
        tracing::debug!(?args, "running ffmpeg");

        // kill_on_drop: dropping this future terminates the process
        let output = Command::new(&self.ffmpeg_path)
            .args(BASE_ARGS)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscodeError::RunFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::RunFailed(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or("unknown error")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `true` stands in for ffmpeg: it accepts `-version` and any args
    fn fake_transcoder() -> FfmpegTranscoder {
        FfmpegTranscoder::new("true")
    }

    #[test]
    fn plain_names_only() {
        assert!(validate_name("record.webm").is_ok());
        assert!(validate_name("output.mp4").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("../escape.mp4").is_err());
        assert!(validate_name("/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn files_need_load() {
        let transcoder = fake_transcoder();
        assert!(matches!(
            transcoder.write_file("record.webm", b"x").await,
            Err(TranscodeError::NotLoaded)
        ));
        assert!(matches!(
            transcoder.run(&["-i", "record.webm"]).await,
            Err(TranscodeError::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn write_then_read_in_workdir() {
        let transcoder = fake_transcoder();
        transcoder.load().await.unwrap();
        transcoder.load().await.unwrap();

        transcoder.write_file("record.webm", b"webm").await.unwrap();
        let data = transcoder.read_file("record.webm").await.unwrap();
        assert_eq!(data, b"webm");

        let dir = transcoder.workdir().unwrap();
        assert!(dir.join("record.webm").exists());
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let transcoder = fake_transcoder();
        transcoder.load().await.unwrap();
        assert!(matches!(
            transcoder.read_file("output.mp4").await,
            Err(TranscodeError::FileFailed(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_fails_load() {
        let transcoder = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary");
        assert!(matches!(
            transcoder.load().await,
            Err(TranscodeError::LoadFailed(_))
        ));
        assert!(transcoder.workdir().is_none());
    }

    #[tokio::test]
    async fn failing_version_check_fails_load() {
        let transcoder = FfmpegTranscoder::new("false");
        // `false -version` fails too, so load reports it
        assert!(matches!(
            transcoder.load().await,
            Err(TranscodeError::LoadFailed(_))
        ));
    }
}
