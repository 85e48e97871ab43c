//! FFmpeg-based chunk recorder adapter

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::application::ports::{
    ChunkRecorder, MediaStream, RecorderEvent, RecorderEventSender, RecorderFactory,
    RecorderOptions, RecordingError,
};
use crate::domain::recording::{Codec, MediaChunk, RecorderState};

/// Largest chunk forwarded per stdout read
const CHUNK_SIZE: usize = 64 * 1024;

/// Build FFmpeg args that encode `stream` and write it to stdout
pub fn build_args(stream: &MediaStream, options: RecorderOptions) -> Vec<String> {
    let mut args = vec![
        "-nostdin".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        stream.input_format.clone(),
        "-framerate".to_string(),
        stream.frame_rate.to_string(),
        "-i".to_string(),
        stream.input.clone(),
        "-an".to_string(),
    ];

    match options.codec {
        Codec::Vp9 => args.extend([
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-b:v".to_string(),
            options.bits_per_second.to_string(),
            "-deadline".to_string(),
            "realtime".to_string(),
            "-cpu-used".to_string(),
            "8".to_string(),
            // Streamable output: no seeking back to write cues
            "-f".to_string(),
            "webm".to_string(),
        ]),
        // webm does not carry h264, matroska does
        Codec::H264 => args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-b:v".to_string(),
            options.bits_per_second.to_string(),
            "-preset".to_string(),
            "ultrafast".to_string(),
            "-tune".to_string(),
            "zerolatency".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-f".to_string(),
            "matroska".to_string(),
        ]),
    }

    args.push("pipe:1".to_string());
    args
}

/// Builds recorders that run FFmpeg
pub struct FfmpegRecorderFactory {
    ffmpeg_path: PathBuf,
}

impl FfmpegRecorderFactory {
    /// Create a factory using the given FFmpeg binary
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegRecorderFactory {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl RecorderFactory for FfmpegRecorderFactory {
    type Recorder = FfmpegChunkRecorder;

    fn create(
        &self,
        stream: MediaStream,
        options: RecorderOptions,
        events: RecorderEventSender,
    ) -> Result<FfmpegChunkRecorder, RecordingError> {
        if stream.frame_rate == 0 {
            return Err(RecordingError::StartFailed(
                "Frame rate must be positive".to_string(),
            ));
        }
        Ok(FfmpegChunkRecorder {
            ffmpeg_path: self.ffmpeg_path.clone(),
            args: build_args(&stream, options),
            events,
            pid: Arc::new(Mutex::new(None)),
            pump: Mutex::new(None),
            is_recording: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// One FFmpeg process per recording cycle, its stdout forwarded as chunks
pub struct FfmpegChunkRecorder {
    ffmpeg_path: PathBuf,
    args: Vec<String>,
    events: RecorderEventSender,
    /// Pid of the running process, cleared when it exits
    pid: Arc<Mutex<Option<u32>>>,
    /// Task that owns the child and pumps its output
    pump: Mutex<Option<JoinHandle<()>>>,
    is_recording: Arc<AtomicBool>,
}

impl FfmpegChunkRecorder {
    /// Args the process is started with
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn spawn_ffmpeg(&self) -> Result<Child, RecordingError> {
        Command::new(&self.ffmpeg_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RecordingError::FfmpegNotFound
                } else {
                    RecordingError::StartFailed(e.to_string())
                }
            })
    }

    /// Forward stdout until EOF, wait for exit, then report `Stopped`
    async fn pump(
        mut child: Child,
        events: RecorderEventSender,
        pid: Arc<Mutex<Option<u32>>>,
        is_recording: Arc<AtomicBool>,
    ) {
        let stderr = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                buf
            })
        });

        if let Some(mut stdout) = child.stdout.take() {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = MediaChunk::from(&buf[..n]);
                        if events.send(RecorderEvent::DataAvailable(chunk)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "reading ffmpeg output failed");
                        break;
                    }
                }
            }
        }

        match child.wait().await {
            Ok(status) if status.success() => tracing::debug!("ffmpeg exited"),
            Ok(status) => {
                let message = match stderr {
                    Some(task) => task.await.unwrap_or_default(),
                    None => Vec::new(),
                };
                let message = String::from_utf8_lossy(&message);
                tracing::warn!(
                    %status,
                    message = message.lines().last().unwrap_or("unknown error"),
                    "ffmpeg exited with error"
                );
            }
            Err(e) => tracing::warn!(error = %e, "waiting for ffmpeg failed"),
        }

        *pid.lock().await = None;
        is_recording.store(false, Ordering::SeqCst);
        let _ = events.send(RecorderEvent::Stopped);
    }
}

#[async_trait]
impl ChunkRecorder for FfmpegChunkRecorder {
    async fn start(&self) -> Result<(), RecordingError> {
        let mut pid_guard = self.pid.lock().await;
        if pid_guard.is_some() {
            return Err(RecordingError::StartFailed(
                "Recording already in progress".to_string(),
            ));
        }

        let child = self.spawn_ffmpeg()?;
        *pid_guard = child.id();
        self.is_recording.store(true, Ordering::SeqCst);
        drop(pid_guard);

        tracing::debug!(args = ?self.args, "ffmpeg started");
        let task = tokio::spawn(Self::pump(
            child,
            self.events.clone(),
            Arc::clone(&self.pid),
            Arc::clone(&self.is_recording),
        ));
        *self.pump.lock().await = Some(task);

        Ok(())
    }

    async fn stop(&self) -> Result<(), RecordingError> {
        let pid = self
            .pid
            .lock()
            .await
            .ok_or_else(|| RecordingError::StopFailed("No recording in progress".to_string()))?;

        self.is_recording.store(false, Ordering::SeqCst);

        // SIGINT lets FFmpeg flush and close the container
        let raw = i32::try_from(pid)
            .map_err(|_| RecordingError::StopFailed(format!("Invalid pid {}", pid)))?;
        signal::kill(Pid::from_raw(raw), Signal::SIGINT)
            .map_err(|e| RecordingError::StopFailed(format!("Signal failed: {}", e)))?;

        Ok(())
    }

    fn state(&self) -> RecorderState {
        if self.is_recording.load(Ordering::SeqCst) {
            RecorderState::Recording
        } else {
            RecorderState::Inactive
        }
    }
}

impl Drop for FfmpegChunkRecorder {
    fn drop(&mut self) {
        // Aborting the pump drops the child, which kills it
        if let Some(task) = self.pump.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RecorderEvents;

    fn stream() -> MediaStream {
        MediaStream {
            input_format: "x11grab".to_string(),
            input: ":0.0".to_string(),
            frame_rate: 60,
        }
    }

    fn options(codec: Codec) -> RecorderOptions {
        RecorderOptions {
            bits_per_second: 100_000_000,
            codec,
        }
    }

    #[test]
    fn vp9_args_write_webm_to_stdout() {
        let args = build_args(&stream(), options(Codec::Vp9));
        let joined = args.join(" ");

        assert!(joined.contains("-f x11grab -framerate 60 -i :0.0 -an"));
        assert!(joined.contains("-c:v libvpx-vp9 -b:v 100000000"));
        assert!(joined.contains("-f webm"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn h264_args_use_matroska() {
        let args = build_args(&stream(), options(Codec::H264));
        let joined = args.join(" ");

        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-f matroska"));
        assert!(!joined.contains("libvpx"));
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        let (tx, _rx) = RecorderEvents::channel();
        let mut bad = stream();
        bad.frame_rate = 0;
        let result = FfmpegRecorderFactory::default().create(bad, options(Codec::Vp9), tx);
        assert!(matches!(result, Err(RecordingError::StartFailed(_))));
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let (tx, _rx) = RecorderEvents::channel();
        let recorder = FfmpegRecorderFactory::new("/nonexistent/ffmpeg-binary")
            .create(stream(), options(Codec::Vp9), tx)
            .unwrap();

        let err = recorder.start().await.unwrap_err();
        assert!(matches!(err, RecordingError::FfmpegNotFound));
        assert_eq!(recorder.state(), RecorderState::Inactive);
    }

    #[tokio::test]
    async fn stop_without_start_fails() {
        let (tx, _rx) = RecorderEvents::channel();
        let recorder = FfmpegRecorderFactory::default()
            .create(stream(), options(Codec::Vp9), tx)
            .unwrap();

        assert!(matches!(
            recorder.stop().await,
            Err(RecordingError::StopFailed(_))
        ));
    }

    #[tokio::test]
    async fn output_is_forwarded_then_stopped() {
        // `sh -c 'printf ...'` stands in for ffmpeg; the args are ignored
        let (tx, mut rx) = RecorderEvents::channel();
        let recorder = FfmpegChunkRecorder {
            ffmpeg_path: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "printf abc".to_string()],
            events: tx,
            pid: Arc::new(Mutex::new(None)),
            pump: Mutex::new(None),
            is_recording: Arc::new(AtomicBool::new(false)),
        };

        recorder.start().await.unwrap();

        let mut data = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                RecorderEvent::DataAvailable(chunk) => data.extend_from_slice(chunk.data()),
                RecorderEvent::Stopped => break,
            }
        }
        assert_eq!(data, b"abc");
        assert_eq!(recorder.state(), RecorderState::Inactive);
    }
}
