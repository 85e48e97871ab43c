//! Chunked recorder port interfaces

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::surface::MediaStream;
use crate::domain::recording::{Codec, MediaChunk, RecorderState};

/// Recording errors
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("Failed to start recording: {0}")]
    StartFailed(String),

    #[error("Failed to stop recording: {0}")]
    StopFailed(String),

    #[error("FFmpeg not found. Please install FFmpeg or set ffmpeg_path in the config")]
    FfmpegNotFound,
}

/// Options a recorder is constructed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Bitrate ceiling in bits per second
    pub bits_per_second: u64,
    /// Video codec
    pub codec: Codec,
}

/// Events a recorder emits during one recording cycle.
///
/// `DataAvailable` zero or more times, then `Stopped` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    DataAvailable(MediaChunk),
    Stopped,
}

/// Sending half handed to recorders
pub type RecorderEventSender = mpsc::UnboundedSender<RecorderEvent>;

/// Receiving half held by the host loop
pub struct RecorderEvents {
    receiver: mpsc::UnboundedReceiver<RecorderEvent>,
}

impl RecorderEvents {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (RecorderEventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { receiver: rx })
    }

    /// Wait for the next event. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<RecorderEvent> {
        self.receiver.recv().await
    }

    /// Take an event if one is queued
    pub fn try_recv(&mut self) -> Option<RecorderEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Port for a recorder bound to one capture stream
#[async_trait]
pub trait ChunkRecorder: Send + Sync {
    /// Begin a recording cycle
    async fn start(&self) -> Result<(), RecordingError>;

    /// Request the end of the cycle. Remaining data and the `Stopped`
    /// event are delivered asynchronously.
    async fn stop(&self) -> Result<(), RecordingError>;

    /// Current recorder state
    fn state(&self) -> RecorderState;
}

/// Port for constructing recorders
pub trait RecorderFactory: Send + Sync {
    type Recorder: ChunkRecorder;

    /// Bind a recorder to a stream
    ///
    /// # Arguments
    /// * `stream` - The capture stream to record
    /// * `options` - Bitrate ceiling and codec
    /// * `events` - Where chunk and stop events are sent
    fn create(
        &self,
        stream: MediaStream,
        options: RecorderOptions,
        events: RecorderEventSender,
    ) -> Result<Self::Recorder, RecordingError>;
}
