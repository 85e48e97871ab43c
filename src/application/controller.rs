//! Recording controller: the start/stop/toggle state machine, key dispatch,
//! and export on the recorder's stop event.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::keys::{KeyAction, KeyBindings};
use crate::domain::recording::{local_now, Container, RecorderState, RecordingSession};

use super::exporter::{ExportError, ExportedFile, FileExporter};
use super::ports::{
    CaptureError, CaptureSurface, ChunkRecorder, DownloadSink, RecorderEvent, RecorderEvents,
    RecorderFactory, RecorderOptions, RecordingError, Transcoder,
};

/// Errors from the controller
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Recording failed: {0}")]
    Recording(#[from] RecordingError),

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("There is no finished recording to export")]
    NothingToExport,
}

/// Result of dispatching a key code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDispatch {
    /// Action bound to the key
    pub action: KeyAction,
    /// Whether the recorder changed state
    pub changed: bool,
}

/// Recording controller.
///
/// Owns one session at a time. Until `initialize` attaches a recorder every
/// command is a no-op.
pub struct RecordingController<R, T, D>
where
    R: ChunkRecorder,
    T: Transcoder,
    D: DownloadSink,
{
    recorder: Option<R>,
    session: RecordingSession,
    container: Container,
    exporter: FileExporter<T, D>,
    key_bindings: KeyBindings,
    clock: fn() -> NaiveDateTime,
}

impl<R, T, D> RecordingController<R, T, D>
where
    R: ChunkRecorder,
    T: Transcoder,
    D: DownloadSink,
{
    /// Create an uninitialized controller
    pub fn new(exporter: FileExporter<T, D>, key_bindings: KeyBindings) -> Self {
        Self {
            recorder: None,
            session: RecordingSession::new(),
            container: Container::Webm,
            exporter,
            key_bindings,
            clock: local_now,
        }
    }

    /// Replace the wall clock used for file names
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a recorder to the surface's capture stream.
    ///
    /// Returns the event stream the host must feed back through `on_event`.
    pub fn initialize<S, F>(
        &mut self,
        surface: &S,
        factory: &F,
        options: RecorderOptions,
        container: Container,
    ) -> Result<RecorderEvents, ControllerError>
    where
        S: CaptureSurface,
        F: RecorderFactory<Recorder = R>,
    {
        let stream = surface.capture_stream()?;
        let (events_tx, events) = RecorderEvents::channel();
        let recorder = factory.create(stream, options, events_tx)?;

        tracing::info!(
            surface = %surface.describe(),
            codec = options.codec.mime_type(),
            bits_per_second = options.bits_per_second,
            "recorder attached"
        );

        self.recorder = Some(recorder);
        self.session = RecordingSession::new();
        self.container = container;
        Ok(events)
    }

    /// Check if a recorder is attached
    pub fn is_initialized(&self) -> bool {
        self.recorder.is_some()
    }

    /// Current state
    pub fn state(&self) -> RecorderState {
        self.session.state()
    }

    /// Check if a stop is waiting for the recorder's stop event
    pub fn is_finalizing(&self) -> bool {
        self.session.is_finalizing()
    }

    /// The current session
    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    /// Container the next stop exports to
    pub fn container(&self) -> Container {
        self.container
    }

    /// Select the container for the next stop
    pub fn set_container(&mut self, container: Container) {
        self.container = container;
    }

    /// Key bindings in use
    pub fn key_bindings(&self) -> &KeyBindings {
        &self.key_bindings
    }

    /// Start recording. `Ok(false)` if already recording or uninitialized.
    pub async fn start(&mut self) -> Result<bool, ControllerError> {
        let Some(recorder) = self.recorder.as_ref() else {
            tracing::debug!("start ignored: no recorder attached");
            return Ok(false);
        };
        if !self.session.can_begin() {
            tracing::debug!(state = %self.session.state(), "start ignored");
            return Ok(false);
        }

        recorder.start().await?;
        if let Err(e) = self.session.begin() {
            tracing::warn!(error = %e, "session refused to begin");
            return Ok(false);
        }
        tracing::info!("recording started");
        Ok(true)
    }

    /// Stop recording. `Ok(false)` if not recording or uninitialized.
    ///
    /// The file is generated later, when the recorder reports `Stopped`.
    /// A recorder that already exited on its own is treated as stopped.
    pub async fn stop(&mut self) -> Result<bool, ControllerError> {
        let Some(recorder) = self.recorder.as_ref() else {
            tracing::debug!("stop ignored: no recorder attached");
            return Ok(false);
        };
        if !self.session.is_recording() {
            tracing::debug!(state = %self.session.state(), "stop ignored");
            return Ok(false);
        }

        if let Err(e) = recorder.stop().await {
            // A recorder that already exited still delivers its queued Stopped
            if recorder.state() != RecorderState::Inactive {
                return Err(e.into());
            }
            tracing::debug!(error = %e, "recorder had already stopped");
        }
        if let Err(e) = self.session.end(self.container) {
            tracing::warn!(error = %e, "session refused to end");
            return Ok(false);
        }
        tracing::info!(container = %self.container, "recording stopped");
        Ok(true)
    }

    /// Start if inactive, otherwise stop
    pub async fn toggle(&mut self) -> Result<bool, ControllerError> {
        if self.start().await? {
            return Ok(true);
        }
        self.stop().await
    }

    /// Run an action. The container selection is reset to webm first, so a
    /// selection only affects the stop that immediately follows it.
    pub async fn perform(&mut self, action: KeyAction) -> Result<bool, ControllerError> {
        self.container = Container::Webm;
        match action {
            KeyAction::Toggle => self.toggle().await,
            KeyAction::Start => self.start().await,
            KeyAction::StopWebm => {
                self.container = Container::Webm;
                self.stop().await
            }
            KeyAction::StopMp4 => {
                self.container = Container::Mp4;
                self.stop().await
            }
        }
    }

    /// Dispatch a key code. Unbound codes are ignored.
    pub async fn handle_key(&mut self, code: u32) -> Result<Option<KeyDispatch>, ControllerError> {
        self.container = Container::Webm;
        let Some(action) = self.key_bindings.action_for(code) else {
            tracing::trace!(code, "unbound key ignored");
            return Ok(None);
        };
        let changed = self.perform(action).await?;
        Ok(Some(KeyDispatch { action, changed }))
    }

    /// Apply a recorder event.
    ///
    /// Returns the saved file when the event completes a session. On export
    /// failure the chunks stay in the session; see `export_last`.
    pub async fn on_event(
        &mut self,
        event: RecorderEvent,
    ) -> Result<Option<ExportedFile>, ControllerError> {
        match event {
            RecorderEvent::DataAvailable(chunk) => {
                let size = chunk.len();
                if !self.session.append(chunk) {
                    tracing::trace!(size, "chunk dropped");
                }
                Ok(None)
            }
            RecorderEvent::Stopped => {
                let Some(container) = self.session.finish(Container::Webm) else {
                    tracing::debug!("stop event outside a session ignored");
                    return Ok(None);
                };
                let file = self
                    .exporter
                    .generate_file(self.session.chunks(), container, (self.clock)())
                    .await?;
                Ok(Some(file))
            }
        }
    }

    /// Export the last finished session again, e.g. as webm after a failed
    /// mp4 remux.
    pub async fn export_last(
        &mut self,
        container: Container,
    ) -> Result<ExportedFile, ControllerError> {
        if self.session.is_recording()
            || self.session.is_finalizing()
            || self.session.chunks().is_empty()
        {
            return Err(ControllerError::NothingToExport);
        }
        let file = self
            .exporter
            .generate_file(self.session.chunks(), container, (self.clock)())
            .await?;
        Ok(file)
    }
}
