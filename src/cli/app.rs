//! Recorder app runner

use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::timeout;

use crate::application::ports::{
    CaptureSurface, ChunkRecorder, ConfigStore, DownloadSink, RecorderEvent, RecorderEvents,
    RecorderOptions, Transcoder,
};
use crate::application::{
    discover_surface, ControllerError, ExportError, ExportedFile, FileExporter,
    RecordingController,
};
use crate::domain::config::AppConfig;
use crate::domain::keys::KeyAction;
use crate::domain::recording::{Container, RecorderState};
use crate::infrastructure::{
    DirectoryDownloadSink, FfmpegRecorderFactory, FfmpegSurfaceLocator, FfmpegTranscoder,
    XdgConfigStore,
};

use super::args::RecordOptions;
use super::keyboard::spawn_key_reader;
use super::pid_file::PidFile;
use super::presenter::Presenter;
use super::signals::{ControlSignal, ControlSignalHandler};
use super::socket::{ControlSocketServer, SharedStatus, SocketPath, StatusReport};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// How long shutdown waits for the recorder to flush its last data
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Load and merge configuration: defaults < file < CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, path = %store.path().display(), "ignoring config file");
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config).merge(cli_config)
}

/// Run the recorder until SIGINT/SIGTERM
pub async fn run_recorder(options: RecordOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let pid_file = PidFile::new();
    if let Err(e) = pid_file.acquire() {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    // Setup signal handler (returns handler + sender for the other sources)
    let (mut signals, signal_tx) = match ControlSignalHandler::new().await {
        Ok(s) => s,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let socket_path = SocketPath::new();
    let mut socket_server = ControlSocketServer::new(socket_path.clone());
    if let Err(e) = socket_server.bind() {
        presenter.error(&format!("Failed to bind socket: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let status: SharedStatus = Arc::new(Mutex::new(StatusReport {
        state: RecorderState::Inactive.as_str().to_string(),
        container: Container::Webm.to_string(),
        ..Default::default()
    }));
    let socket_task = {
        let tx = signal_tx.clone();
        let status = Arc::clone(&status);
        tokio::spawn(async move {
            let _ = socket_server.run(tx, status).await;
        })
    };
    let key_task = spawn_key_reader(tokio::io::stdin(), signal_tx);

    // Discovery, interruptible by SIGINT
    presenter.start_spinner(&format!("Waiting for surface {}...", options.surface));
    let locator = FfmpegSurfaceLocator::new(&options.surface, options.frame_rate);
    let surface = tokio::select! {
        result = discover_surface(&locator, options.poll_interval, options.max_probe_attempts) => {
            match result {
                Ok(surface) => surface,
                Err(e) => {
                    presenter.stop_spinner();
                    presenter.error(&e.to_string());
                    socket_task.abort();
                    key_task.abort();
                    return ExitCode::from(EXIT_ERROR);
                }
            }
        }
        _ = wait_for_shutdown(&mut signals) => {
            presenter.stop_spinner();
            presenter.info("Cancelled before a surface was found");
            socket_task.abort();
            key_task.abort();
            return ExitCode::from(EXIT_SUCCESS);
        }
    };
    let surface_name = surface.describe();
    presenter.spinner_success(&format!("Capturing {}", surface_name));

    let exporter = FileExporter::new(
        FfmpegTranscoder::new(&options.ffmpeg_path),
        DirectoryDownloadSink::new(&options.output_dir),
    )
    .with_transcode_timeout(options.transcode_timeout);
    let mut controller = RecordingController::new(exporter, options.key_bindings);

    let factory = FfmpegRecorderFactory::new(&options.ffmpeg_path);
    let recorder_options = RecorderOptions {
        bits_per_second: options.bits_per_second,
        codec: options.codec,
    };
    let mut events =
        match controller.initialize(&surface, &factory, recorder_options, Container::Webm) {
            Ok(events) => events,
            Err(e) => {
                presenter.error(&e.to_string());
                socket_task.abort();
                key_task.abort();
                return ExitCode::from(EXIT_ERROR);
            }
        };

    for line in controller.key_bindings().help_lines() {
        presenter.info(&line);
    }
    presenter.info(&format!(
        "PID: {} | Socket: {} | Output: {} | SIGINT: exit",
        std::process::id(),
        socket_path.path().display(),
        options.output_dir.display()
    ));

    let mut host = HostLoop {
        controller,
        presenter,
        status,
        surface: surface_name,
        last_file: None,
    };
    host.publish_status();

    let clean = host.run(&mut signals, &mut events).await;
    host.shutdown(&mut events).await;

    socket_task.abort();
    key_task.abort();
    let _ = pid_file.release();

    if clean {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

/// Resolve once a shutdown is requested; other signals are ignored
async fn wait_for_shutdown(signals: &mut ControlSignalHandler) {
    loop {
        match signals.recv().await {
            Some(ControlSignal::Shutdown) | None => return,
            Some(other) => tracing::debug!(?other, "ignored: no surface yet"),
        }
    }
}

/// The single owner of the controller. Every session mutation goes through
/// here, one signal or event at a time.
struct HostLoop<R, T, D>
where
    R: ChunkRecorder,
    T: Transcoder,
    D: DownloadSink,
{
    controller: RecordingController<R, T, D>,
    presenter: Presenter,
    status: SharedStatus,
    surface: String,
    last_file: Option<String>,
}

impl<R, T, D> HostLoop<R, T, D>
where
    R: ChunkRecorder,
    T: Transcoder,
    D: DownloadSink,
{
    /// Multiplex control signals and recorder events until shutdown.
    ///
    /// Returns false if the recorder went away underneath us.
    async fn run(
        &mut self,
        signals: &mut ControlSignalHandler,
        events: &mut RecorderEvents,
    ) -> bool {
        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(ControlSignal::Shutdown) | None => return true,
                    Some(signal) => self.handle_signal(signal).await,
                },
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        self.presenter.error("Recorder event stream closed");
                        return false;
                    }
                },
            }
        }
    }

    async fn handle_signal(&mut self, signal: ControlSignal) {
        let outcome = match signal {
            ControlSignal::Key(code) => self
                .controller
                .handle_key(code)
                .await
                .map(|dispatch| dispatch.map(|d| (d.action, d.changed))),
            ControlSignal::Action(action) => self
                .controller
                .perform(action)
                .await
                .map(|changed| Some((action, changed))),
            ControlSignal::Shutdown => return,
        };

        match outcome {
            Ok(Some((_, true))) => self.report_transition(),
            Ok(Some((action, false))) => {
                let reason = if self.controller.is_finalizing() {
                    "still saving the previous recording".to_string()
                } else {
                    format!("recorder is {}", self.controller.state())
                };
                self.presenter
                    .warn(&format!("{} ignored: {}", action.label(), reason));
            }
            Ok(None) => {}
            Err(e) => self.presenter.error(&e.to_string()),
        }
        self.publish_status();
    }

    async fn handle_event(&mut self, event: RecorderEvent) {
        let remuxing = event == RecorderEvent::Stopped
            && self.controller.session().pending_export() == Some(Container::Mp4);
        if remuxing {
            self.presenter.start_spinner("Remuxing to mp4...");
        }

        let result = self.controller.on_event(event).await;
        if remuxing {
            self.presenter.stop_spinner();
        }

        match result {
            Ok(Some(file)) => self.saved(file),
            Ok(None) => {}
            Err(ControllerError::Export(e @ (ExportError::Transcode(_) | ExportError::TimedOut(_)))) => {
                self.presenter.warn(&format!("{}; saving webm instead", e));
                match self.controller.export_last(Container::Webm).await {
                    Ok(file) => self.saved(file),
                    Err(e) => self.presenter.error(&e.to_string()),
                }
            }
            Err(e) => self.presenter.error(&e.to_string()),
        }
        self.publish_status();
    }

    /// Stop an active recording as webm and wait for it to be saved.
    ///
    /// A failed stop still drains the events: a recorder that died by itself
    /// has already queued its data and `Stopped`.
    async fn shutdown(&mut self, events: &mut RecorderEvents) {
        if self.controller.state() == RecorderState::Recording {
            self.presenter.recorder_status("Stopping...");
            if let Err(e) = self.controller.perform(KeyAction::StopWebm).await {
                tracing::warn!(error = %e, "stop during shutdown failed");
                self.presenter.warn(&e.to_string());
            }
        }

        while self.controller.state() == RecorderState::Recording
            || self.controller.is_finalizing()
        {
            match timeout(SHUTDOWN_GRACE, events.recv()).await {
                Ok(Some(event)) => self.handle_event(event).await,
                Ok(None) => break,
                Err(_) => {
                    self.presenter
                        .warn("Recorder did not finish in time, recording discarded");
                    break;
                }
            }
        }
        self.presenter.recorder_status("Shut down");
    }

    fn report_transition(&self) {
        match self.controller.session().pending_export() {
            Some(container) => self
                .presenter
                .recorder_status(&format!("Stopped, saving {}...", container)),
            None => self.presenter.recorder_status("Recording..."),
        }
    }

    fn saved(&mut self, file: ExportedFile) {
        self.presenter.saved(&file);
        self.last_file = Some(file.path.to_string_lossy().to_string());
    }

    fn publish_status(&self) {
        let session = self.controller.session();
        let report = StatusReport {
            state: session.state().as_str().to_string(),
            finalizing: session.is_finalizing(),
            container: session
                .pending_export()
                .unwrap_or(self.controller.container())
                .to_string(),
            chunks: session.chunks().len(),
            bytes: session.size_bytes(),
            surface: Some(self.surface.clone()),
            last_file: self.last_file.clone(),
        };
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = report;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        CaptureError, MediaStream, RecorderEventSender, RecorderFactory, RecordingError,
        TranscodeError,
    };
    use crate::domain::keys::KeyBindings;
    use crate::domain::recording::{Codec, MediaChunk};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct Canvas;

    impl CaptureSurface for Canvas {
        fn capture_stream(&self) -> Result<MediaStream, CaptureError> {
            Ok(MediaStream {
                input_format: "lavfi".to_string(),
                input: "testsrc".to_string(),
                frame_rate: 30,
            })
        }

        fn describe(&self) -> String {
            "canvas".to_string()
        }
    }

    /// Shared view of the fake ffmpeg process
    #[derive(Clone, Default)]
    struct Process {
        running: Arc<AtomicBool>,
        /// Died by itself: nothing left to signal
        exited: Arc<AtomicBool>,
        /// Signal fails although the process still runs
        refuse_stop: Arc<AtomicBool>,
    }

    struct FakeRecorder {
        process: Process,
        events: RecorderEventSender,
    }

    #[async_trait]
    impl ChunkRecorder for FakeRecorder {
        async fn start(&self) -> Result<(), RecordingError> {
            self.process.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), RecordingError> {
            if self.process.exited.load(Ordering::SeqCst)
                || !self.process.running.load(Ordering::SeqCst)
            {
                return Err(RecordingError::StopFailed("No recording in progress".to_string()));
            }
            if self.process.refuse_stop.load(Ordering::SeqCst) {
                return Err(RecordingError::StopFailed("Signal failed".to_string()));
            }
            self.process.running.store(false, Ordering::SeqCst);
            // ffmpeg flushes its last cluster, then exits
            let _ = self
                .events
                .send(RecorderEvent::DataAvailable(MediaChunk::from(&b"tail"[..])));
            let _ = self.events.send(RecorderEvent::Stopped);
            Ok(())
        }

        fn state(&self) -> RecorderState {
            if self.process.running.load(Ordering::SeqCst)
                && !self.process.exited.load(Ordering::SeqCst)
            {
                RecorderState::Recording
            } else {
                RecorderState::Inactive
            }
        }
    }

    struct FakeFactory {
        process: Process,
        sender: Mutex<Option<RecorderEventSender>>,
    }

    impl RecorderFactory for FakeFactory {
        type Recorder = FakeRecorder;

        fn create(
            &self,
            _stream: MediaStream,
            _options: RecorderOptions,
            events: RecorderEventSender,
        ) -> Result<FakeRecorder, RecordingError> {
            *self.sender.lock().unwrap() = Some(events.clone());
            Ok(FakeRecorder {
                process: self.process.clone(),
                events,
            })
        }
    }

    /// Remux that never produces an mp4
    enum FailingRemux {
        Broken,
        Hangs,
    }

    #[async_trait]
    impl Transcoder for FailingRemux {
        async fn load(&self) -> Result<(), TranscodeError> {
            Ok(())
        }

        async fn write_file(&self, _name: &str, _data: &[u8]) -> Result<(), TranscodeError> {
            Ok(())
        }

        async fn read_file(&self, name: &str) -> Result<Vec<u8>, TranscodeError> {
            Err(TranscodeError::FileFailed(name.to_string()))
        }

        async fn run(&self, _args: &[&str]) -> Result<(), TranscodeError> {
            match self {
                Self::Broken => Err(TranscodeError::RunFailed("Invalid data found".to_string())),
                Self::Hangs => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            }
        }
    }

    type TestHost = HostLoop<FakeRecorder, FailingRemux, DirectoryDownloadSink>;

    struct Fixture {
        host: TestHost,
        events: RecorderEvents,
        process: Process,
        tx: RecorderEventSender,
    }

    fn fixture(dir: &Path, remux: FailingRemux, limit: Option<Duration>) -> Fixture {
        let exporter = FileExporter::new(remux, DirectoryDownloadSink::new(dir))
            .with_transcode_timeout(limit);
        let mut controller = RecordingController::new(exporter, KeyBindings::default());
        let factory = FakeFactory {
            process: Process::default(),
            sender: Mutex::new(None),
        };
        let options = RecorderOptions {
            bits_per_second: 100_000_000,
            codec: Codec::Vp9,
        };
        let events = controller
            .initialize(&Canvas, &factory, options, Container::Webm)
            .unwrap();
        let tx = factory.sender.lock().unwrap().clone().unwrap();

        Fixture {
            host: HostLoop {
                controller,
                presenter: Presenter::new(),
                status: Arc::new(Mutex::new(StatusReport::default())),
                surface: "canvas".to_string(),
                last_file: None,
            },
            events,
            process: factory.process,
            tx,
        }
    }

    fn frames() -> RecorderEvent {
        RecorderEvent::DataAvailable(MediaChunk::from(&b"frames"[..]))
    }

    async fn drain(host: &mut TestHost, events: &mut RecorderEvents) {
        while let Some(event) = events.try_recv() {
            host.handle_event(event).await;
        }
    }

    /// (name, contents) of every file in `dir`
    fn saved_files(dir: &Path) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                (
                    entry.file_name().to_string_lossy().to_string(),
                    std::fs::read(entry.path()).unwrap(),
                )
            })
            .collect();
        files.sort();
        files
    }

    fn assert_single_webm(dir: &Path, contents: &[u8]) {
        let files = saved_files(dir);
        assert_eq!(files.len(), 1, "{:?}", files);
        assert!(files[0].0.ends_with(".webm"), "{}", files[0].0);
        assert_eq!(files[0].1, contents);
    }

    #[tokio::test]
    async fn failed_remux_saves_webm_instead() {
        let dir = TempDir::new().unwrap();
        let mut f = fixture(dir.path(), FailingRemux::Broken, None);

        f.host.handle_signal(ControlSignal::Key(82)).await;
        f.tx.send(frames()).unwrap();
        f.host.handle_signal(ControlSignal::Key(77)).await;
        drain(&mut f.host, &mut f.events).await;

        assert_single_webm(dir.path(), b"framestail");
        let last = f.host.last_file.clone().unwrap();
        assert!(last.ends_with(".webm"));
        assert_eq!(f.host.status.lock().unwrap().last_file, Some(last));
    }

    #[tokio::test]
    async fn timed_out_remux_saves_webm_instead() {
        let dir = TempDir::new().unwrap();
        let mut f = fixture(
            dir.path(),
            FailingRemux::Hangs,
            Some(Duration::from_millis(50)),
        );

        f.host.handle_signal(ControlSignal::Key(83)).await;
        f.tx.send(frames()).unwrap();
        f.host
            .handle_signal(ControlSignal::Action(KeyAction::StopMp4))
            .await;
        drain(&mut f.host, &mut f.events).await;

        assert_single_webm(dir.path(), b"framestail");
    }

    #[tokio::test]
    async fn shutdown_while_recording_saves_webm() {
        let dir = TempDir::new().unwrap();
        let mut f = fixture(dir.path(), FailingRemux::Broken, None);

        f.host.handle_signal(ControlSignal::Key(82)).await;
        f.tx.send(frames()).unwrap();
        f.host.shutdown(&mut f.events).await;

        assert_single_webm(dir.path(), b"framestail");
        assert_eq!(f.host.controller.state(), RecorderState::Inactive);
        assert!(!f.host.controller.is_finalizing());
    }

    #[tokio::test]
    async fn shutdown_after_recorder_exited_saves_webm() {
        let dir = TempDir::new().unwrap();
        let mut f = fixture(dir.path(), FailingRemux::Broken, None);

        f.host.handle_signal(ControlSignal::Key(82)).await;
        // Ctrl-C reached ffmpeg first: it flushed and exited by itself
        f.tx.send(frames()).unwrap();
        f.process.exited.store(true, Ordering::SeqCst);
        f.tx.send(RecorderEvent::Stopped).unwrap();

        f.host.shutdown(&mut f.events).await;

        assert_single_webm(dir.path(), b"frames");
        assert!(!f.host.controller.is_finalizing());
    }

    #[tokio::test]
    async fn shutdown_with_failed_stop_still_saves_queued_data() {
        let dir = TempDir::new().unwrap();
        let mut f = fixture(dir.path(), FailingRemux::Broken, None);

        f.host.handle_signal(ControlSignal::Key(82)).await;
        f.process.refuse_stop.store(true, Ordering::SeqCst);
        f.tx.send(frames()).unwrap();
        f.tx.send(RecorderEvent::Stopped).unwrap();

        f.host.shutdown(&mut f.events).await;

        assert_single_webm(dir.path(), b"frames");
        assert_eq!(f.host.controller.state(), RecorderState::Inactive);
    }

    #[tokio::test]
    async fn run_applies_signals_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let mut f = fixture(dir.path(), FailingRemux::Broken, None);
        let (signal_tx, signal_rx) = mpsc::channel(4);
        let mut signals = ControlSignalHandler::from_receiver(signal_rx);

        signal_tx.send(ControlSignal::Key(82)).await.unwrap();
        signal_tx.send(ControlSignal::Shutdown).await.unwrap();

        assert!(f.host.run(&mut signals, &mut f.events).await);
        assert_eq!(f.host.controller.state(), RecorderState::Recording);
        assert_eq!(f.host.status.lock().unwrap().state, "recording");
    }
}
