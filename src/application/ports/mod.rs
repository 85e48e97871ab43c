//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod config;
pub mod download;
pub mod recorder;
pub mod surface;
pub mod transcoder;

// Re-export common types
pub use config::ConfigStore;
pub use download::{DownloadError, DownloadSink};
pub use recorder::{
    ChunkRecorder, RecorderEvent, RecorderEventSender, RecorderEvents, RecorderFactory,
    RecorderOptions, RecordingError,
};
pub use surface::{CaptureError, CaptureSurface, MediaStream, SurfaceLocator};
pub use transcoder::{TranscodeError, Transcoder};
