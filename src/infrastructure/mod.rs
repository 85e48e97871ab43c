//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with FFmpeg, the filesystem and the XDG config directory.

pub mod capture;
pub mod config;
pub mod download;
pub mod transcoder;

// Re-export adapters
pub use capture::{FfmpegChunkRecorder, FfmpegRecorderFactory, FfmpegSurface, FfmpegSurfaceLocator};
pub use config::XdgConfigStore;
pub use download::DirectoryDownloadSink;
pub use transcoder::FfmpegTranscoder;
