//! Capture infrastructure module
//!
//! Finds displays and devices, and records them through FFmpeg as a
//! stream of webm (vp9) or matroska (h264) chunks.

mod recorder;
mod surface;

pub use recorder::{build_args, FfmpegChunkRecorder, FfmpegRecorderFactory};
pub use surface::{x11_socket_path, FfmpegSurface, FfmpegSurfaceLocator, SurfaceTarget};
